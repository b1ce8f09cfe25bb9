//! LoRA Random Selector CLI
//!
//! Entry point for the `lora-select` command-line tool.

use clap::{Parser, Subcommand};
use lora_random_selector::config::{init_defaults, migrate_legacy, MigrationOutcome};
use lora_random_selector::node::NodeSchema;
use lora_random_selector::validation::DEFAULT_MODEL_ROOT;
use lora_random_selector::{
    ConfigSnapshot, ConfigStore, LoraRandomSelectorNode, NodeInputs, PathValidator,
    PromptPosition,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "lora-select")]
#[command(about = "Random LoRA selection by category", version)]
struct Cli {
    /// Directory holding global_settings.json and lora_style/
    #[arg(long, short = 'c', global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Directory LoRA file paths are resolved against
    #[arg(long, short = 'm', global = true, default_value = DEFAULT_MODEL_ROOT)]
    model_root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select LoRAs from a category and compose a prompt
    Select {
        /// Category to draw from
        category: String,

        /// Number of LoRAs to select
        #[arg(long, short = 'n', default_value_t = 1)]
        num_loras: i64,

        /// Trigger words to draw per LoRA
        #[arg(long, short = 't', default_value_t = 1)]
        trigger_word_count: i64,

        /// Seed (-1 for random)
        #[arg(long, short = 's', default_value_t = -1, allow_negative_numbers = true)]
        seed: i64,

        /// Leave trigger words out of the prompt
        #[arg(long)]
        no_trigger_words: bool,

        /// Strength for every selected LoRA (<= 0 uses defaults)
        #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
        strength: f64,

        /// Prompt to extend with trigger words
        #[arg(long, short = 'p', default_value = "")]
        prompt: String,

        /// Where trigger words go: end, beginning or both
        #[arg(long, default_value = "end")]
        position: PromptPosition,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List configured categories
    Categories {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Split a legacy lora_config.json into per-category files
    Migrate {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check that every LoRA file in a category exists
    Validate {
        /// Category to check
        category: String,
    },

    /// Write default settings and a sample category when absent
    Init,

    /// Print the node input schema
    Schema,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting up logging: {}", e);
        process::exit(1);
    }

    match cli.command {
        Commands::Select {
            category,
            num_loras,
            trigger_word_count,
            seed,
            no_trigger_words,
            strength,
            prompt,
            position,
            json,
        } => {
            let inputs = NodeInputs {
                category,
                num_loras,
                trigger_word_count,
                seed,
                enable_trigger_words: !no_trigger_words,
                strength_override: strength,
                base_prompt: prompt,
            };
            run_select(&cli.config_dir, &cli.model_root, position, &inputs, json);
        }
        Commands::Categories { json } => run_categories(&cli.config_dir, json),
        Commands::Migrate { json } => run_migrate(&cli.config_dir, json),
        Commands::Validate { category } => {
            run_validate(&cli.config_dir, &cli.model_root, &category)
        }
        Commands::Init => run_init(&cli.config_dir),
        Commands::Schema => run_schema(&cli.config_dir),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_select(
    config_dir: &Path,
    model_root: &Path,
    position: PromptPosition,
    inputs: &NodeInputs,
    json_output: bool,
) {
    let mut node = LoraRandomSelectorNode::new(config_dir)
        .with_model_root(model_root)
        .with_position(position);

    let outputs = match node.try_execute(inputs) {
        Ok(outputs) => outputs,
        Err(e) => {
            eprintln!("Selection failed: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        print_json(&outputs);
        return;
    }

    println!("LoRA path:      {}", outputs.lora_path);
    println!("Strength:       {}", outputs.lora_strength);
    println!("Trigger words:  {}", outputs.trigger_words);
    println!("Prompt:         {}", outputs.combined_prompt);
    println!();
    println!("{}", outputs.selected_lora_info);
}

fn load_snapshot(config_dir: &Path) -> Arc<ConfigSnapshot> {
    match ConfigStore::new(config_dir).snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Error loading LoRA config: {}", e);
            process::exit(1);
        }
    }
}

fn run_categories(config_dir: &Path, json_output: bool) {
    let snapshot = load_snapshot(config_dir);

    if json_output {
        let output: Vec<serde_json::Value> = snapshot
            .categories
            .values()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "description": c.description,
                    "loras": c.lora_ids(),
                })
            })
            .collect();
        print_json(&output);
        return;
    }

    if snapshot.categories.is_empty() {
        println!("No categories configured.");
        return;
    }

    println!("Categories ({} total):\n", snapshot.categories.len());
    for category in snapshot.categories.values() {
        println!("  {} ({} LoRAs)", category.name, category.len());
        if !category.description.is_empty() {
            println!("    {}", category.description);
        }
    }
}

fn run_migrate(config_dir: &Path, json_output: bool) {
    let store = ConfigStore::new(config_dir);
    let outcome = match migrate_legacy(store.layout()) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Migration failed: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        print_json(&outcome);
        return;
    }

    match outcome {
        MigrationOutcome::AlreadyMigrated => {
            println!("Already migrated: {}", store.layout().category_dir().display());
        }
        MigrationOutcome::NoLegacyConfig => {
            println!("No legacy config at {}", store.layout().legacy_path().display());
        }
        MigrationOutcome::Migrated {
            categories,
            backup_path,
        } => {
            println!("Migrated {} categories", categories);
            println!("  Backup: {}", backup_path.display());
        }
    }
}

fn run_validate(config_dir: &Path, model_root: &Path, category_name: &str) {
    let snapshot = load_snapshot(config_dir);

    let category = match snapshot.category(category_name) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Available categories: {}", snapshot.category_names().join(", "));
            process::exit(1);
        }
    };

    let validator = PathValidator::new(model_root);
    let mut missing = 0;
    for (id, entry) in &category.loras {
        let resolved = validator.resolve(entry);
        if validator.validate(entry) {
            println!("  ok       {} ({})", id, resolved.display());
        } else {
            missing += 1;
            println!("  missing  {} ({})", id, resolved.display());
        }
    }

    println!();
    println!("{} of {} LoRA files found", category.len() - missing, category.len());
    if missing > 0 {
        process::exit(1);
    }
}

fn run_init(config_dir: &Path) {
    let store = ConfigStore::new(config_dir);
    match init_defaults(store.layout()) {
        Ok(written) if written.is_empty() => {
            println!("Config already present in {}", config_dir.display());
        }
        Ok(written) => {
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("Error writing defaults: {}", e);
            process::exit(1);
        }
    }
}

fn run_schema(config_dir: &Path) {
    let categories = ConfigStore::new(config_dir)
        .snapshot()
        .map(|s| s.category_names().into_iter().map(String::from).collect())
        .unwrap_or_default();
    print_json(&NodeSchema::for_categories(categories));
}
