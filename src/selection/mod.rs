//! Seeded LoRA selection
//!
//! Selection algorithm:
//! 1. Resolve the category (unknown or empty categories fail)
//! 2. Clamp the requested count to [1, available]
//! 3. Resolve the seed: fixed, from settings, or freshly drawn
//! 4. Draw LoRA ids without replacement, uniformly over remaining candidates
//! 5. Per selected entry, draw trigger words without replacement and resolve
//!    the strength
//!
//! Candidates are ordered by id, so a fixed seed reproduces the same result
//! across runs and restarts for identical configuration.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::{Category, ConfigError, ConfigSnapshot, GlobalSettings, LoraEntry};

/// Host seed value meaning "pick a random seed". Any negative value counts.
pub const RANDOM_SEED: i64 = -1;

/// Host strength value meaning "use the entry's default". Any value <= 0 counts.
pub const USE_DEFAULT_STRENGTH: f64 = -1.0;

/// Upper bound (inclusive) for freshly drawn seeds, matching the host's seed range.
pub const MAX_DRAWN_SEED: u64 = u32::MAX as u64;

/// Where the seed for a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    /// Supplied by the caller
    Fixed,
    /// `random_seed` from global settings
    Settings,
    /// Drawn from entropy
    Entropy,
}

/// The seed a selection actually ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedChoice {
    pub seed: u64,
    pub source: SeedSource,
}

impl SeedChoice {
    pub fn fixed(seed: u64) -> Self {
        Self {
            seed,
            source: SeedSource::Fixed,
        }
    }

    /// Resolve a host seed. Negative means random: the settings seed is used
    /// when configured, otherwise a seed is drawn so the run can be replayed.
    pub fn resolve(requested: i64, settings: &GlobalSettings) -> Self {
        if let Ok(seed) = u64::try_from(requested) {
            return Self::fixed(seed);
        }
        if let Some(seed) = settings.fallback_seed() {
            return Self {
                seed,
                source: SeedSource::Settings,
            };
        }
        Self {
            seed: rand::thread_rng().gen_range(0..=MAX_DRAWN_SEED),
            source: SeedSource::Entropy,
        }
    }

    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }
}

/// Strength override requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StrengthOverride {
    #[default]
    UseDefault,
    Fixed(f64),
}

impl StrengthOverride {
    /// Interpret a host value: positive finite values override, anything else
    /// (the `-1.0` sentinel, zero, NaN) means "use default".
    pub fn from_host(value: f64) -> Self {
        if value.is_finite() && value > 0.0 {
            StrengthOverride::Fixed(value)
        } else {
            StrengthOverride::UseDefault
        }
    }

    /// Override, else the entry's own default, else the global default.
    pub fn resolve(&self, entry: &LoraEntry, settings: &GlobalSettings) -> f64 {
        match self {
            StrengthOverride::Fixed(value) => *value,
            StrengthOverride::UseDefault => entry
                .strength_default
                .unwrap_or(settings.default_strength),
        }
    }
}

/// Parameters of a single selection.
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    /// Number of LoRAs wanted (clamped to [1, available])
    pub count: usize,
    /// Trigger words wanted per LoRA (clamped to the global max and availability)
    pub trigger_word_count: usize,
    /// Host seed; negative means random
    pub seed: i64,
    pub strength_override: StrengthOverride,
}

impl Default for SelectionRequest {
    fn default() -> Self {
        Self {
            count: 1,
            trigger_word_count: 1,
            seed: RANDOM_SEED,
            strength_override: StrengthOverride::UseDefault,
        }
    }
}

impl SelectionRequest {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    pub fn with_trigger_words(mut self, count: usize) -> Self {
        self.trigger_word_count = count;
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_strength(mut self, strength: StrengthOverride) -> Self {
        self.strength_override = strength;
        self
    }
}

/// One selected LoRA with its resolved values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedLora {
    pub lora_id: String,
    pub entry: LoraEntry,
    pub strength: f64,
    /// Chosen trigger words in draw order
    pub trigger_words: Vec<String>,
    /// Distinct trigger words the entry offers
    pub trigger_words_available: usize,
    /// `None` when file validation was not performed
    pub path_valid: Option<bool>,
}

impl SelectedLora {
    pub fn file_path(&self) -> &str {
        &self.entry.file_path
    }
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub category: String,
    pub selected: Vec<SelectedLora>,
    pub seed: SeedChoice,
    pub requested_count: usize,
    pub requested_trigger_words: usize,
    /// Per-entry trigger word limit actually applied
    pub trigger_word_limit: usize,
    /// Cap on the aggregated trigger word list
    pub max_trigger_words: usize,
}

impl SelectionResult {
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn first(&self) -> Option<&SelectedLora> {
        self.selected.first()
    }

    pub fn lora_ids(&self) -> Vec<&str> {
        self.selected.iter().map(|s| s.lora_id.as_str()).collect()
    }

    /// Chosen words per selected entry, in selection order.
    pub fn trigger_word_groups(&self) -> impl Iterator<Item = &[String]> + '_ {
        self.selected.iter().map(|s| s.trigger_words.as_slice())
    }

    /// Aggregated, de-duplicated words under the global cap.
    pub fn all_trigger_words(&self) -> Vec<String> {
        lora_prompt::aggregate_trigger_words(self.trigger_word_groups(), Some(self.max_trigger_words))
    }

    /// Mean resolved strength, 0.0 when nothing is selected.
    pub fn combined_strength(&self) -> f64 {
        if self.selected.is_empty() {
            return 0.0;
        }
        self.selected.iter().map(|s| s.strength).sum::<f64>() / self.selected.len() as f64
    }

    /// Entries whose requested trigger word count was cut down by availability.
    pub fn short_on_trigger_words(&self) -> Vec<&SelectedLora> {
        self.selected
            .iter()
            .filter(|s| s.trigger_words_available < self.trigger_word_limit)
            .collect()
    }
}

/// Draws selections from a loaded configuration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SelectionEngine<'a> {
    snapshot: &'a ConfigSnapshot,
}

impl<'a> SelectionEngine<'a> {
    pub fn new(snapshot: &'a ConfigSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.snapshot.settings
    }

    /// Select from `category` with a seed resolved from the request.
    pub fn select(
        &self,
        category: &str,
        request: &SelectionRequest,
    ) -> Result<SelectionResult, ConfigError> {
        let seed = SeedChoice::resolve(request.seed, self.settings());
        self.select_seeded(category, request, seed)
    }

    /// Select with an explicit seed choice.
    pub fn select_seeded(
        &self,
        category_name: &str,
        request: &SelectionRequest,
        seed: SeedChoice,
    ) -> Result<SelectionResult, ConfigError> {
        let category = self.snapshot.category(category_name)?;
        if category.is_empty() {
            return Err(ConfigError::EmptyCategory(category_name.to_string()));
        }

        let settings = self.settings();
        let mut rng = seed.rng();

        let count = request.count.clamp(1, category.len());
        let trigger_word_limit = request
            .trigger_word_count
            .min(settings.max_trigger_words as usize);

        let selected = draw_loras(category, count, &mut rng)
            .into_iter()
            .map(|(id, entry)| {
                let available = distinct_words(&entry.trigger_words);
                let trigger_words = draw_words(&available, trigger_word_limit, &mut rng);
                if trigger_words.len() < trigger_word_limit {
                    debug!(
                        lora = %id,
                        requested = trigger_word_limit,
                        available = available.len(),
                        "Fewer trigger words available than requested"
                    );
                }
                SelectedLora {
                    lora_id: id.to_string(),
                    entry: entry.clone(),
                    strength: request.strength_override.resolve(entry, settings),
                    trigger_words,
                    trigger_words_available: available.len(),
                    path_valid: None,
                }
            })
            .collect::<Vec<_>>();

        info!(
            category = %category_name,
            selected = selected.len(),
            seed = seed.seed,
            "Selected LoRAs"
        );

        Ok(SelectionResult {
            category: category_name.to_string(),
            selected,
            seed,
            requested_count: request.count,
            requested_trigger_words: request.trigger_word_count,
            trigger_word_limit,
            max_trigger_words: settings.max_trigger_words as usize,
        })
    }
}

/// Draw `count` distinct entries in draw order.
fn draw_loras<'c, R: Rng + ?Sized>(
    category: &'c Category,
    count: usize,
    rng: &mut R,
) -> Vec<(&'c str, &'c LoraEntry)> {
    let candidates: Vec<(&str, &LoraEntry)> = category
        .loras
        .iter()
        .map(|(id, entry)| (id.as_str(), entry))
        .collect();
    let amount = count.min(candidates.len());

    index::sample(rng, candidates.len(), amount)
        .into_iter()
        .map(|i| candidates[i])
        .collect()
}

/// An entry's words with exact duplicates removed, first occurrence kept.
fn distinct_words(words: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    words
        .iter()
        .map(String::as_str)
        .filter(|w| !w.trim().is_empty() && seen.insert(*w))
        .collect()
}

/// Draw up to `limit` words without replacement.
fn draw_words<R: Rng + ?Sized>(words: &[&str], limit: usize, rng: &mut R) -> Vec<String> {
    let amount = limit.min(words.len());
    if amount == 0 {
        return Vec::new();
    }
    index::sample(rng, words.len(), amount)
        .into_iter()
        .map(|i| words[i].to_string())
        .collect()
}
