//! LoRA Random Selector - randomized LoRA picks for image-generation graphs
//!
//! This crate loads categorized LoRA definitions from disk, draws a
//! reproducible random subset for a seed, checks that the chosen files
//! exist, and merges their trigger words into a prompt.

pub mod config;
pub mod node;
pub mod prompt;
pub mod report;
pub mod selection;
pub mod validation;

pub use config::{Category, ConfigError, ConfigSnapshot, ConfigStore, GlobalSettings, LoraEntry};
pub use lora_prompt::{PromptComposer, PromptPosition};
pub use node::{LoraRandomSelectorNode, NodeInputs, NodeOutputs};
pub use selection::{SelectionEngine, SelectionRequest, SelectionResult, StrengthOverride};
pub use validation::PathValidator;
