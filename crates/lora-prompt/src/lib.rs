//! Prompt composition for LoRA trigger words.
//!
//! Merges a base prompt with the trigger words chosen for a set of selected
//! LoRAs into a single prompt string.

mod position;
mod words;

pub use position::{PromptError, PromptPosition};
pub use words::{aggregate_trigger_words, clean_prompt, join_words};

/// Default separator between prompt segments.
pub const DEFAULT_SEPARATOR: &str = ", ";

/// Composes a base prompt with aggregated trigger words.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    separator: String,
    position: PromptPosition,
    max_words: Option<usize>,
    clean: bool,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            position: PromptPosition::default(),
            max_words: None,
            clean: true,
        }
    }
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on the total number of words across all groups.
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = Some(max_words);
        self
    }

    pub fn with_position(mut self, position: PromptPosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Toggle comma-segment cleanup of the composed prompt.
    ///
    /// Cleanup splits on `,` and rejoins with `", "`, so it is skipped
    /// automatically when the separator has no comma.
    pub fn with_cleaning(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn position(&self) -> PromptPosition {
        self.position
    }

    pub fn max_words(&self) -> Option<usize> {
        self.max_words
    }

    /// Aggregate per-entry word groups under this composer's cap.
    pub fn aggregate<G, W>(&self, groups: G) -> Vec<String>
    where
        G: IntoIterator,
        G::Item: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        aggregate_trigger_words(groups, self.max_words)
    }

    /// Join the aggregated words of `groups` with the separator.
    pub fn joined_words<G, W>(&self, groups: G) -> String
    where
        G: IntoIterator,
        G::Item: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        join_words(&self.aggregate(groups), &self.separator)
    }

    /// Compose from per-entry word groups.
    pub fn compose_groups<G, W>(&self, base_prompt: &str, groups: G) -> String
    where
        G: IntoIterator,
        G::Item: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let words = self.aggregate(groups);
        self.compose(base_prompt, &words)
    }

    /// Compose from an already aggregated word list.
    ///
    /// With no words the base prompt is returned untouched.
    pub fn compose<W: AsRef<str>>(&self, base_prompt: &str, words: &[W]) -> String {
        let words: Vec<&str> = words
            .iter()
            .map(|w| w.as_ref())
            .filter(|w| !w.trim().is_empty())
            .collect();
        if words.is_empty() {
            return base_prompt.to_string();
        }

        let joined = join_words(&words, &self.separator);
        let base = base_prompt.trim();

        let composed = if base.is_empty() {
            joined
        } else {
            let sep = &self.separator;
            match self.position {
                PromptPosition::Beginning => format!("{joined}{sep}{base}"),
                PromptPosition::End => format!("{base}{sep}{joined}"),
                PromptPosition::Both => format!("{joined}{sep}{base}{sep}{joined}"),
            }
        };

        if self.clean && self.separator.contains(',') {
            clean_prompt(&composed)
        } else {
            composed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_appends_words() {
        let composer = PromptComposer::new();
        let prompt = composer.compose("a cat", &["anime girl", "kawaii"]);
        assert_eq!(prompt, "a cat, anime girl, kawaii");
    }

    #[test]
    fn test_compose_no_words_returns_base_unchanged() {
        let composer = PromptComposer::new();
        let empty: [&str; 0] = [];
        assert_eq!(composer.compose("a cat", &empty), "a cat");
        assert_eq!(composer.compose("  a cat,, \n", &empty), "  a cat,, \n");
    }

    #[test]
    fn test_compose_empty_base() {
        let composer = PromptComposer::new();
        assert_eq!(composer.compose("", &["kawaii", "pastel"]), "kawaii, pastel");
        assert_eq!(composer.compose("   ", &["kawaii"]), "kawaii");
    }

    #[test]
    fn test_compose_positions() {
        let words = ["w1", "w2"];
        let beginning = PromptComposer::new().with_position(PromptPosition::Beginning);
        assert_eq!(beginning.compose("base", &words), "w1, w2, base");

        let both = PromptComposer::new().with_position(PromptPosition::Both);
        assert_eq!(both.compose("base", &words), "w1, w2, base, w1, w2");
    }

    #[test]
    fn test_compose_cleans_segments() {
        let composer = PromptComposer::new();
        let prompt = composer.compose("a cat ,, red hat,", &["kawaii"]);
        assert_eq!(prompt, "a cat, red hat, kawaii");
    }

    #[test]
    fn test_custom_separator_skips_cleaning() {
        let composer = PromptComposer::new().with_separator(" | ");
        assert_eq!(composer.compose("a, b", &["w"]), "a, b | w");
    }

    #[test]
    fn test_global_cap_keeps_original_order() {
        let composer = PromptComposer::new().with_max_words(3);
        let groups = vec![vec!["one", "two"], vec!["three", "four", "five"]];
        let prompt = composer.compose_groups("", groups);
        assert_eq!(prompt, "one, two, three");
    }

    #[test]
    fn test_joined_words_dedupes() {
        let composer = PromptComposer::new();
        let groups = vec![vec!["a", "b"], vec!["b", "c"]];
        assert_eq!(composer.joined_words(groups), "a, b, c");
    }
}
