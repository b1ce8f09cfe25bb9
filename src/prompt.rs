//! Prompt composition for a selection result.

use lora_prompt::{PromptComposer, PromptPosition};

use crate::selection::SelectionResult;

/// Composer configured with the selection's global trigger word cap.
pub fn composer_for(result: &SelectionResult, position: PromptPosition) -> PromptComposer {
    PromptComposer::new()
        .with_max_words(result.max_trigger_words)
        .with_position(position)
}

/// Append the selection's aggregated trigger words to `base_prompt`.
pub fn compose(base_prompt: &str, result: &SelectionResult) -> String {
    compose_at(base_prompt, result, PromptPosition::End)
}

/// Like [`compose`], with an explicit placement for the words.
pub fn compose_at(base_prompt: &str, result: &SelectionResult, position: PromptPosition) -> String {
    composer_for(result, position).compose(base_prompt, &result.all_trigger_words())
}
