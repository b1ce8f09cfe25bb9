//! Where trigger words go relative to the base prompt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placement of the joined trigger words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPosition {
    /// `words, base`
    Beginning,
    /// `base, words`
    #[default]
    End,
    /// `words, base, words`
    Both,
}

impl PromptPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptPosition::Beginning => "beginning",
            PromptPosition::End => "end",
            PromptPosition::Both => "both",
        }
    }
}

impl fmt::Display for PromptPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt composition errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("Unknown prompt position '{0}' (expected beginning, end or both)")]
    UnknownPosition(String),
}

impl FromStr for PromptPosition {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginning" | "start" => Ok(PromptPosition::Beginning),
            "end" => Ok(PromptPosition::End),
            "both" => Ok(PromptPosition::Both),
            _ => Err(PromptError::UnknownPosition(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_end() {
        assert_eq!(PromptPosition::default(), PromptPosition::End);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Beginning".parse::<PromptPosition>(), Ok(PromptPosition::Beginning));
        assert_eq!(" both ".parse::<PromptPosition>(), Ok(PromptPosition::Both));
        assert_eq!(
            "middle".parse::<PromptPosition>(),
            Err(PromptError::UnknownPosition("middle".to_string()))
        );
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&PromptPosition::Beginning).unwrap();
        assert_eq!(json, "\"beginning\"");
        let parsed: PromptPosition = serde_json::from_str("\"end\"").unwrap();
        assert_eq!(parsed, PromptPosition::End);
    }
}
