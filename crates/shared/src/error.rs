use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Local input failures. The display text is the prompt shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputError {
    #[error("Please enter a comment.")]
    MissingText,
    #[error("Please enter both a ticker symbol and a comment.")]
    MissingTickerOrText,
}
