use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! label_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

label_newtype!(PredictionId);
label_newtype!(FeedbackLabel);
label_newtype!(CorrectionLabel);
label_newtype!(FlagReason);

impl FeedbackLabel {
    pub const CORRECT: &'static str = "correct";
    pub const INCORRECT: &'static str = "incorrect";

    pub fn correct() -> Self {
        Self::new(Self::CORRECT)
    }

    pub fn incorrect() -> Self {
        Self::new(Self::INCORRECT)
    }
}

impl CorrectionLabel {
    pub const POSITIVE: &'static str = "positive";
    pub const NEGATIVE: &'static str = "negative";
}

impl FlagReason {
    pub const DEFAULT: &'static str = "other";

    /// Resolves a prompt answer; a dismissed prompt or a blank answer falls back to `other`.
    pub fn from_answer(answer: Option<String>) -> Self {
        match answer {
            Some(answer) if !answer.trim().is_empty() => Self::new(answer.trim()),
            _ => Self::new(Self::DEFAULT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    /// Only the JSON number 1 counts as positive; anything else is negative.
    pub fn from_wire(value: &serde_json::Value) -> Self {
        let positive = match value {
            serde_json::Value::Number(number) => number.as_f64() == Some(1.0),
            _ => false,
        };
        if positive {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }

    pub fn glyph_label(self) -> &'static str {
        match self {
            Sentiment::Positive => "😊 Positive",
            Sentiment::Negative => "☹️ Negative",
        }
    }

    pub fn style(self) -> ResultStyle {
        match self {
            Sentiment::Positive => ResultStyle::Positive,
            Sentiment::Negative => ResultStyle::Negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStyle {
    Positive,
    Negative,
}

impl ResultStyle {
    pub fn class_name(self) -> &'static str {
        match self {
            ResultStyle::Positive => "sentiment-positive",
            ResultStyle::Negative => "sentiment-negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub sentiment: Sentiment,
    pub confidence: Option<f64>,
    pub prediction_id: Option<PredictionId>,
}

impl ClassificationResult {
    pub fn confidence_percent(&self) -> Option<String> {
        self.confidence
            .map(|confidence| format!("{:.1}%", confidence * 100.0))
    }
}
