use serde::{Deserialize, Serialize};

use crate::domain::{
    ClassificationResult, CorrectionLabel, FeedbackLabel, FlagReason, PredictionId, Sentiment,
};

pub const VERSION_PATH: &str = "version";
pub const APP_VERSION_PATH: &str = "version/appversion";
pub const MODEL_VERSION_PATH: &str = "version/modelversion";
pub const SENTIMENT_PATH: &str = "sentiment";
pub const FEEDBACK_PATH: &str = "feedback";
pub const FLAG_PATH: &str = "flag";

/// Body of every `/version*` endpoint. Each endpoint fills a different field,
/// with `message` as the generic fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_service_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VersionResponse {
    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref().or(self.message.as_deref())
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model_service_version
            .as_deref()
            .or(self.message.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub sentiment: serde_json::Value,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub prediction_id: Option<String>,
}

impl From<SentimentResponse> for ClassificationResult {
    fn from(value: SentimentResponse) -> Self {
        Self {
            sentiment: Sentiment::from_wire(&value.sentiment),
            confidence: value.confidence,
            prediction_id: value.prediction_id.map(PredictionId),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub prediction_id: PredictionId,
    pub feedback: FeedbackLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<CorrectionLabel>,
}

impl FeedbackRequest {
    pub fn feedback(prediction_id: PredictionId, feedback: FeedbackLabel) -> Self {
        Self {
            prediction_id,
            feedback,
            correction: None,
        }
    }

    /// A correction always travels as `feedback=incorrect`.
    pub fn correction(prediction_id: PredictionId, correction: CorrectionLabel) -> Self {
        Self {
            prediction_id,
            feedback: FeedbackLabel::incorrect(),
            correction: Some(correction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRequest {
    pub prediction_id: PredictionId,
    pub reason: FlagReason,
}
