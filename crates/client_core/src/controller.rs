//! Page controller: version display, classification submission and the
//! feedback/correction/flag relay.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ClassificationResult, CorrectionLabel, FeedbackLabel, FlagReason, PredictionId},
    error::InputError,
    protocol::{FeedbackRequest, FlagRequest},
};
use tokio::{sync::broadcast, task::JoinHandle, time::Instant};
use tracing::{debug, error, info};

use crate::{
    session::PredictionSession,
    view::{
        render_result, ClientEvent, Page, PageState, CLASSIFICATION_ERROR,
        CORRECTION_CONFIRMATION, FEEDBACK_CONFIRMATION, FLAG_CONFIRMATION, VERSION_ERROR,
    },
    SentimentApi, VersionSource,
};

pub const CONFIRMATION_DISPLAY: Duration = Duration::from_secs(3);
pub const FLAG_QUESTION: &str =
    "Why are you flagging this prediction?\n(inappropriate/wrong_context/other)";

/// Synchronous free-text question to the user. `None` means dismissed.
pub trait Prompter: Send + Sync {
    fn ask(&self, question: &str) -> Option<String>;
}

/// Prompter for front ends that cannot ask; every flag uses the default reason.
pub struct DismissingPrompter;

impl Prompter for DismissingPrompter {
    fn ask(&self, _question: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub version_source: VersionSource,
    pub fetch_model_version: bool,
    /// Ticker symbol becomes mandatory and is echoed with the result. It is never sent.
    pub require_ticker: bool,
    pub show_confidence: bool,
    pub confirmation_duration: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            version_source: VersionSource::Combined,
            fetch_model_version: true,
            require_ticker: false,
            show_confidence: false,
            confirmation_duration: CONFIRMATION_DISPLAY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmitForm {
    pub text: String,
    pub ticker: Option<String>,
}

impl SubmitForm {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ticker: None,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Feedback(FeedbackLabel),
    Correction(CorrectionLabel),
    Flag,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Feedback(_) => "feedback",
            Action::Correction(_) => "correction",
            Action::Flag => "flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Rejected(InputError),
    Classified(ClassificationResult),
    Failed,
}

enum Relay {
    Feedback(FeedbackRequest),
    Correction(FeedbackRequest),
    Flag(FlagRequest),
}

pub struct Controller {
    api: Arc<dyn SentimentApi>,
    prompter: Arc<dyn Prompter>,
    options: ControllerOptions,
    session: PredictionSession,
    page: Page,
}

impl Controller {
    pub fn new(
        api: Arc<dyn SentimentApi>,
        prompter: Arc<dyn Prompter>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            prompter,
            options,
            session: PredictionSession::new(),
            page: Page::new(),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.page.subscribe()
    }

    pub async fn snapshot(&self) -> PageState {
        self.page.snapshot().await
    }

    pub async fn current_prediction(&self) -> Option<PredictionId> {
        self.session.current().await
    }

    /// Loads both version regions concurrently; one failing never affects the other.
    pub async fn initialize(&self) {
        let app = async {
            let text = match self.api.app_version(self.options.version_source).await {
                Ok(version) => version,
                Err(error) => {
                    error!(%error, "failed to load app version");
                    VERSION_ERROR.to_string()
                }
            };
            self.page.set_app_version(text).await;
        };

        let model = async {
            if !self.options.fetch_model_version {
                return;
            }
            let text = match self.api.model_version().await {
                Ok(version) => version,
                Err(error) => {
                    error!(%error, "failed to load model version");
                    VERSION_ERROR.to_string()
                }
            };
            self.page.set_model_version(text).await;
        };

        tokio::join!(app, model);
    }

    pub async fn submit(&self, form: SubmitForm) -> SubmitOutcome {
        self.page.clear_result().await;

        let (text, ticker) = match self.validate(&form) {
            Ok(valid) => valid,
            Err(err) => {
                self.page.render_prompt(err.to_string()).await;
                return SubmitOutcome::Rejected(err);
            }
        };

        match self.api.classify(&text).await {
            Ok(result) => {
                self.session.replace(result.prediction_id.clone()).await;
                let lines = render_result(&result, ticker.as_deref(), self.options.show_confidence);
                self.page
                    .render_result(lines, result.sentiment.style())
                    .await;
                self.page.reveal_feedback().await;
                info!(
                    sentiment = ?result.sentiment,
                    prediction_id = ?result.prediction_id,
                    "classification rendered"
                );
                SubmitOutcome::Classified(result)
            }
            Err(error) => {
                error!(%error, "failed to fetch sentiment");
                self.page.render_failure(CLASSIFICATION_ERROR).await;
                SubmitOutcome::Failed
            }
        }
    }

    fn validate(&self, form: &SubmitForm) -> Result<(String, Option<String>), InputError> {
        let text = form.text.trim();
        let ticker = form
            .ticker
            .as_deref()
            .map(str::trim)
            .filter(|ticker| !ticker.is_empty());

        if self.options.require_ticker {
            return match ticker {
                Some(ticker) if !text.is_empty() => {
                    Ok((text.to_string(), Some(ticker.to_string())))
                }
                _ => Err(InputError::MissingTickerOrText),
            };
        }

        if text.is_empty() {
            return Err(InputError::MissingText);
        }
        Ok((text.to_string(), ticker.map(str::to_string)))
    }

    /// Runs one user action against the stored prediction. Without a stored
    /// prediction the action is dropped and `None` is returned; otherwise the
    /// request runs as a detached task.
    pub async fn dispatch(self: &Arc<Self>, action: Action) -> Option<JoinHandle<()>> {
        let Some(prediction_id) = self.session.current().await else {
            debug!(action = action.name(), "no stored prediction; ignoring action");
            return None;
        };

        let relay = match action {
            Action::Feedback(label) => {
                Relay::Feedback(FeedbackRequest::feedback(prediction_id, label))
            }
            Action::Correction(label) => {
                Relay::Correction(FeedbackRequest::correction(prediction_id, label))
            }
            Action::Flag => {
                let reason = FlagReason::from_answer(self.prompter.ask(FLAG_QUESTION));
                Relay::Flag(FlagRequest {
                    prediction_id,
                    reason,
                })
            }
        };

        Some(self.spawn_relay(relay))
    }

    fn spawn_relay(self: &Arc<Self>, relay: Relay) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let (outcome, confirmation, action) = match &relay {
                Relay::Feedback(request) => (
                    controller.api.send_feedback(request).await,
                    FEEDBACK_CONFIRMATION,
                    "feedback",
                ),
                Relay::Correction(request) => (
                    controller.api.send_feedback(request).await,
                    CORRECTION_CONFIRMATION,
                    "correction",
                ),
                Relay::Flag(request) => (
                    controller.api.flag(request).await,
                    FLAG_CONFIRMATION,
                    "flag",
                ),
            };

            match outcome {
                Ok(()) => controller.show_confirmation(confirmation).await,
                Err(error) => error!(%error, action, "failed to submit {action}"),
            }
        })
    }

    /// Shows a confirmation and schedules its hide exactly one display
    /// duration later, independent of anything else in flight.
    async fn show_confirmation(self: &Arc<Self>, message: &str) {
        let deadline = Instant::now() + self.options.confirmation_duration;
        let generation = self.page.show_confirmation(message).await;
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            controller.page.hide_confirmation(generation).await;
        });
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
