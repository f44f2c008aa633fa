//! Headless view model standing in for the page's display regions.

use shared::domain::{ClassificationResult, ResultStyle};
use tokio::sync::{broadcast, Mutex};

pub const VERSION_ERROR: &str = "Error";
pub const CLASSIFICATION_ERROR: &str = "Error analyzing sentiment.";
pub const FEEDBACK_CONFIRMATION: &str = "Thank you for your feedback!";
pub const CORRECTION_CONFIRMATION: &str = "Correction recorded. Thank you!";
pub const FLAG_CONFIRMATION: &str = "Prediction flagged. Thank you!";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    pub app_version: Option<String>,
    pub model_version: Option<String>,
    pub result_lines: Vec<String>,
    pub result_style: Option<ResultStyle>,
    pub feedback_visible: bool,
    pub confirmation: Option<String>,
}

impl PageState {
    pub fn result_text(&self) -> String {
        self.result_lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    AppVersion(String),
    ModelVersion(String),
    ResultCleared,
    ResultPrompt(String),
    ResultRendered {
        lines: Vec<String>,
        style: ResultStyle,
    },
    ResultFailed(String),
    FeedbackRevealed,
    ConfirmationShown(String),
    ConfirmationHidden,
}

/// Result region lines: glyph and label, then optional confidence and ticker echo.
pub fn render_result(
    result: &ClassificationResult,
    ticker: Option<&str>,
    show_confidence: bool,
) -> Vec<String> {
    let mut lines = vec![result.sentiment.glyph_label().to_string()];
    if show_confidence {
        if let Some(percent) = result.confidence_percent() {
            lines.push(format!("Confidence: {percent}"));
        }
    }
    if let Some(ticker) = ticker {
        lines.push(format!("Ticker: {ticker}"));
    }
    lines
}

struct PageInner {
    state: PageState,
    confirmation_generation: u64,
}

pub(crate) struct Page {
    inner: Mutex<PageInner>,
    events: broadcast::Sender<ClientEvent>,
}

impl Page {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Mutex::new(PageInner {
                state: PageState::default(),
                confirmation_generation: 0,
            }),
            events,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub(crate) async fn snapshot(&self) -> PageState {
        self.inner.lock().await.state.clone()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) async fn set_app_version(&self, text: String) {
        self.inner.lock().await.state.app_version = Some(text.clone());
        self.emit(ClientEvent::AppVersion(text));
    }

    pub(crate) async fn set_model_version(&self, text: String) {
        self.inner.lock().await.state.model_version = Some(text.clone());
        self.emit(ClientEvent::ModelVersion(text));
    }

    pub(crate) async fn clear_result(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.state.result_lines.clear();
            guard.state.result_style = None;
        }
        self.emit(ClientEvent::ResultCleared);
    }

    pub(crate) async fn render_prompt(&self, prompt: String) {
        self.inner.lock().await.state.result_lines = vec![prompt.clone()];
        self.emit(ClientEvent::ResultPrompt(prompt));
    }

    pub(crate) async fn render_result(&self, lines: Vec<String>, style: ResultStyle) {
        {
            let mut guard = self.inner.lock().await;
            guard.state.result_lines = lines.clone();
            guard.state.result_style = Some(style);
        }
        self.emit(ClientEvent::ResultRendered { lines, style });
    }

    pub(crate) async fn render_failure(&self, message: &str) {
        {
            let mut guard = self.inner.lock().await;
            guard.state.result_lines = vec![message.to_string()];
            guard.state.result_style = None;
        }
        self.emit(ClientEvent::ResultFailed(message.to_string()));
    }

    pub(crate) async fn reveal_feedback(&self) {
        self.inner.lock().await.state.feedback_visible = true;
        self.emit(ClientEvent::FeedbackRevealed);
    }

    /// Returns the generation the matching hide must present.
    pub(crate) async fn show_confirmation(&self, message: &str) -> u64 {
        let generation = {
            let mut guard = self.inner.lock().await;
            guard.confirmation_generation += 1;
            guard.state.confirmation = Some(message.to_string());
            guard.confirmation_generation
        };
        self.emit(ClientEvent::ConfirmationShown(message.to_string()));
        generation
    }

    /// Hides the confirmation unless a newer one replaced it in the meantime.
    pub(crate) async fn hide_confirmation(&self, generation: u64) -> bool {
        {
            let mut guard = self.inner.lock().await;
            if guard.confirmation_generation != generation || guard.state.confirmation.is_none() {
                return false;
            }
            guard.state.confirmation = None;
        }
        self.emit(ClientEvent::ConfirmationHidden);
        true
    }
}
