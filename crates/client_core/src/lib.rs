use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::ClassificationResult,
    protocol::{
        FeedbackRequest, FlagRequest, SentimentRequest, SentimentResponse, VersionResponse,
        APP_VERSION_PATH, FEEDBACK_PATH, FLAG_PATH, MODEL_VERSION_PATH, SENTIMENT_PATH,
        VERSION_PATH,
    },
};
use tracing::{debug, warn};
use url::Url;

pub mod controller;
pub mod error;
mod session;
pub mod view;

pub use controller::{
    Action, Controller, ControllerOptions, DismissingPrompter, Prompter, SubmitForm, SubmitOutcome,
};
pub use error::{ClientError, Result};
pub use session::PredictionSession;
pub use view::{ClientEvent, PageState};

/// Where the application version is read from. Older deployments expose it on
/// `/version`, newer ones split app and model versions under `/version/*`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    #[default]
    Combined,
    Split,
}

impl VersionSource {
    pub fn path(self) -> &'static str {
        match self {
            VersionSource::Combined => VERSION_PATH,
            VersionSource::Split => APP_VERSION_PATH,
        }
    }
}

#[async_trait]
pub trait SentimentApi: Send + Sync {
    async fn app_version(&self, source: VersionSource) -> Result<String>;
    async fn model_version(&self) -> Result<String>;
    async fn classify(&self, text: &str) -> Result<ClassificationResult>;
    async fn send_feedback(&self, request: &FeedbackRequest) -> Result<()>;
    async fn flag(&self, request: &FlagRequest) -> Result<()>;
}

pub struct HttpSentimentApi {
    http: Client,
    base_url: Url,
}

impl HttpSentimentApi {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let parsed = Url::parse(&normalized).map_err(|source| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    fn endpoint(&self, path: &'static str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                source,
            })
    }

    /// Sends the request and returns the raw body. Only failures to reach the
    /// service are errors; an error status is logged and its body returned.
    async fn read_body(&self, path: &'static str, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: path,
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = path, %status, "service answered with an error status");
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: path,
                source,
            })?;
        Ok(body.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(endpoint = path, "GET");
        let body = self.read_body(path, self.http.get(url)).await?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            endpoint: path,
            source,
        })
    }

    async fn post_form<B: Serialize + ?Sized>(
        &self,
        path: &'static str,
        form: &B,
    ) -> Result<Vec<u8>> {
        let url = self.endpoint(path)?;
        debug!(endpoint = path, "POST");
        self.read_body(path, self.http.post(url).form(form)).await
    }
}

fn version_string(
    endpoint: &'static str,
    body: &VersionResponse,
    pick: fn(&VersionResponse) -> Option<&str>,
) -> Result<String> {
    pick(body)
        .map(str::to_string)
        .ok_or(ClientError::MissingVersion { endpoint })
}

#[async_trait]
impl SentimentApi for HttpSentimentApi {
    async fn app_version(&self, source: VersionSource) -> Result<String> {
        let path = source.path();
        let body: VersionResponse = self.get_json(path).await?;
        version_string(path, &body, VersionResponse::app_version)
    }

    async fn model_version(&self) -> Result<String> {
        let body: VersionResponse = self.get_json(MODEL_VERSION_PATH).await?;
        version_string(MODEL_VERSION_PATH, &body, VersionResponse::model_version)
    }

    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let body = self
            .post_form(
                SENTIMENT_PATH,
                &SentimentRequest {
                    text: text.to_string(),
                },
            )
            .await?;
        let response: SentimentResponse =
            serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
                endpoint: SENTIMENT_PATH,
                source,
            })?;
        Ok(response.into())
    }

    async fn send_feedback(&self, request: &FeedbackRequest) -> Result<()> {
        self.post_form(FEEDBACK_PATH, request).await?;
        Ok(())
    }

    async fn flag(&self, request: &FlagRequest) -> Result<()> {
        self.post_form(FLAG_PATH, request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
