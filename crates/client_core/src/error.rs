use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to /{endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode /{endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("/{endpoint} response carried no version string")]
    MissingVersion { endpoint: &'static str },
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            ClientError::Decode { .. } | ClientError::MissingVersion { .. }
        )
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
