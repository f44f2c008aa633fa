use shared::domain::PredictionId;
use tokio::sync::RwLock;

/// Prediction reference for the lifetime of one controller. Whichever
/// classification response resolves last wins.
#[derive(Debug, Default)]
pub struct PredictionSession {
    current: RwLock<Option<PredictionId>>,
}

impl PredictionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, prediction_id: Option<PredictionId>) -> Option<PredictionId> {
        let mut guard = self.current.write().await;
        std::mem::replace(&mut *guard, prediction_id)
    }

    pub async fn current(&self) -> Option<PredictionId> {
        self.current.read().await.clone()
    }
}
