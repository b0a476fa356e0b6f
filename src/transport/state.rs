use std::sync::Arc;

use crate::broker::Broker;
use crate::dataset::Dataset;

/// Shared state handed to every HTTP handler.
#[derive(Debug)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub dataset: Dataset,
    /// Topic that producers publish to through `POST /log`.
    pub topic: String,
}

impl AppState {
    pub fn new(broker: Arc<Broker>, dataset: Dataset, topic: &str) -> Self {
        Self {
            broker,
            dataset,
            topic: topic.to_string(),
        }
    }
}
