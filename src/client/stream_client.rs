use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::broker::Subscriber;
use crate::record::LogRecord;
use crate::utils::error::DeliveryError;

/// A connected streaming client.
///
/// Each delivered record is serialized to JSON and queued on `sender`. Once
/// the receiving side is gone, deliveries fail so the record stays pending
/// until the subscription is removed.
#[derive(Debug, Clone)]
pub struct StreamClient {
    /// Connection identifier, used only for logging.
    pub id: String,
    pub sender: UnboundedSender<String>,
}

impl StreamClient {
    pub fn new(sender: UnboundedSender<String>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
        }
    }
}

impl Subscriber for StreamClient {
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(record)
            .map_err(|e| DeliveryError::new(format!("failed to serialize record: {e}")))?;
        self.sender
            .send(json)
            .map_err(|_| DeliveryError::new(format!("{} disconnected", self.id)))
    }
}
