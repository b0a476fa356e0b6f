//! The broker: topic logs, the subscription registry and the dispatch loop.

pub mod dispatch;
pub mod engine;
pub mod subscription;
pub mod topic;

pub use dispatch::{DispatchConfig, DispatchReport, Dispatcher, run_pass};
pub use engine::{Broker, PublishReceipt};
pub use subscription::{StartPosition, Subscriber, SubscriptionId};
pub use topic::{Offset, TopicLog, TopicView};
