use std::time::Duration;

use serde::Deserialize;

use crate::broker::DispatchConfig;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub dataset: DatasetSettings,
    pub logging: LoggingSettings,
}

/// Where the HTTP API listens and how long a request may take.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

/// Broker and dispatch loop parameters.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Topic that `POST /log` and the dataset replay publish to.
    pub topic: String,
    pub dispatch_interval_ms: u64,
    pub eager_dispatch: bool,
    /// Consecutive failures after which a record is skipped. `0` means retry
    /// forever.
    pub delivery_retries: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct DatasetSettings {
    /// JSON file with seed records. The built-in sample is used when unset.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl BrokerSettings {
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            interval: Duration::from_millis(self.dispatch_interval_ms.max(1)),
            eager: self.eager_dispatch,
            max_delivery_attempts: (self.delivery_retries > 0).then_some(self.delivery_retries),
        }
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from [`Settings::default`].
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub dataset: Option<PartialDatasetSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub topic: Option<String>,
    pub dispatch_interval_ms: Option<u64>,
    pub eager_dispatch: Option<bool>,
    pub delivery_retries: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialDatasetSettings {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8000,
                request_timeout_ms: 30_000,
            },
            broker: BrokerSettings {
                topic: "logs".to_string(),
                dispatch_interval_ms: 100,
                eager_dispatch: true,
                delivery_retries: 0,
            },
            dataset: DatasetSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Overlay the values that were provided onto `defaults`.
    pub fn merge_onto(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let broker = self.broker.unwrap_or_default();
        let dataset = self.dataset.unwrap_or_default();
        let logging = self.logging.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
                request_timeout_ms: server
                    .request_timeout_ms
                    .unwrap_or(defaults.server.request_timeout_ms),
            },
            broker: BrokerSettings {
                topic: broker.topic.unwrap_or(defaults.broker.topic),
                dispatch_interval_ms: broker
                    .dispatch_interval_ms
                    .unwrap_or(defaults.broker.dispatch_interval_ms),
                eager_dispatch: broker
                    .eager_dispatch
                    .unwrap_or(defaults.broker.eager_dispatch),
                delivery_retries: broker
                    .delivery_retries
                    .unwrap_or(defaults.broker.delivery_retries),
            },
            dataset: DatasetSettings {
                path: dataset.path.or(defaults.dataset.path),
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(defaults.logging.level),
            },
        }
    }
}
