pub mod app_config;
pub mod embedded;
pub mod observability;
pub mod scheduler;

pub use app_config::AppConfig;
pub use embedded::EmbeddedConfig;
pub use observability::{LogFormat, ObservabilityConfig};
pub use scheduler::SchedulerConfig;
