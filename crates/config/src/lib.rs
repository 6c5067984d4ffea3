pub mod models;

pub use models::{
    AppConfig, EmbeddedConfig, LogFormat, ObservabilityConfig, SchedulerConfig,
};

#[cfg(test)]
mod tests;
