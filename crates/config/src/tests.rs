#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use crate::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.worker_count, 3);
        assert_eq!(config.scheduler.tick_interval_ms, 60_000);
        assert_eq!(config.scheduler.dequeue_timeout_ms, 30_000);
        assert_eq!(config.scheduler.worker_error_backoff_ms, 5_000);
        assert_eq!(config.scheduler.initial_batch_size, 5);
        assert_eq!(config.scheduler.upcoming_limit, 10);
        assert!(!config.scheduler.recurring_dedupe);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [scheduler]
            worker_count = 8
            tick_interval_ms = 1000

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.worker_count, 8);
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.scheduler.initial_batch_size, 5);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [scheduler]
            worker_count = 0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [observability]
            log_format = "xml"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = AppConfig::default();
        config.observability.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [scheduler]
            worker_count = 2
            initial_batch_size = 3

            [embedded]
            channels = ["tech-daily", "cooking-weekly"]
            "#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.scheduler.worker_count, 2);
        assert_eq!(config.scheduler.initial_batch_size, 3);
        assert_eq!(config.embedded.channels, vec!["tech-daily", "cooking-weekly"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = AppConfig::load(Some("/nonexistent/content-scheduler.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = AppConfig::default();
        config.scheduler.worker_count = 6;
        let rendered = config.to_toml_string().unwrap();
        let parsed = AppConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_durations() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval().as_secs(), 60);
        assert_eq!(config.dequeue_timeout().as_secs(), 30);
        assert_eq!(config.worker_error_backoff().as_secs(), 5);
        assert_eq!(config.shutdown_timeout().as_secs(), 30);
    }
}
