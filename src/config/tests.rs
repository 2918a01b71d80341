#[cfg(test)]
mod config_tests {
    use crate::config::{
        default_host, default_log_level, default_max_request_size, default_port,
        default_service_name, default_static_dir, default_timeout, Config, ConfigError,
        DatabaseConfig, ObservabilityConfig, ServerConfig,
    };
    use serial_test::serial;
    use std::env;
    use std::time::Duration;

    const SERVER_VARS: &[&str] = &[
        "STOREFRONT_HOST",
        "STOREFRONT_PORT",
        "STOREFRONT_REQUEST_TIMEOUT_SECONDS",
        "STOREFRONT_MAX_REQUEST_SIZE",
        "STOREFRONT_STATIC_DIR",
        "STOREFRONT_ENABLE_ADMIN",
    ];

    const DATABASE_VARS: &[&str] = &[
        "STOREFRONT_DATABASE_URL",
        "STOREFRONT_DB_MAX_CONNECTIONS",
        "STOREFRONT_DB_MIN_CONNECTIONS",
        "STOREFRONT_DB_ACQUIRE_TIMEOUT_SECONDS",
        "STOREFRONT_RUN_SCHEMA_SETUP",
    ];

    fn clear(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn database_config(url: &str, min: u32, max: u32) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            max_connections: max,
            min_connections: min,
            acquire_timeout_seconds: 5,
            run_schema_setup: true,
        }
    }

    fn config_with(database: DatabaseConfig) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                request_timeout_seconds: 30,
                max_request_size: 1024,
                static_dir: "static".to_string(),
                enable_admin: false,
            },
            database,
            observability: ObservabilityConfig {
                service_name: "storefront-rs".to_string(),
                service_version: "0.1.0".to_string(),
                otlp_endpoint: None,
                log_level: "info".to_string(),
                enable_json_logging: false,
            },
        }
    }

    #[test]
    #[serial]
    fn test_server_config_defaults() {
        clear(SERVER_VARS);

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.max_request_size, 1024 * 1024);
        assert_eq!(config.static_dir, "static");
        assert!(!config.enable_admin);
    }

    #[test]
    #[serial]
    fn test_admin_routes_opt_in() {
        clear(SERVER_VARS);
        env::set_var("STOREFRONT_ENABLE_ADMIN", "true");

        let config = ServerConfig::from_env().unwrap();
        assert!(config.enable_admin);

        clear(SERVER_VARS);
    }

    #[test]
    #[serial]
    fn test_database_config_from_env() {
        env::set_var("STOREFRONT_DATABASE_URL", "postgres://shop:shop@db/shop");
        env::set_var("STOREFRONT_DB_MAX_CONNECTIONS", "20");
        env::set_var("STOREFRONT_DB_MIN_CONNECTIONS", "2");
        env::set_var("STOREFRONT_RUN_SCHEMA_SETUP", "false");

        let config = DatabaseConfig::from_env().unwrap();

        assert_eq!(config.url, "postgres://shop:shop@db/shop");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(5));
        assert!(!config.run_schema_setup);

        clear(DATABASE_VARS);
    }

    #[test]
    #[serial]
    fn test_observability_config_from_env() {
        env::set_var("STOREFRONT_SERVICE_NAME", "test-service");
        env::set_var("STOREFRONT_SERVICE_VERSION", "1.0.0");
        env::set_var("STOREFRONT_OTLP_ENDPOINT", "http://collector:4317");
        env::set_var("STOREFRONT_LOG_LEVEL", "debug");

        let config = ObservabilityConfig::from_env().unwrap();

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.service_version, "1.0.0");
        assert_eq!(config.otlp_endpoint(), Some("http://collector:4317"));
        assert_eq!(config.log_level, "debug");
        assert!(!config.enable_json_logging);

        env::remove_var("STOREFRONT_SERVICE_NAME");
        env::remove_var("STOREFRONT_SERVICE_VERSION");
        env::remove_var("STOREFRONT_OTLP_ENDPOINT");
        env::remove_var("STOREFRONT_LOG_LEVEL");
    }

    #[test]
    fn test_blank_otlp_endpoint_is_ignored() {
        let mut config = config_with(database_config("postgres://db", 1, 10)).observability;
        config.otlp_endpoint = Some("   ".to_string());
        assert_eq!(config.otlp_endpoint(), None);
    }

    #[test]
    #[serial]
    fn test_missing_database_url_is_rejected() {
        clear(DATABASE_VARS);

        let result = Config::from_environment();

        match result {
            Err(ConfigError::MissingEnvironmentVariable { name }) => {
                assert_eq!(name, "STOREFRONT_DATABASE_URL");
            }
            other => panic!("expected missing variable error, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_inverted_pool_bounds() {
        let config = config_with(database_config("postgres://db", 5, 2));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));

        let config = config_with(database_config("postgres://db", 1, 10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let mut config = config_with(database_config("postgres://db", 1, 10));
        config.server.port = 0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Server port cannot be 0");
    }

    #[test]
    fn test_database_config_debug_redacts_url() {
        let config = database_config("postgres://shop:secret@db/shop", 1, 10);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_server_config_request_timeout() {
        let config = config_with(database_config("postgres://db", 1, 10)).server;
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_host(), "0.0.0.0");
        assert_eq!(default_port(), 3000);
        assert_eq!(default_timeout(), 30);
        assert_eq!(default_max_request_size(), 1024 * 1024);
        assert_eq!(default_static_dir(), "static");
        assert_eq!(default_service_name(), "storefront-rs");
        assert_eq!(default_log_level(), "info");
    }
}
