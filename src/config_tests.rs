// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::constants::{DEFAULT_FIELD_MANAGER, DEFAULT_LIST_PAGE_SIZE};
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["labels-injector"]).unwrap();

        assert_eq!(config.webhook_bind_address.port(), 9443);
        assert_eq!(config.admin_bind_address.port(), 8080);
        assert_eq!(config.intercept_timeout(), Duration::from_secs(5));
        assert_eq!(config.list_page_size, DEFAULT_LIST_PAGE_SIZE);
        assert_eq!(config.field_manager, DEFAULT_FIELD_MANAGER);
        assert!(!config.skip_startup_sweep);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "labels-injector",
            "--webhook-bind-address",
            "127.0.0.1:10443",
            "--intercept-timeout-ms",
            "250",
            "--skip-startup-sweep",
        ])
        .unwrap();

        assert_eq!(config.webhook_bind_address.to_string(), "127.0.0.1:10443");
        assert_eq!(config.intercept_timeout(), Duration::from_millis(250));
        assert!(config.skip_startup_sweep);
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let result = Config::try_parse_from(["labels-injector", "--admin-bind-address", "nope"]);
        assert!(result.is_err());
    }
}
