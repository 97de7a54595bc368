// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as SQL-safe table names, a usable bind address, and a positive page size.
//! Absent table names are not an error here; see the `require_*` accessors.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ChatkeepConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ChatkeepConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` must be one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.list_page_size == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.list_page_size must be at least 1".to_string(),
        });
    }

    // Table names are interpolated into SQL, so they must be plain identifiers.
    let tables = [
        ("storage.checkpoint_table", &config.storage.checkpoint_table),
        ("storage.writes_table", &config.storage.writes_table),
        ("storage.buffer_table", &config.storage.buffer_table),
    ];
    let mut seen_tables = HashSet::new();
    for (key, table) in tables {
        let Some(name) = table else { continue };
        if !is_sql_identifier(name) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "{key} `{name}` must start with a letter or underscore and contain only ASCII letters, digits and underscores"
                ),
            });
        } else if !seen_tables.insert(name.to_ascii_lowercase()) {
            errors.push(ConfigError::Validation {
                message: format!("{key} `{name}` is already used by another table"),
            });
        }
    }

    if let Some(url) = &config.debounce.processor_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("debounce.processor_url `{url}` must be an http:// or https:// URL"),
        });
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Whether `name` can be used unquoted as an SQLite table name.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
