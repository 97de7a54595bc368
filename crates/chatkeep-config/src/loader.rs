// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatkeep.toml` > `~/.config/chatkeep/chatkeep.toml` >
//! `/etc/chatkeep/chatkeep.toml`, with environment variable overrides via `CHATKEEP_`.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatkeepConfig;

/// Top-level sections, used to split `CHATKEEP_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &["log", "storage", "debounce", "execution", "gateway"];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/chatkeep/chatkeep.toml";
pub(crate) const LOCAL_CONFIG: &str = "chatkeep.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatkeep").join("chatkeep.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatkeep/chatkeep.toml`
/// 3. `~/.config/chatkeep/chatkeep.toml`
/// 4. `./chatkeep.toml`
/// 5. `CHATKEEP_*` environment variables
pub fn load_config() -> Result<ChatkeepConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ChatkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatkeepConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, still honoring env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatkeepConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChatkeepConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Map `CHATKEEP_STORAGE_CHECKPOINT_TABLE` to `storage.checkpoint_table`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores themselves stay intact.
fn env_provider() -> Env {
    Env::prefixed("CHATKEEP_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or(key)
            .into()
    })
}
