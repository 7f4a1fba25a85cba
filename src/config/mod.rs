// restoretool/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

// Structs for deserializing config.json
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRestoreOptions {
    pub new_database_name: Option<String>,
    pub new_storage_folder: Option<String>,
    #[serde(default)]
    pub with_replace: bool,
    #[serde(default = "default_switch_to_single_user_mode")]
    pub switch_to_single_user_mode: bool,
    pub command_timeout_secs: Option<u64>,
}

fn default_switch_to_single_user_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJsonConfig {
    pub connection_string: Option<String>,
    pub backup_file_path: Option<String>,
    pub restore_options: Option<JsonRestoreOptions>,
}

/// Caller-facing restore options. Absent overrides mean "keep the name
/// embedded in the backup" and "relocate each file to the engine's own
/// default directory for its type".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSettings {
    pub new_database_name: Option<String>,
    pub new_storage_folder: Option<String>,
    pub with_replace: bool,
    pub switch_to_single_user_mode: bool,
    /// Per-command deadline for the destructive steps (mode switches and the
    /// restore itself). Expiry aborts the command but still runs the
    /// multi-user recovery. `None` waits on the engine indefinitely.
    pub command_timeout: Option<Duration>,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        RestoreSettings {
            new_database_name: None,
            new_storage_folder: None,
            with_replace: false,
            switch_to_single_user_mode: true,
            command_timeout: None,
        }
    }
}

/// One fully-validated restore invocation.
#[derive(Debug, Clone)]
pub struct RestoreJobConfig {
    pub connection_string: String,
    pub backup_file_path: String,
    pub settings: RestoreSettings,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub raw_json_config: RawJsonConfig,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;
        Ok(AppConfig { raw_json_config })
    }
}

pub fn connection_string_from_json(raw_config: &RawJsonConfig) -> Result<String> {
    let connection_string = raw_config
        .connection_string
        .as_ref()
        .context("connection_string must be set in config.json")?
        .clone();
    if connection_string.trim().is_empty() {
        return Err(anyhow::anyhow!("connection_string cannot be empty in config.json."));
    }
    Ok(connection_string)
}

pub fn backup_path_from_json(raw_config: &RawJsonConfig) -> Result<String> {
    let backup_file_path = raw_config
        .backup_file_path
        .as_ref()
        .context("backup_file_path must be set in config.json")?
        .clone();
    if backup_file_path.trim().is_empty() {
        return Err(anyhow::anyhow!("backup_file_path cannot be empty in config.json."));
    }
    Ok(backup_file_path)
}

pub fn load_restore_job_from_json(raw_config: &RawJsonConfig) -> Result<RestoreJobConfig> {
    Ok(RestoreJobConfig {
        connection_string: connection_string_from_json(raw_config)?,
        backup_file_path: backup_path_from_json(raw_config)?,
        settings: settings_from_options(raw_config.restore_options.as_ref()),
    })
}

/// Maps the optional JSON block onto settings with their documented defaults.
/// Empty-string overrides are treated the same as absent ones.
fn settings_from_options(options: Option<&JsonRestoreOptions>) -> RestoreSettings {
    match options {
        None => RestoreSettings::default(),
        Some(opts) => RestoreSettings {
            new_database_name: opts
                .new_database_name
                .clone()
                .filter(|s| !s.trim().is_empty()),
            new_storage_folder: opts
                .new_storage_folder
                .clone()
                .filter(|s| !s.trim().is_empty()),
            with_replace: opts.with_replace,
            switch_to_single_user_mode: opts.switch_to_single_user_mode,
            command_timeout: opts
                .command_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        },
    }
}
