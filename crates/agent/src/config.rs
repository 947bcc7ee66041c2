// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent process configuration: compiled-in defaults layered with an
//! on-disk properties file and `SWARMLOAD_`-prefixed environment overrides.
//!
//! Mirrors the rest of the workspace's `Config::load()` convention (see the
//! daemon crate's home-relative state-directory resolution) generalized
//! from a single state directory to a small typed struct plus a
//! `Properties` snapshot.

use std::path::PathBuf;

use swarmload_core::Properties;

use crate::error::ConfigError;

/// Default script file name when `grinder.script` is unset.
pub const DEFAULT_SCRIPT: &str = "grinder.py";

/// Resolved agent configuration: directories plus the effective
/// `Properties` snapshot merged from compiled-in defaults, an on-disk
/// properties file, and environment overrides.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Root directory everything else is resolved under (`~/.swarmload` by
    /// default, overridable with `SWARMLOAD_HOME`).
    pub home_dir: PathBuf,
    /// `<home>/file-store` — [`crate::file_store::FileStore`] creates its
    /// per-user subdirectory under here.
    pub file_store_root: PathBuf,
    /// `<home>/log` — worker log root from §4.7; the agent's own process
    /// log is a sibling directory, not the same file.
    pub log_root: PathBuf,
    /// If true, a failed or refused console connection falls through to
    /// `PREPARING_RUN` with only local properties instead of terminating.
    pub proceed_without_console: bool,
    /// Effective properties snapshot: compiled defaults, then file, then
    /// environment, each overwriting the previous layer's matching keys.
    pub properties: Properties,
}

/// Compiled-in defaults for every key in SPEC_FULL.md §6's table.
fn default_properties() -> Properties {
    let mut props = Properties::new();
    props.set("grinder.useConsole", "true");
    props.set("grinder.consoleHost", "localhost");
    props.set("grinder.consolePort", "6372");
    props.set("grinder.processes", "1");
    props.set("grinder.processIncrement", "0");
    props.set("grinder.processIncrementInterval", "60000");
    props.set("grinder.script", DEFAULT_SCRIPT);
    props.set("grinder.security", "false");
    props.set("grinder.debug.singleprocess", "false");
    props.set("agent.useSameConsole", "true");
    props.set("agent.servermode", "false");
    props.set("agent.useXmxLimit", "true");
    props
}

/// Parse a flat `.properties`-style `key=value` file (`#`-prefixed
/// comments and blank lines skipped), matching the `Properties` type's own
/// textual representation.
fn parse_properties_file(contents: &str) -> Properties {
    let mut props = Properties::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.set(key.trim(), value.trim());
        }
    }
    props
}

/// Overlay `SWARMLOAD_`-prefixed environment variables onto `props`. A var
/// named `SWARMLOAD_GRINDER_PROCESSES` maps to the property key
/// `grinder.processes` (underscores between segments become dots, the
/// whole key lowercased).
fn apply_env_overrides(props: &mut Properties, vars: impl Iterator<Item = (String, String)>) {
    for (name, value) in vars {
        let Some(rest) = name.strip_prefix("SWARMLOAD_") else { continue };
        let key = rest.to_ascii_lowercase().replace('_', ".");
        props.set(key, value);
    }
}

impl AgentConfig {
    /// Load configuration: compiled defaults, then `<home>/agent.properties`
    /// if present, then `SWARMLOAD_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let home_dir = home_dir()?;
        Self::load_from(home_dir)
    }

    /// `load()` with an explicit home directory, used by tests that don't
    /// want to touch the real `$HOME`.
    pub fn load_from(home_dir: PathBuf) -> Result<Self, ConfigError> {
        let properties_path = home_dir.join("agent.properties");
        let mut properties = default_properties();
        properties.set_base_file(&properties_path);

        if properties_path.exists() {
            let contents = std::fs::read_to_string(&properties_path)
                .map_err(|source| ConfigError::ReadFile { path: properties_path.clone(), source })?;
            properties.put_all(&parse_properties_file(&contents));
        }

        apply_env_overrides(&mut properties, std::env::vars());

        let proceed_without_console =
            properties.get_bool("agent.proceedWithoutConsole", false);

        Ok(Self {
            file_store_root: home_dir.join("file-store"),
            log_root: home_dir.join("log"),
            proceed_without_console,
            properties,
            home_dir,
        })
    }
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("SWARMLOAD_HOME") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir().map(|d| d.join(".swarmload")).ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
