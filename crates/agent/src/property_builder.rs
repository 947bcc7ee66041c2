// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic composition of JVM-style runtime arguments, the worker log
//! directory, and a script-dir-rebased classpath.
//!
//! A pure function over `(properties, script_dir, security_flag, etc_hosts,
//! hostname, server_mode, use_xmx_limit, log_root)`, grounded on the
//! daemon crate's `ContainerConfig`-style "gather flat settings into one
//! argument string" pattern (`oj-core::container`), generalized here to the
//! worker invocation's own argument grammar instead of a container image's.

use std::path::{Path, PathBuf};

use swarmload_core::Properties;

/// JVM arguments plus the worker-side classpath, both derived from
/// `properties` without mutating the caller's copy of either string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltProperties {
    pub jvm_arguments: String,
    pub classpath: String,
}

/// Build worker invocation arguments from `properties`, rebasing any
/// relative classpath entries against `script_dir`.
///
/// Side effects on `properties` (matching the upstream `PropertyBuilder`):
/// - if `grinder.duration` is set and `grinder.runs` is not, sets
///   `grinder.runs = 0` (unbounded runs, bounded instead by duration).
/// - if `grinder.logDirectory` is not set, defaults it to
///   `<log_root>/<grinder.test.id or "default">`.
pub fn build(
    properties: &mut Properties,
    script_dir: &Path,
    security_flag: bool,
    etc_hosts: &str,
    hostname: &str,
    server_mode: bool,
    use_xmx_limit: bool,
    log_root: &Path,
) -> BuiltProperties {
    apply_defaults(properties, log_root);

    let mut args: Vec<String> = Vec::new();

    if security_flag {
        args.push("-Djava.security.manager".to_string());
        args.push("-Djava.security.policy==grinder.security.policy".to_string());
    }

    if use_xmx_limit {
        let xmx = properties.get_string("grinder.jvm.xmx", "512m");
        args.push(format!("-Xmx{xmx}"));
    }

    if server_mode {
        args.push("-server".to_string());
    }

    if !etc_hosts.is_empty() {
        args.push(format!("-Dngrinder.etc.hosts={etc_hosts}"));
    }

    args.push(format!("-Dgrinder.hostname={hostname}"));

    for key in ["grinder.test.id", "grinder.logDirectory"] {
        if let Some(value) = properties.get(key) {
            args.push(format!("-D{key}={value}"));
        }
    }

    if let Some(extra) = properties.get("grinder.jvm.arguments") {
        args.push(extra.to_string());
    }

    let classpath = rebase_classpath(
        &properties.get_string("grinder.jvm.classpath", ""),
        script_dir,
    );

    BuiltProperties { jvm_arguments: args.join(" "), classpath }
}

fn apply_defaults(properties: &mut Properties, log_root: &Path) {
    if properties.contains_key("grinder.duration") && !properties.contains_key("grinder.runs") {
        properties.set("grinder.runs", "0");
    }

    if !properties.contains_key("grinder.logDirectory") {
        let test_id = properties.get_string("grinder.test.id", "default");
        let default_dir: PathBuf = log_root.join(test_id);
        properties.set("grinder.logDirectory", default_dir.to_string_lossy().into_owned());
    }
}

/// Rebase every relative entry of a `:`-separated classpath string against
/// `script_dir`; absolute entries pass through unchanged. Pure string
/// transform, no filesystem access.
fn rebase_classpath(classpath: &str, script_dir: &Path) -> String {
    classpath
        .split(':')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let path = Path::new(entry);
            if path.is_absolute() {
                entry.to_string()
            } else {
                script_dir.join(path).to_string_lossy().into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(":")
}

/// Substrings identifying the agent's own self-instrumentation jars, which
/// must never leak into a worker's classpath (§4.3).
const SELF_INSTRUMENTATION_MARKERS: &[&str] = &["swarmload-agent-", "swarmload-instrumentation-"];

/// Project the agent's own classpath down to what a worker should inherit:
/// move `foremost` (if present as a substring match) and `patch` (ditto) to
/// the front, in that order, then drop any entry matching a
/// self-instrumentation marker. Pure function over strings — no filesystem
/// access, matching §9's "classpath filtering is a trivial port" note.
pub fn filter_agent_classpath(agent_classpath: &str, foremost: &str, patch: &str) -> String {
    let entries: Vec<&str> = agent_classpath.split(':').filter(|e| !e.is_empty()).collect();

    let mut foremost_matches = Vec::new();
    let mut patch_matches = Vec::new();
    let mut rest = Vec::new();

    for entry in entries {
        if !self_instrumentation(entry) {
            if !foremost.is_empty() && entry.contains(foremost) {
                foremost_matches.push(entry);
            } else if !patch.is_empty() && entry.contains(patch) {
                patch_matches.push(entry);
            } else {
                rest.push(entry);
            }
        }
    }

    foremost_matches.into_iter().chain(patch_matches).chain(rest).collect::<Vec<_>>().join(":")
}

fn self_instrumentation(entry: &str) -> bool {
    SELF_INSTRUMENTATION_MARKERS.iter().any(|marker| entry.contains(marker))
}

#[cfg(test)]
#[path = "property_builder_tests.rs"]
mod tests;
