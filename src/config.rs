//! Runtime policy snapshot.
//!
//! Resolved once at startup from `/etc/pmount.conf` (YAML) and the allow-list
//! file `/etc/pmount.allow` (one path/glob pattern per line); read-only for
//! the remainder of the run.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Private serde type for deserialization only.
#[derive(Deserialize)]
struct ConfigRaw {
    #[serde(default = "default_true")]
    allow_fsck: bool,
    #[serde(default)]
    allow_loop: bool,
    #[serde(default)]
    allow_not_physically_logged: bool,
    #[serde(default)]
    loop_devices: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Effective permission booleans and lists the policy engine consults.
#[derive(Debug, Clone)]
pub struct PolicySnapshot {
    /// Whether `--fsck` may be requested at all.
    pub allow_fsck: bool,
    /// Whether loopback mounts of regular files are permitted.
    pub allow_loop: bool,
    /// Whether a caller without a local login session may mount.
    pub allow_not_physically_logged: bool,
    /// Loop devices pmount may associate, in probe order.
    pub loop_devices: Vec<PathBuf>,
    /// Patterns naming devices mountable despite not being removable.
    allowlist: Vec<glob::Pattern>,
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self {
            allow_fsck: true,
            allow_loop: false,
            allow_not_physically_logged: false,
            loop_devices: Vec::new(),
            allowlist: Vec::new(),
        }
    }
}

impl PolicySnapshot {
    /// Whether `device` matches the non-removable-device allow-list.
    pub fn device_allowlisted(&self, device: &Path) -> bool {
        let device = device.to_string_lossy();
        self.allowlist.iter().any(|p| p.matches(&device))
    }
}

/// Parse the YAML configuration. A malformed file is a hard error: silently
/// falling back to defaults would change the security policy behind the
/// administrator's back.
pub fn parse_config(yaml: &str) -> Result<PolicySnapshot, String> {
    let raw: ConfigRaw =
        serde_yaml::from_str(yaml).map_err(|e| format!("Malformed configuration: {e}"))?;
    Ok(PolicySnapshot {
        allow_fsck: raw.allow_fsck,
        allow_loop: raw.allow_loop,
        allow_not_physically_logged: raw.allow_not_physically_logged,
        loop_devices: raw.loop_devices.into_iter().map(PathBuf::from).collect(),
        allowlist: Vec::new(),
    })
}

/// Parse allow-list text: one pattern per line, `#` comments and blank lines
/// ignored. Patterns that do not compile are skipped with a warning.
pub fn parse_allowlist(text: &str) -> Vec<glob::Pattern> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match glob::Pattern::new(line) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                eprintln!("pmount: ignoring bad allow-list pattern `{line}`: {e}");
                None
            }
        })
        .collect()
}

/// Load the snapshot from `config_path` and `allowlist_path`. Either file may
/// be absent, which yields the defaults / an empty allow-list.
pub fn load(config_path: &Path, allowlist_path: &Path) -> Result<PolicySnapshot, String> {
    let mut snapshot = match std::fs::read_to_string(config_path) {
        Ok(text) => parse_config(&text)
            .map_err(|e| format!("{}: {e}", config_path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => PolicySnapshot::default(),
        Err(e) => return Err(format!("Failed to read {}: {e}", config_path.display())),
    };
    match std::fs::read_to_string(allowlist_path) {
        Ok(text) => snapshot.allowlist = parse_allowlist(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(format!("Failed to read {}: {e}", allowlist_path.display())),
    }
    Ok(snapshot)
}
