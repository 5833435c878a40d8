//! Loopback association of regular files via the `losetup` helper.
//!
//! Ownership and read-write access are verified on an already-open file
//! descriptor, and the association is made through the `/proc/self/fd/N`
//! path of that same descriptor, so the file handed to the helper is provably
//! the one that was validated. The probe-then-associate window is still racy
//! against other losetup users; a lost race is a harmless helper failure and
//! is surfaced as an ordinary association error.

use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cmd::{self, ExecFlags, SpawnError};
use crate::config::PolicySnapshot;
use crate::debug;
use crate::privilege::Privilege;

/// Why a loopback association failed.
#[derive(Debug)]
pub enum LoopError {
    /// The real caller does not own the file, or cannot open it read-write.
    NotOwner(String),
    /// Every allow-listed loop device is busy (or association kept failing).
    NoDeviceFree,
    /// The losetup helper could not be run at all.
    Helper(String),
    /// A helper died abnormally; internal error.
    Internal(String),
}

impl std::fmt::Display for LoopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopError::NotOwner(msg) => write!(f, "{msg}"),
            LoopError::NoDeviceFree => write!(f, "Failed to set up loop device: no free allow-listed loop device"),
            LoopError::Helper(msg) => write!(f, "{msg}"),
            LoopError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<SpawnError> for LoopError {
    fn from(err: SpawnError) -> Self {
        match err {
            SpawnError::Spawn(msg) => LoopError::Helper(msg),
            other => LoopError::Internal(other.to_string()),
        }
    }
}

/// Whether `loopdev` currently has no file associated. `losetup <dev>` exits
/// zero and prints the configuration when associated, non-zero when not.
fn is_unconfigured(loopdev: &Path, privilege: &Privilege) -> Result<bool, SpawnError> {
    let flags = ExecFlags {
        as_root: true,
        capture_stdout: true,
        capture_stderr: true,
        ..ExecFlags::default()
    };
    let dev = loopdev.to_string_lossy().into_owned();
    let out = cmd::run_with("losetup", &[dev.as_str()], flags, privilege)?;
    Ok(out.status != 0)
}

/// Associate `file` with an unused allow-listed loop device, returning the
/// chosen device path.
pub fn associate(
    file: &Path,
    policy: &PolicySnapshot,
    privilege: &Privilege,
) -> Result<PathBuf, LoopError> {
    let handle = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(file)
        .map_err(|e| {
            LoopError::NotOwner(format!(
                "Cannot open {} for read-write: {e}",
                file.display()
            ))
        })?;

    // Ownership is checked on the open descriptor, not the path, closing the
    // window between check and use.
    let meta = handle
        .metadata()
        .map_err(|e| LoopError::NotOwner(format!("Cannot stat {}: {e}", file.display())))?;
    use std::os::unix::fs::MetadataExt;
    if !meta.is_file() {
        return Err(LoopError::NotOwner(format!(
            "{} is not a regular file",
            file.display()
        )));
    }
    if !privilege.caller_is_root() && meta.uid() != privilege.real_uid() {
        return Err(LoopError::NotOwner(format!(
            "You do not own {}",
            file.display()
        )));
    }

    let fd_path = format!("/proc/self/fd/{}", handle.as_raw_fd());
    for candidate in &policy.loop_devices {
        let free = is_unconfigured(candidate, privilege)?;
        if !free {
            continue;
        }
        debug::trace(&format!("associating {} with {}", file.display(), candidate.display()));
        let candidate_str = candidate.to_string_lossy().into_owned();
        let out = cmd::run_with(
            "losetup",
            &[candidate_str.as_str(), fd_path.as_str()],
            ExecFlags {
                as_root: true,
                capture_stdout: true,
                capture_stderr: true,
                ..ExecFlags::default()
            },
            privilege,
        )?;
        if out.status == 0 {
            return Ok(candidate.clone());
        }
        // Lost the probe/associate race; try the next candidate.
    }
    Err(LoopError::NoDeviceFree)
}

/// Attempts before giving up on `losetup -d`; the device may transiently
/// report busy right after an unmount.
const DISSOCIATE_ATTEMPTS: u32 = 3;
const DISSOCIATE_BACKOFF: Duration = Duration::from_millis(300);

/// Dissociate `loopdev` from its backing file.
pub fn dissociate(loopdev: &Path, privilege: &Privilege) -> Result<(), String> {
    let dev = loopdev.to_string_lossy().into_owned();
    let mut last_status = 0;
    for attempt in 0..DISSOCIATE_ATTEMPTS {
        if attempt > 0 {
            std::thread::sleep(DISSOCIATE_BACKOFF);
        }
        let out = cmd::run_with(
            "losetup",
            &["-d", &dev],
            ExecFlags {
                as_root: true,
                capture_stdout: true,
                capture_stderr: true,
                ..ExecFlags::default()
            },
            privilege,
        )
        .map_err(|e| e.to_string())?;
        if out.status == 0 {
            return Ok(());
        }
        last_status = out.status;
    }
    Err(format!(
        "losetup -d {dev} still failing after {DISSOCIATE_ATTEMPTS} attempts (exit {last_status})"
    ))
}
