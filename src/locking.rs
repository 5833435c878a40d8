//! Device locks and LUKS-open tracking.
//!
//! A lock is a directory keyed by a filesystem-safe encoding of the device
//! path, containing zero or more pid-named files. The directory with at least
//! one live-pid file means "locked for further pmounting". A directory with
//! no remaining live-pid files is not an active lock and is eligible for
//! cleanup by any future operation on that device.
//!
//! The same mechanism, under a separate root, records that pmount itself
//! opened a LUKS mapping (keyed by the decrypted device path), so that a
//! later unmount knows closing it is safe.

use std::path::{Path, PathBuf};

/// Failure modes of the lock subcommands, mapped to distinct exit codes by
/// the caller.
#[derive(Debug)]
pub enum LockError {
    /// The pid does not name a live process.
    InvalidPid(u32),
    Io(String),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::InvalidPid(pid) => write!(f, "Process {pid} does not exist"),
            LockError::Io(msg) => write!(f, "{msg}"),
        }
    }
}

/// Encode a device path as a single path component: `/` becomes `_`.
pub fn lock_key(device: &Path) -> String {
    device
        .to_string_lossy()
        .chars()
        .map(|c| if c == '/' { '_' } else { c })
        .collect()
}

/// The lock directory for `device` under `root`.
pub fn lock_dir(root: &Path, device: &Path) -> PathBuf {
    root.join(lock_key(device))
}

/// Whether `pid` names a live process. `kill(pid, 0)` probes existence
/// without delivering a signal; EPERM still means the process exists.
pub fn pid_alive(pid: u32) -> bool {
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if rc == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Add a pid-tagged lock entry for `device`.
///
/// The pid must name a live process; accepting forged pids would allow
/// indefinite locks that no stale-lock sweep could ever clear.
pub fn add_lock(root: &Path, device: &Path, pid: u32) -> Result<(), LockError> {
    if !pid_alive(pid) {
        return Err(LockError::InvalidPid(pid));
    }
    let dir = lock_dir(root, device);
    std::fs::create_dir_all(&dir)
        .map_err(|e| LockError::Io(format!("Failed to create {}: {e}", dir.display())))?;
    let file = dir.join(pid.to_string());
    std::fs::write(&file, b"")
        .map_err(|e| LockError::Io(format!("Failed to create {}: {e}", file.display())))?;
    Ok(())
}

/// Remove the pid-tagged lock entry for `device`. Idempotent: removing an
/// entry that was never created (or a device with no lock directory at all)
/// succeeds.
pub fn remove_lock(root: &Path, device: &Path, pid: u32) -> Result<(), String> {
    let dir = lock_dir(root, device);
    let file = dir.join(pid.to_string());
    match std::fs::remove_file(&file) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(format!("Failed to remove {}: {e}", file.display())),
    }
    // Drop the directory once the last entry is gone; a failure here is
    // harmless (another pmount may have raced a new entry in).
    let _ = std::fs::remove_dir(&dir);
    Ok(())
}

/// Whether `device` currently holds at least one live-pid lock entry.
pub fn is_locked(root: &Path, device: &Path) -> bool {
    let dir = lock_dir(root, device);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse::<u32>().ok()))
        .any(pid_alive)
}

/// Maintenance sweep: remove lock entries whose pid no longer exists, and the
/// lock directory itself once empty. Run opportunistically before every mount
/// attempt.
pub fn clean_stale(root: &Path, device: &Path) {
    let dir = lock_dir(root, device);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let stale = match entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) {
            Some(pid) => !pid_alive(pid),
            // A non-pid name in a lock directory is corrupt state; clear it.
            None => true,
        };
        if stale {
            let _ = std::fs::remove_file(entry.path());
        }
    }
    let _ = std::fs::remove_dir(&dir);
}

/// Record that pmount opened the mapping at `decrypted` (LUKS tracking).
pub fn track_luks(luks_root: &Path, decrypted: &Path) -> Result<(), String> {
    let dir = lock_dir(luks_root, decrypted);
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;
    let file = dir.join(std::process::id().to_string());
    std::fs::write(&file, b"").map_err(|e| format!("Failed to create {}: {e}", file.display()))
}

/// Whether pmount recorded opening the mapping at `decrypted`.
pub fn luks_tracked(luks_root: &Path, decrypted: &Path) -> bool {
    lock_dir(luks_root, decrypted).is_dir()
}

/// Forget the LUKS tracking record for `decrypted`, if any.
pub fn untrack_luks(luks_root: &Path, decrypted: &Path) {
    let dir = lock_dir(luks_root, decrypted);
    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.filter_map(|e| e.ok()) {
            let _ = std::fs::remove_file(entry.path());
        }
    }
    let _ = std::fs::remove_dir(&dir);
}
