//! Mount-point naming, creation and removal.
//!
//! pmount only ever removes a directory it created itself; the hidden stamp
//! file written at creation time is the sole basis for that decision. The
//! advisory flock serializes two concurrent pmount invocations racing for the
//! same target directory; it is held only across the fsck + mount window and
//! fails fast instead of queuing, so a wrapper generating mount-point names
//! can regenerate a suffixed name on the locked condition.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;

use crate::locking;
use crate::paths::{CREATED_STAMP, DEVICE_ROOT};

/// Longest accepted label, in bytes.
pub const MAX_LABEL_LEN: usize = 255;

/// Validate a user-supplied mount-point label and return the cleaned name.
///
/// A redundant media-root prefix (`/media/foo` for label `foo`) is stripped;
/// the remainder must be non-empty, contain no path separator, and fit the
/// length bound. Checked before any filesystem mutation.
pub fn validate_label(label: &str, media_root: &Path) -> Result<String, String> {
    let mut cleaned = label;
    let root_prefix = format!("{}/", media_root.to_string_lossy());
    if let Some(stripped) = cleaned.strip_prefix(&root_prefix) {
        cleaned = stripped;
    }
    if cleaned.is_empty() {
        return Err("Empty mount point label".to_string());
    }
    if cleaned.contains('/') {
        return Err(format!("Label must not contain '/': {cleaned}"));
    }
    if cleaned.len() > MAX_LABEL_LEN {
        return Err(format!(
            "Label too long (maximum {MAX_LABEL_LEN} characters)"
        ));
    }
    Ok(cleaned.to_string())
}

/// Derive a mount-point name from a device path: the `/dev/` prefix is
/// stripped and remaining separators are flattened to underscores.
pub fn derive_name(device: &Path) -> String {
    let device = device.to_string_lossy();
    let trimmed = device.strip_prefix(DEVICE_ROOT).unwrap_or(&device);
    trimmed
        .trim_start_matches('/')
        .chars()
        .map(|c| if c == '/' { '_' } else { c })
        .collect()
}

/// Create `mntpt` (with the stamp file) if it does not exist. Returns whether
/// this call created the directory.
pub fn prepare(mntpt: &Path) -> Result<bool, String> {
    if mntpt.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(mntpt)
        .map_err(|e| format!("Failed to create {}: {e}", mntpt.display()))?;
    std::fs::write(mntpt.join(CREATED_STAMP), b"")
        .map_err(|e| format!("Failed to stamp {}: {e}", mntpt.display()))?;
    Ok(true)
}

/// Whether `mntpt` is empty aside from pmount's own stamp file.
pub fn is_empty_besides_stamp(mntpt: &Path) -> Result<bool, String> {
    let entries = std::fs::read_dir(mntpt)
        .map_err(|e| format!("Failed to read {}: {e}", mntpt.display()))?;
    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read {}: {e}", mntpt.display()))?;
        if entry.file_name() != CREATED_STAMP {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether pmount created `mntpt` (stamp file present).
pub fn created_by_us(mntpt: &Path) -> bool {
    mntpt.join(CREATED_STAMP).is_file()
}

/// Remove `mntpt` if and only if pmount created it. Never removes a
/// directory without the stamp, even when empty.
pub fn remove_if_created(mntpt: &Path) -> Result<(), String> {
    if !created_by_us(mntpt) {
        return Ok(());
    }
    std::fs::remove_file(mntpt.join(CREATED_STAMP))
        .map_err(|e| format!("Failed to remove stamp in {}: {e}", mntpt.display()))?;
    std::fs::remove_dir(mntpt)
        .map_err(|e| format!("Failed to remove {}: {e}", mntpt.display()))
}

/// Held advisory lock on a mount-point target; released on drop.
pub struct MntptLock {
    // Held for the flock; the lock dies with the descriptor.
    _file: File,
}

/// Outcome of a non-blocking lock attempt.
pub enum LockAttempt {
    Acquired(MntptLock),
    /// Another pmount invocation holds the target.
    Busy,
}

/// Try to take the advisory lock for the mount point named `name`.
pub fn try_lock(lock_root: &Path, name: &str) -> Result<LockAttempt, String> {
    std::fs::create_dir_all(lock_root)
        .map_err(|e| format!("Failed to create {}: {e}", lock_root.display()))?;
    let path = lock_root.join(locking::lock_key(Path::new(name)));
    let file = File::create(&path)
        .map_err(|e| format!("Failed to create {}: {e}", path.display()))?;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(LockAttempt::Acquired(MntptLock { _file: file }));
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(LockAttempt::Busy)
    } else {
        Err(format!("Failed to lock {}: {err}", path.display()))
    }
}
