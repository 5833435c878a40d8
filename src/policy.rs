//! The central decision logic: every check is a pure predicate over the
//! current filesystem and device state, returning a denial with a specific
//! reason and exit code rather than raising across module boundaries.

use std::path::Path;

use crate::cmd;
use crate::config::PolicySnapshot;
use crate::exit_codes;
use crate::fstab::{self, TableEntry};
use crate::locking;
use crate::mount_point;
use crate::privilege::Privilege;
use crate::removable;

/// A denied request, carrying the reason shown to the user and the exit
/// status it translates to.
#[derive(Debug)]
pub enum Denial {
    /// The device path does not exist or is not a block device.
    InvalidDevice(String),
    /// The mount-point target is unusable.
    InvalidMountPoint(String),
    /// A policy predicate said no.
    Refused(String),
    /// The device is mounted, but by a different user. Distinct from plain
    /// "not mounted" so scripts can tell the two apart.
    NotMountedByYou(String),
    /// A live lock exists for the device, or the mount-point lock is held.
    Locked(String),
    /// The system configuration disallows the requested feature.
    Config(String),
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::InvalidDevice(msg)
            | Denial::InvalidMountPoint(msg)
            | Denial::Refused(msg)
            | Denial::NotMountedByYou(msg)
            | Denial::Locked(msg)
            | Denial::Config(msg) => write!(f, "{msg}"),
        }
    }
}

impl Denial {
    pub fn exit_code(&self) -> i32 {
        match self {
            Denial::InvalidDevice(_) => exit_codes::INVALID_DEVICE,
            Denial::InvalidMountPoint(_) => exit_codes::INVALID_MOUNT_POINT,
            Denial::Refused(_) | Denial::NotMountedByYou(_) => exit_codes::POLICY_DENIED,
            Denial::Locked(_) => exit_codes::ALREADY_LOCKED,
            Denial::Config(_) => exit_codes::CONFIG_DENIED,
        }
    }
}

/// Check that `device` exists and is a block device.
///
/// `tolerate_missing` skips the existence requirement for the cases where the
/// node legitimately no longer exists, e.g. unmounting after the hardware was
/// already unplugged.
pub fn check_device(device: &Path, tolerate_missing: bool) -> Result<(), Denial> {
    use std::os::unix::fs::FileTypeExt;
    match std::fs::metadata(device) {
        Ok(meta) if meta.file_type().is_block_device() => Ok(()),
        Ok(_) => Err(Denial::InvalidDevice(format!(
            "{} is not a block device",
            device.display()
        ))),
        Err(_) if tolerate_missing => Ok(()),
        Err(_) => Err(Denial::InvalidDevice(format!(
            "Device {} does not exist",
            device.display()
        ))),
    }
}

/// Deny when the live mount table already lists `device`.
pub fn check_not_mounted(mtab: &[TableEntry], device: &Path) -> Result<(), Denial> {
    match fstab::find_device(mtab, device) {
        Some(entry) => Err(Denial::Refused(format!(
            "{} is already mounted on {}",
            device.display(),
            entry.mount_point
        ))),
        None => Ok(()),
    }
}

/// For unmount: the device must be mounted, and by the requesting real user
/// (or the caller is the super-user).
pub fn mounted_by_user<'a>(
    mtab: &'a [TableEntry],
    device: &Path,
    privilege: &Privilege,
) -> Result<&'a TableEntry, Denial> {
    let Some(entry) = fstab::find_device(mtab, device) else {
        return Err(Denial::Refused(format!(
            "{} is not mounted",
            device.display()
        )));
    };
    if let Some(owner) = entry.owner_uid()
        && owner != privilege.real_uid()
        && !privilege.caller_is_root()
    {
        return Err(Denial::NotMountedByYou(format!(
            "{} was not mounted by you",
            device.display()
        )));
    }
    Ok(entry)
}

/// Whether the device may be mounted at all: removable, allow-listed, or a
/// loopback mount (the backing file's ownership check already constrains
/// those).
pub fn check_mountable(
    device: &Path,
    sysfs: &Path,
    policy: &PolicySnapshot,
    loop_mount: bool,
) -> Result<(), Denial> {
    if loop_mount || policy.device_allowlisted(device) || removable::is_removable(sysfs, device) {
        Ok(())
    } else {
        Err(Denial::Refused(format!(
            "{} is not removable and not allow-listed",
            device.display()
        )))
    }
}

/// Deny while a live lock directory exists for the device.
pub fn check_not_locked(lock_root: &Path, device: &Path) -> Result<(), Denial> {
    if locking::is_locked(lock_root, device) {
        Err(Denial::Locked(format!(
            "{} is locked by another process",
            device.display()
        )))
    } else {
        Ok(())
    }
}

/// Validate the mount-point directory after creation: it must be empty aside
/// from the stamp file, must not belong to the static mount table, and must
/// not already be mounted on.
pub fn check_mount_point(
    mntpt: &Path,
    fstab_entries: &[TableEntry],
    mtab_entries: &[TableEntry],
) -> Result<(), Denial> {
    if !mntpt.is_dir() {
        return Err(Denial::InvalidMountPoint(format!(
            "{} is not a directory",
            mntpt.display()
        )));
    }
    match mount_point::is_empty_besides_stamp(mntpt) {
        Ok(true) => {}
        Ok(false) => {
            return Err(Denial::InvalidMountPoint(format!(
                "{} is not empty",
                mntpt.display()
            )));
        }
        Err(e) => return Err(Denial::InvalidMountPoint(e)),
    }
    if fstab::find_mount_point(fstab_entries, mntpt).is_some() {
        return Err(Denial::InvalidMountPoint(format!(
            "{} is reserved by the static mount table",
            mntpt.display()
        )));
    }
    if fstab::find_mount_point(mtab_entries, mntpt).is_some() {
        return Err(Denial::Refused(format!(
            "Something is already mounted on {}",
            mntpt.display()
        )));
    }
    Ok(())
}

/// The login name for a uid, from the password database.
pub fn username_for_uid(uid: u32) -> Option<String> {
    // Single-threaded process; the static passwd buffer is not contended.
    let pw = unsafe { libc::getpwuid(uid) };
    if pw.is_null() {
        return None;
    }
    let name = unsafe { std::ffi::CStr::from_ptr((*pw).pw_name) };
    Some(name.to_string_lossy().into_owned())
}

/// The physically-logged-in gate: unless policy allows remote or unattended
/// use, the real user must hold an active local terminal session. Checked
/// once per invocation via the session listing helper.
pub fn check_logged_in(policy: &PolicySnapshot, privilege: &Privilege) -> Result<(), Denial> {
    if policy.allow_not_physically_logged || privilege.caller_is_root() {
        return Ok(());
    }
    let Some(user) = username_for_uid(privilege.real_uid()) else {
        return Err(Denial::Refused(format!(
            "No password-database entry for uid {}",
            privilege.real_uid()
        )));
    };
    let out = cmd::run_capture("who", &[] as &[&str])
        .map_err(|e| Denial::Refused(format!("Cannot determine login sessions: {e}")))?;
    let logged_in = out
        .stdout
        .lines()
        .any(|line| line.split_whitespace().next() == Some(user.as_str()));
    if logged_in {
        Ok(())
    } else {
        Err(Denial::Refused(format!(
            "{user} is not logged in on a local terminal"
        )))
    }
}
