//! The unmount orchestrator.
//!
//! Accepts either the device or the mount point, undoes what the matching
//! mount set up (LUKS mapping, created mount-point directory) and enforces
//! that a user only unmounts media they mounted themselves.

use std::path::{Path, PathBuf};

use crate::cmd::{self, ExecFlags};
use crate::config::PolicySnapshot;
use crate::debug;
use crate::exit_codes;
use crate::fstab::{self, TableEntry};
use crate::locking;
use crate::luks;
use crate::mount_point;
use crate::paths::Paths;
use crate::policy;
use crate::privilege::Privilege;

/// One parsed unmount request.
#[derive(Debug, Clone, Default)]
pub struct UmountRequest {
    /// Device path, mount-point path, or bare mount-point name.
    pub target: PathBuf,
    /// Lazy detach. The CLI only sets this together with its explicit
    /// confirmation flag; lazy detach on removable media risks data loss.
    pub lazy: bool,
    /// Close the LUKS mapping even without a tracking record.
    pub luks_force: bool,
}

/// Resolve the command-line target to a device path. A bare name is looked up
/// under the media root; a path that matches a live mount point resolves to
/// that entry's device; anything else is taken as a device path directly.
fn resolve_device(target: &Path, media_root: &Path, mtab: &[TableEntry]) -> PathBuf {
    let as_mntpt = if target.is_absolute() {
        target.to_path_buf()
    } else {
        media_root.join(target)
    };
    let as_mntpt = std::fs::canonicalize(&as_mntpt).unwrap_or(as_mntpt);
    if let Some(entry) = fstab::find_mount_point(mtab, &as_mntpt) {
        return PathBuf::from(&entry.device);
    }
    target.to_path_buf()
}

fn umount_flow(
    req: &UmountRequest,
    paths: &Paths,
    policy_snapshot: &PolicySnapshot,
    privilege: &Privilege,
) -> Result<(), (i32, String)> {
    policy::check_logged_in(policy_snapshot, privilege).map_err(denial)?;

    let mtab = fstab::read_table(&paths.mtab).unwrap_or_default();
    let device = resolve_device(&req.target, &paths.media_root, &mtab);

    // The node may be gone already (hardware unplugged before unmounting).
    policy::check_device(&device, true).map_err(denial)?;

    // A still-open mapping means the mounted device is the decrypted one.
    // The target may also have named the mapping itself, directly or through
    // its mount point, in which case `device` already is the mapper node.
    let mapped = paths.mapper_root.join(luks::mapping_name(&device));
    let mount_device = if mapped.exists() { mapped } else { device.clone() };
    let is_mapping = mount_device != device
        || mount_device.starts_with(&paths.mapper_root)
        || locking::luks_tracked(&paths.luks_lock_root, &mount_device);

    // Devices governed by the static mount table go back through the plain
    // umount helper under the caller's own identity.
    let fstab_entries = fstab::read_table(&paths.fstab).unwrap_or_default();
    if let Some(entry) = fstab::find_device(&fstab_entries, &device) {
        use std::os::unix::process::CommandExt;
        debug::trace(&format!(
            "{} is governed by the static mount table; delegating",
            device.display()
        ));
        privilege.drop_permanently();
        let err = std::process::Command::new("umount").arg(&entry.device).exec();
        return Err((
            exit_codes::HELPER_FAILED,
            format!("Failed to run umount: {err}"),
        ));
    }

    let entry = policy::mounted_by_user(&mtab, &mount_device, privilege).map_err(denial)?;
    let mntpt = PathBuf::from(&entry.mount_point);

    let target = mntpt.to_string_lossy().into_owned();
    let mut args: Vec<&str> = Vec::new();
    if req.lazy {
        args.push("-l");
    }
    args.push(target.as_str());
    debug::trace(&format!("umount {}", args.join(" ")));
    let out = cmd::run_with("umount", &args, ExecFlags::privileged(), privilege)
        .map_err(|e| (exit_codes::HELPER_FAILED, e.to_string()))?;
    if out.status != 0 {
        return Err((
            exit_codes::HELPER_FAILED,
            format!("umount {target} failed (exit {})", out.status),
        ));
    }

    if is_mapping {
        if let Err(e) = luks::release(&mount_device, req.luks_force, &paths.luks_lock_root, privilege)
        {
            return Err((exit_codes::UNLOCK_FAILED, e));
        }
    }

    {
        // The media root is root-owned on a real installation.
        let _scope = privilege.raise();
        if let Err(e) = mount_point::remove_if_created(&mntpt) {
            return Err((exit_codes::INVALID_MOUNT_POINT, e));
        }
    }
    Ok(())
}

fn denial(d: policy::Denial) -> (i32, String) {
    (d.exit_code(), d.to_string())
}

/// Entry point for the umount subcommand; returns the process exit status.
pub fn run_umount(
    req: &UmountRequest,
    paths: &Paths,
    policy_snapshot: &PolicySnapshot,
    privilege: &Privilege,
) -> i32 {
    match umount_flow(req, paths, policy_snapshot, privilege) {
        Ok(()) => exit_codes::SUCCESS,
        Err((code, message)) => {
            eprintln!("pmount: {message}");
            code
        }
    }
}
