//! LUKS decryption and release via the `cryptsetup` helper.
//!
//! The mapping name is derived deterministically from the device path, so a
//! later unmount can find it again without any state. pmount records the
//! mappings it opened itself under the LUKS tracking lock root; a mapping the
//! user opened manually is never closed by an unrelated unmount call.

use std::path::{Path, PathBuf};

use crate::cmd::{self, ExecFlags, SpawnError};
use crate::debug;
use crate::locking;
use crate::privilege::Privilege;

/// Outcome of a decryption request.
#[derive(Debug, PartialEq)]
pub enum DecryptStatus {
    /// Mapping opened; mount the contained path instead of the raw device.
    Decrypted(PathBuf),
    /// No LUKS metadata; the device passes through unchanged.
    NotEncrypted,
    /// Wrong passphrase, or the open failed.
    Failed,
    /// The deterministic mapping name already exists; refusing to collide
    /// with an unrelated open mapping.
    Exists(PathBuf),
}

/// The deterministic device-mapper name for a device path.
pub fn mapping_name(device: &Path) -> String {
    locking::lock_key(device)
}

/// Probe whether `device` carries LUKS metadata.
///
/// A missing `cryptsetup` binary means LUKS support is simply unavailable;
/// the device is then treated as not encrypted.
pub fn is_luks(device: &Path, privilege: &Privilege) -> Result<bool, SpawnError> {
    let flags = ExecFlags {
        as_root: true,
        null_stdout: true,
        null_stderr: true,
        ..ExecFlags::default()
    };
    let device_str = device.to_string_lossy().into_owned();
    match cmd::run_with(
        "cryptsetup",
        &["isLuks", device_str.as_str()],
        flags,
        privilege,
    ) {
        Ok(out) => Ok(out.status == 0),
        Err(SpawnError::Spawn(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Decrypt `device`, returning the mapped path on success.
///
/// On success a tracking lock keyed by the decrypted path is recorded under
/// `luks_lock_root` so the matching unmount knows pmount opened it.
pub fn decrypt(
    device: &Path,
    keyfile: Option<&Path>,
    readonly: bool,
    mapper_root: &Path,
    luks_lock_root: &Path,
    privilege: &Privilege,
) -> Result<DecryptStatus, SpawnError> {
    let name = mapping_name(device);
    let mapped = mapper_root.join(&name);
    // Collision check precedes any helper invocation.
    if mapped.exists() {
        return Ok(DecryptStatus::Exists(mapped));
    }
    if !is_luks(device, privilege)? {
        return Ok(DecryptStatus::NotEncrypted);
    }

    let device_str = device.to_string_lossy().into_owned();
    let keyfile_str = keyfile.map(|p| p.to_string_lossy().into_owned());
    let mut args: Vec<&str> = vec!["luksOpen", &device_str, &name];
    if readonly {
        args.push("--readonly");
    }
    if let Some(ref kf) = keyfile_str {
        args.push("--key-file");
        args.push(kf);
    }

    debug::trace(&format!("opening LUKS mapping {name}"));
    // cryptsetup drops privilege when real != effective, so both are raised.
    // stdin stays connected for the interactive passphrase prompt.
    let out = cmd::run_with("cryptsetup", &args, ExecFlags::privileged(), privilege)?;
    match out.status {
        0 => {
            if let Err(e) = locking::track_luks(luks_lock_root, &mapped) {
                eprintln!("pmount: warning: could not record LUKS tracking lock: {e}");
            }
            Ok(DecryptStatus::Decrypted(mapped))
        }
        1 | 2 => Ok(DecryptStatus::Failed),
        n => Err(SpawnError::Abnormal(format!(
            "cryptsetup exited with unexpected status {n}"
        ))),
    }
}

/// Close the mapping at `decrypted` if pmount opened it (or unconditionally
/// when `force`). Returns whether a close was performed.
pub fn release(
    decrypted: &Path,
    force: bool,
    luks_lock_root: &Path,
    privilege: &Privilege,
) -> Result<bool, String> {
    if !force && !locking::luks_tracked(luks_lock_root, decrypted) {
        return Ok(false);
    }
    let Some(name) = decrypted.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Err(format!("Invalid mapped device path: {}", decrypted.display()));
    };
    debug::trace(&format!("closing LUKS mapping {name}"));
    let out = cmd::run_with(
        "cryptsetup",
        &["luksClose", name.as_str()],
        ExecFlags::privileged(),
        privilege,
    )
    .map_err(|e| e.to_string())?;
    if out.status != 0 {
        return Err(format!("cryptsetup luksClose failed (exit {})", out.status));
    }
    locking::untrack_luks(luks_lock_root, decrypted);
    Ok(true)
}
