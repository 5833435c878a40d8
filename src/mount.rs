//! The mount orchestrator.
//!
//! Drives a single mount request through device preparation, policy checks
//! and the auto-detection sweep. Every stage that leaves system state behind
//! (LUKS mapping, loop association, created mount-point directory) registers
//! itself for unwind; failure at any later stage rolls all of it back in
//! reverse order before the process exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cmd::{self, ExecFlags, SpawnError};
use crate::config::PolicySnapshot;
use crate::debug;
use crate::exit_codes;
use crate::fstab::{self, TableEntry};
use crate::fstype::{self, FsDescriptor};
use crate::locking;
use crate::loopdev::{self, LoopError};
use crate::luks::{self, DecryptStatus};
use crate::mount_point::{self, LockAttempt};
use crate::options::{self, MountOptions};
use crate::paths::Paths;
use crate::policy;
use crate::privilege::Privilege;

/// Conventional exit status for a request abandoned on SIGINT.
const INTERRUPTED: i32 = 130;

/// One parsed mount request.
#[derive(Debug, Clone, Default)]
pub struct MountRequest {
    /// Block device, or regular file for a loopback mount.
    pub device: PathBuf,
    /// Explicit mount-point label; derived from the device path when absent.
    pub label: Option<String>,
    /// Explicit filesystem type; auto-detected when absent.
    pub fstype: Option<String>,
    pub options: MountOptions,
    /// Key file handed to the decryption helper instead of prompting.
    pub passphrase_file: Option<PathBuf>,
    /// Run fsck before mounting.
    pub fsck: bool,
}

#[derive(Debug)]
struct Failure {
    code: i32,
    message: String,
}

impl Failure {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<policy::Denial> for Failure {
    fn from(denial: policy::Denial) -> Self {
        Failure::new(denial.exit_code(), denial.to_string())
    }
}

impl From<SpawnError> for Failure {
    fn from(err: SpawnError) -> Self {
        let code = if err.is_internal() {
            exit_codes::INTERNAL_ERROR
        } else {
            exit_codes::HELPER_FAILED
        };
        Failure::new(code, err.to_string())
    }
}

/// State to roll back when a later stage fails, in the mandatory unwind
/// order: release LUKS mapping, dissociate loop device, remove the created
/// mount-point directory.
#[derive(Default)]
struct Staged {
    decrypted: Option<PathBuf>,
    loop_device: Option<PathBuf>,
    created_mntpt: Option<PathBuf>,
}

impl Staged {
    fn unwind(&mut self, paths: &Paths, privilege: &Privilege) {
        if let Some(decrypted) = self.decrypted.take() {
            if let Err(e) = luks::release(&decrypted, true, &paths.luks_lock_root, privilege) {
                eprintln!("pmount: could not close LUKS mapping during rollback: {e}");
            }
        }
        if let Some(loop_device) = self.loop_device.take() {
            if let Err(e) = loopdev::dissociate(&loop_device, privilege) {
                eprintln!("pmount: could not free loop device during rollback: {e}");
            }
        }
        if let Some(mntpt) = self.created_mntpt.take() {
            if let Err(e) = mount_point::remove_if_created(&mntpt) {
                eprintln!("pmount: could not remove created mount point during rollback: {e}");
            }
        }
    }
}

/// Sniff the filesystem type with the content-probing helper, if available.
/// Any helper problem degrades to "unknown"; the static sweep still runs.
fn sniff_type(device: &Path, privilege: &Privilege) -> Option<String> {
    let flags = ExecFlags {
        as_root: true,
        capture_stdout: true,
        capture_stderr: true,
        ..ExecFlags::default()
    };
    let dev = device.to_string_lossy().into_owned();
    let args = ["-o", "value", "-s", "TYPE", dev.as_str()];
    match cmd::run_with("blkid", &args, flags, privilege) {
        Ok(out) if out.status == 0 => {
            let fstype = out.stdout.trim().to_string();
            (!fstype.is_empty()).then_some(fstype)
        }
        _ => None,
    }
}

/// The descriptor list to attempt, in order.
///
/// An explicit type is the only candidate. Otherwise the sniffed type (or its
/// upgrade driver) goes first, followed by the static table in declaration
/// order minus the skip-autodetect entries.
fn candidates(
    explicit: Option<&str>,
    sniffed: Option<&str>,
) -> Result<Vec<&'static FsDescriptor>, Failure> {
    if let Some(name) = explicit {
        let fs = fstype::find(name).ok_or_else(|| {
            Failure::new(
                exit_codes::USAGE_ERROR,
                format!("Unknown filesystem type: {name}"),
            )
        })?;
        return Ok(vec![fs]);
    }
    let mut list: Vec<&'static FsDescriptor> = Vec::new();
    if let Some(name) = sniffed {
        if let Some(fs) = fstype::upgrade_for(name).or_else(|| fstype::find(name)) {
            list.push(fs);
        }
    }
    for fs in fstype::TABLE {
        if !fs.skip_autodetect && !list.iter().any(|c| c.name == fs.name) {
            list.push(fs);
        }
    }
    Ok(list)
}

fn interrupted_check(flag: &AtomicBool) -> Result<(), Failure> {
    if flag.load(Ordering::Relaxed) {
        Err(Failure::new(INTERRUPTED, "Interrupted"))
    } else {
        Ok(())
    }
}

/// The static-table entry governing `target`, which may name the device or
/// the mount point; the mount invocation accepts either.
fn governing_entry<'a>(entries: &'a [TableEntry], target: &Path) -> Option<&'a TableEntry> {
    fstab::find_device(entries, target).or_else(|| {
        let resolved = std::fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
        fstab::find_mount_point(entries, &resolved)
    })
}

/// Hand the whole request over to the system mount helper when the static
/// mount table governs this device: root is given up permanently and mount
/// enforces the table's own `user` policy. Only returns on exec failure.
fn exec_fstab_mount(table_device: &str, privilege: &Privilege) -> Failure {
    use std::os::unix::process::CommandExt;
    privilege.drop_permanently();
    let err = std::process::Command::new("mount").arg(table_device).exec();
    Failure::new(
        exit_codes::HELPER_FAILED,
        format!("Failed to run mount: {err}"),
    )
}

/// Run fsck on the device about to be mounted. Status 1 means errors were
/// corrected and is fine; anything above that aborts the mount.
fn run_fsck(device: &Path, privilege: &Privilege) -> Result<(), Failure> {
    let dev = device.to_string_lossy().into_owned();
    let out = cmd::run_with(
        "fsck",
        &["-C", dev.as_str()],
        ExecFlags::privileged(),
        privilege,
    )?;
    if out.status <= 1 {
        Ok(())
    } else {
        Err(Failure::new(
            exit_codes::HELPER_FAILED,
            format!("fsck failed on {dev} (exit {})", out.status),
        ))
    }
}

/// One invocation of the mount helper.
fn mount_once(
    device: &Path,
    mntpt: &Path,
    fstype: &str,
    option_string: &str,
    suppress_stderr: bool,
    privilege: &Privilege,
) -> Result<i32, Failure> {
    let flags = ExecFlags {
        null_stderr: suppress_stderr,
        ..ExecFlags::privileged()
    };
    let dev = device.to_string_lossy().into_owned();
    let target = mntpt.to_string_lossy().into_owned();
    debug::trace(&format!("mount -t {fstype} -o {option_string} {dev} {target}"));
    let args = [
        "-t",
        fstype,
        "-o",
        option_string,
        dev.as_str(),
        target.as_str(),
    ];
    let out = cmd::run_with("mount", &args, flags, privilege)?;
    Ok(out.status)
}

/// The auto-detection sweep over `list`. Stderr is suppressed for every
/// attempt but the very last one across the whole sweep, so exactly one, most
/// informative failure reaches the user; a candidate whose option string
/// carried a charset is retried once without it before moving on.
fn sweep(
    list: &[&'static FsDescriptor],
    device: &Path,
    mntpt: &Path,
    req: &MountRequest,
    privilege: &Privilege,
    interrupted: &AtomicBool,
) -> Result<&'static FsDescriptor, Failure> {
    let uid = privilege.real_uid();
    let gid = privilege.mount_gid();
    let utf8 = options::locale_is_utf8();
    let mut last_status = 0;
    for (index, fs) in list.iter().enumerate() {
        interrupted_check(interrupted)?;
        let last = index == list.len() - 1;
        let with_charset = options::assemble(fs, &req.options, uid, gid, utf8)
            .map_err(|e| Failure::new(exit_codes::USAGE_ERROR, e))?;
        let without_charset = {
            let mut plain = req.options.clone();
            plain.charset = None;
            options::assemble(fs, &plain, uid, gid, false)
                .map_err(|e| Failure::new(exit_codes::USAGE_ERROR, e))?
        };
        let will_retry = without_charset != with_charset;

        let status = mount_once(
            device,
            mntpt,
            fs.name,
            &with_charset,
            !last || will_retry,
            privilege,
        )?;
        if status == 0 {
            return Ok(fs);
        }
        last_status = status;

        if will_retry {
            let status =
                mount_once(device, mntpt, fs.name, &without_charset, !last, privilege)?;
            if status == 0 {
                return Ok(fs);
            }
            last_status = status;
        }
    }
    Err(Failure::new(
        exit_codes::HELPER_FAILED,
        format!(
            "Could not mount {} (last mount attempt exited with {last_status})",
            device.display()
        ),
    ))
}

fn mount_flow(
    req: &MountRequest,
    paths: &Paths,
    policy_snapshot: &PolicySnapshot,
    privilege: &Privilege,
    interrupted: &AtomicBool,
    staged: &mut Staged,
) -> Result<(), Failure> {
    interrupted_check(interrupted)?;

    // Bad option values are pure input errors; reject them before anything
    // touches a device or spawns a helper.
    options::validate(&req.options).map_err(|e| Failure::new(exit_codes::USAGE_ERROR, e))?;

    policy::check_logged_in(policy_snapshot, privilege)?;

    // fsck gating comes before any device probing.
    if req.fsck && !policy_snapshot.allow_fsck {
        return Err(Failure::new(
            exit_codes::CONFIG_DENIED,
            "Running fsck is disallowed by the system configuration",
        ));
    }

    let label = match &req.label {
        Some(label) => Some(
            mount_point::validate_label(label, &paths.media_root)
                .map_err(|e| Failure::new(exit_codes::INVALID_MOUNT_POINT, e))?,
        ),
        None => None,
    };

    // A regular file is mounted through a loop device.
    let loop_mount = req.device.is_file();
    if loop_mount && !policy_snapshot.allow_loop {
        return Err(Failure::new(
            exit_codes::CONFIG_DENIED,
            "Loopback mounts are disallowed by the system configuration",
        ));
    }

    // A target the static mount table governs, named by device or by mount
    // point, is handed to the plain mount helper under the caller's own
    // identity; the table's policy applies.
    if !loop_mount {
        let fstab_entries = fstab::read_table(&paths.fstab).unwrap_or_default();
        if let Some(entry) = governing_entry(&fstab_entries, &req.device) {
            debug::trace(&format!(
                "{} is governed by the static mount table; delegating",
                req.device.display()
            ));
            return Err(exec_fstab_mount(&entry.device, privilege));
        }
    }

    let device = if loop_mount {
        let loop_device = loopdev::associate(&req.device, policy_snapshot, privilege)
            .map_err(|e| match e {
                LoopError::Internal(msg) => Failure::new(exit_codes::INTERNAL_ERROR, msg),
                LoopError::Helper(msg) => Failure::new(exit_codes::HELPER_FAILED, msg),
                other => Failure::new(exit_codes::LOOP_FAILED, other.to_string()),
            })?;
        staged.loop_device = Some(loop_device.clone());
        loop_device
    } else {
        policy::check_device(&req.device, false)?;
        std::fs::canonicalize(&req.device).unwrap_or_else(|_| req.device.clone())
    };

    interrupted_check(interrupted)?;

    let readonly = req.options.force_write == Some(false);
    let mount_device = match luks::decrypt(
        &device,
        req.passphrase_file.as_deref(),
        readonly,
        &paths.mapper_root,
        &paths.luks_lock_root,
        privilege,
    )? {
        DecryptStatus::NotEncrypted => device.clone(),
        DecryptStatus::Decrypted(mapped) => {
            staged.decrypted = Some(mapped.clone());
            mapped
        }
        DecryptStatus::Failed => {
            return Err(Failure::new(
                exit_codes::UNLOCK_FAILED,
                format!("Could not decrypt {}", device.display()),
            ));
        }
        DecryptStatus::Exists(mapped) => {
            return Err(Failure::new(
                exit_codes::UNLOCK_FAILED,
                format!("Mapped device {} already exists", mapped.display()),
            ));
        }
    };

    locking::clean_stale(&paths.lock_root, &device);
    policy::check_not_locked(&paths.lock_root, &device)?;
    let mtab_entries = fstab::read_table(&paths.mtab).unwrap_or_default();
    policy::check_not_mounted(&mtab_entries, &device)?;
    if mount_device != device {
        policy::check_not_mounted(&mtab_entries, &mount_device)?;
    }
    policy::check_mountable(&device, &paths.sysfs, policy_snapshot, loop_mount)?;

    let name = label.unwrap_or_else(|| mount_point::derive_name(&req.device));
    let mntpt = paths.media_root.join(&name);
    {
        // Directory creation under the root-owned media root.
        let _scope = privilege.raise();
        if mount_point::prepare(&mntpt)
            .map_err(|e| Failure::new(exit_codes::INVALID_MOUNT_POINT, e))?
        {
            staged.created_mntpt = Some(mntpt.clone());
        }
    }
    let fstab_entries = fstab::read_table(&paths.fstab).unwrap_or_default();
    policy::check_mount_point(&mntpt, &fstab_entries, &mtab_entries)?;

    // Serialize racing invocations on the same target across fsck + mount.
    let lock = match mount_point::try_lock(&paths.mntpt_lock_root, &name)
        .map_err(|e| Failure::new(exit_codes::INTERNAL_ERROR, e))?
    {
        LockAttempt::Acquired(lock) => lock,
        LockAttempt::Busy => {
            return Err(Failure::new(
                exit_codes::ALREADY_LOCKED,
                format!("Another pmount is already mounting on {}", mntpt.display()),
            ));
        }
    };

    if req.fsck {
        interrupted_check(interrupted)?;
        run_fsck(&mount_device, privilege)?;
    }

    let sniffed = match &req.fstype {
        Some(_) => None,
        None => sniff_type(&mount_device, privilege),
    };
    let list = candidates(req.fstype.as_deref(), sniffed.as_deref())?;
    let chosen = sweep(&list, &mount_device, &mntpt, req, privilege, interrupted)?;
    debug::trace(&format!(
        "mounted {} on {} as {}",
        mount_device.display(),
        mntpt.display(),
        chosen.name
    ));
    drop(lock);
    Ok(())
}

/// Entry point for the mount subcommand; returns the process exit status.
pub fn run_mount(
    req: &MountRequest,
    paths: &Paths,
    policy_snapshot: &PolicySnapshot,
    privilege: &Privilege,
    interrupted: &Arc<AtomicBool>,
) -> i32 {
    let mut staged = Staged::default();
    match mount_flow(
        req,
        paths,
        policy_snapshot,
        privilege,
        interrupted,
        &mut staged,
    ) {
        Ok(()) => exit_codes::SUCCESS,
        Err(failure) => {
            staged.unwind(paths, privilege);
            eprintln!("pmount: {}", failure.message);
            failure.code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use assert_fs::prelude::*;
    use std::os::unix::fs::PermissionsExt;

    struct PathGuard {
        prev: Option<std::ffi::OsString>,
    }

    impl PathGuard {
        fn prepend(dir: &Path) -> Self {
            let prev = std::env::var_os("PATH");
            let mut paths: Vec<PathBuf> = vec![dir.to_path_buf()];
            if let Some(ref old) = prev {
                paths.extend(std::env::split_paths(old));
            }
            unsafe {
                std::env::set_var("PATH", std::env::join_paths(paths).unwrap());
            }
            Self { prev }
        }
    }

    impl Drop for PathGuard {
        fn drop(&mut self) {
            unsafe {
                match self.prev.take() {
                    Some(value) => std::env::set_var("PATH", value),
                    None => std::env::remove_var("PATH"),
                }
            }
        }
    }

    fn write_stub(dir: &Path, name: &str, script: &str) {
        let path = dir.join(name);
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    fn no_interrupt() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn request(device: &Path) -> MountRequest {
        MountRequest {
            device: device.to_path_buf(),
            ..MountRequest::default()
        }
    }

    fn permissive_policy() -> PolicySnapshot {
        // Skip the who-based login gate; these tests exercise later stages.
        config::parse_config("allow_not_physically_logged: true\n").unwrap()
    }

    // --- candidates ---

    #[test]
    fn candidates_explicit_type_is_sole_candidate() {
        let list = candidates(Some("vfat"), None).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "vfat");
    }

    #[test]
    fn candidates_unknown_explicit_type_is_usage_error() {
        let err = candidates(Some("befs"), None).unwrap_err();
        assert_eq!(err.code, exit_codes::USAGE_ERROR);
    }

    #[test]
    fn candidates_sniffed_type_goes_first_without_duplication() {
        let list = candidates(None, Some("ext4")).unwrap();
        assert_eq!(list[0].name, "ext4");
        assert_eq!(
            list.iter().filter(|fs| fs.name == "ext4").count(),
            1,
            "sniffed type must not repeat in the sweep"
        );
    }

    #[test]
    fn candidates_default_sweep_skips_marked_entries() {
        let list = candidates(None, None).unwrap();
        assert!(list.iter().all(|fs| fs.name != "ntfs-3g"));
        assert_eq!(list[0].name, "udf");
    }

    #[test]
    fn candidates_unknown_sniffed_type_still_sweeps() {
        let list = candidates(None, Some("zfs")).unwrap();
        assert_eq!(list[0].name, "udf");
    }

    // --- governing_entry ---

    #[test]
    fn governing_entry_matches_by_device() {
        let entries = fstab::parse_table("/dev/cdrom /media/cdrom iso9660 ro,user 0 0");
        let entry = governing_entry(&entries, Path::new("/dev/cdrom")).unwrap();
        assert_eq!(entry.mount_point, "/media/cdrom");
    }

    #[test]
    fn governing_entry_matches_by_mount_point() {
        let entries = fstab::parse_table("/dev/cdrom /media/cdrom iso9660 ro,user 0 0");
        let entry = governing_entry(&entries, Path::new("/media/cdrom")).unwrap();
        assert_eq!(entry.device, "/dev/cdrom");
    }

    #[test]
    fn governing_entry_misses_unlisted_target() {
        let entries = fstab::parse_table("/dev/cdrom /media/cdrom iso9660 ro,user 0 0");
        assert!(governing_entry(&entries, Path::new("/dev/pmount-test-sdb1")).is_none());
    }

    // --- sweep stderr routing ---

    #[test]
    fn sweep_silences_every_attempt_but_the_final_one() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let log = tmp.path().join("stderr-targets");
        // Each invocation records where its stderr points; /dev/null means
        // the attempt was silenced.
        write_stub(
            &bin,
            "mount",
            &format!(
                "#!/bin/sh\nreadlink /proc/$$/fd/2 >> {}\nexit 32\n",
                log.display()
            ),
        );
        let _guard = PathGuard::prepend(&bin);

        // An explicit vfat with a charset: the first attempt carries the
        // iocharset, the retry drops it, and only the retry may speak.
        let mut req = request(Path::new("/dev/pmount-test-missing"));
        req.fstype = Some("vfat".to_string());
        req.options.charset = Some("iso8859-15".to_string());
        let list = candidates(Some("vfat"), None).unwrap();
        let err = sweep(
            &list,
            Path::new("/dev/pmount-test-missing"),
            tmp.path(),
            &req,
            &Privilege::unprivileged(),
            &AtomicBool::new(false),
        )
        .unwrap_err();
        assert_eq!(err.code, exit_codes::HELPER_FAILED);

        let recorded = std::fs::read_to_string(&log).unwrap();
        let targets: Vec<&str> = recorded.lines().collect();
        assert_eq!(targets.len(), 2, "got: {recorded}");
        assert_eq!(targets[0], "/dev/null", "got: {recorded}");
        assert_ne!(targets[1], "/dev/null", "got: {recorded}");
    }

    // --- early denials (no device required) ---

    #[test]
    fn invalid_mask_is_rejected_before_any_device_check() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let paths = Paths::under(tmp.path());
        // The device does not exist either; the input error must win.
        let mut req = request(Path::new("/dev/pmount-test-missing"));
        req.options.umask = Some("01000".to_string());
        let code = run_mount(
            &req,
            &paths,
            &permissive_policy(),
            &Privilege::unprivileged(),
            &no_interrupt(),
        );
        assert_eq!(code, exit_codes::USAGE_ERROR);
    }

    #[test]
    fn invalid_charset_is_rejected_before_any_device_check() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let paths = Paths::under(tmp.path());
        let mut req = request(Path::new("/dev/pmount-test-missing"));
        req.options.charset = Some("evil,charset".to_string());
        let code = run_mount(
            &req,
            &paths,
            &permissive_policy(),
            &Privilege::unprivileged(),
            &no_interrupt(),
        );
        assert_eq!(code, exit_codes::USAGE_ERROR);
    }

    #[test]
    fn fsck_disallowed_by_config_denies_before_probing() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let paths = Paths::under(tmp.path());
        let policy_snapshot = config::parse_config(
            "allow_fsck: false\nallow_not_physically_logged: true\n",
        )
        .unwrap();
        let mut req = request(Path::new("/dev/pmount-test-missing"));
        req.fsck = true;
        let code = run_mount(
            &req,
            &paths,
            &policy_snapshot,
            &Privilege::unprivileged(),
            &no_interrupt(),
        );
        assert_eq!(code, exit_codes::CONFIG_DENIED);
    }

    #[test]
    fn missing_device_is_invalid_device() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let paths = Paths::under(tmp.path());
        let code = run_mount(
            &request(Path::new("/dev/pmount-test-missing")),
            &paths,
            &permissive_policy(),
            &Privilege::unprivileged(),
            &no_interrupt(),
        );
        assert_eq!(code, exit_codes::INVALID_DEVICE);
    }

    #[test]
    fn loop_mount_disallowed_by_config() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("disk.img").write_str("x").unwrap();
        let paths = Paths::under(tmp.path());
        let code = run_mount(
            &request(tmp.child("disk.img").path()),
            &paths,
            &permissive_policy(),
            &Privilege::unprivileged(),
            &no_interrupt(),
        );
        assert_eq!(code, exit_codes::CONFIG_DENIED);
    }

    #[test]
    fn bad_label_is_invalid_mount_point() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let paths = Paths::under(tmp.path());
        let mut req = request(Path::new("/dev/pmount-test-missing"));
        req.label = Some("a/b".to_string());
        let code = run_mount(
            &req,
            &paths,
            &permissive_policy(),
            &Privilege::unprivileged(),
            &no_interrupt(),
        );
        assert_eq!(code, exit_codes::INVALID_MOUNT_POINT);
    }

    #[test]
    fn interrupted_flag_aborts_before_mounting() {
        let tmp = assert_fs::TempDir::new().unwrap();
        tmp.child("disk.img").write_str("x").unwrap();
        let paths = Paths::under(tmp.path());
        // Loop is allowed but the allow-list is empty, so association would
        // fail anyway; the interrupt must win first.
        let policy_snapshot =
            config::parse_config("allow_loop: true\nallow_not_physically_logged: true\n").unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let code = run_mount(
            &request(tmp.child("disk.img").path()),
            &paths,
            &policy_snapshot,
            &Privilege::unprivileged(),
            &flag,
        );
        assert_eq!(code, INTERRUPTED);
    }
}
