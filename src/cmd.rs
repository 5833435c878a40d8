//! Subprocess launcher.
//!
//! Every external-program invocation (mount, umount, cryptsetup, losetup,
//! fsck, blkid) funnels through this module so that privilege scoping and
//! exit-status normalization live in exactly one place.

use std::ffi::OsStr;
use std::process::{Command, Stdio};

use crate::privilege::Privilege;

/// How to run a helper program.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecFlags {
    /// Raise the effective uid to root around the spawn.
    pub as_root: bool,
    /// Also raise the real uid to root in the child before exec. Needed by
    /// helpers (mount, cryptsetup) that themselves drop privilege when the
    /// real and effective ids differ.
    pub root_real: bool,
    /// Redirect the child's stdout to the null device.
    pub null_stdout: bool,
    /// Redirect the child's stderr to the null device.
    pub null_stderr: bool,
    /// Capture the child's stdout into the returned buffer.
    pub capture_stdout: bool,
    /// Capture the child's stderr into the returned buffer.
    pub capture_stderr: bool,
}

impl ExecFlags {
    /// Run with both real and effective root, helper output untouched.
    pub fn privileged() -> Self {
        Self {
            as_root: true,
            root_real: true,
            ..Self::default()
        }
    }

    /// Run with both real and effective root, stderr suppressed.
    pub fn privileged_quiet() -> Self {
        Self {
            as_root: true,
            root_real: true,
            null_stdout: true,
            null_stderr: true,
            ..Self::default()
        }
    }
}

/// Output captured from a subprocess.
#[derive(Debug)]
pub struct CaptureOutput {
    pub stdout: String,
    pub stderr: String,
    /// The child's exit code, normalized to a small nonnegative integer.
    pub status: i32,
}

/// Why a helper invocation produced no usable exit status.
#[derive(Debug)]
pub enum SpawnError {
    /// The program could not be spawned (not found, not executable).
    Spawn(String),
    /// The child was killed or terminated abnormally instead of exiting.
    /// This is never an expected, recoverable outcome.
    Abnormal(String),
}

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpawnError::Spawn(msg) | SpawnError::Abnormal(msg) => write!(f, "{msg}"),
        }
    }
}

impl SpawnError {
    /// Whether this failure must be reported with the internal-error status.
    pub fn is_internal(&self) -> bool {
        matches!(self, SpawnError::Abnormal(_))
    }
}

fn stream_stdio(capture: bool, null: bool) -> Stdio {
    if capture {
        Stdio::piped()
    } else if null {
        Stdio::null()
    } else {
        Stdio::inherit()
    }
}

/// Run `prog` with `args` under `flags`, waiting for completion.
///
/// A non-zero exit code is NOT an error; it is returned in
/// `CaptureOutput.status`. `Err` means the helper could not be spawned or died
/// abnormally.
pub fn run_with<S: AsRef<OsStr>>(
    prog: &str,
    args: &[S],
    flags: ExecFlags,
    privilege: &Privilege,
) -> Result<CaptureOutput, SpawnError> {
    let mut command = Command::new(prog);
    command
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(stream_stdio(flags.capture_stdout, flags.null_stdout))
        .stderr(stream_stdio(flags.capture_stderr, flags.null_stderr));

    if flags.root_real && (privilege.can_escalate() || privilege.caller_is_root()) {
        // The child inherits effective root from the raise below; lifting the
        // real uid too happens after fork, in the child only. Without a
        // set-user-ID installation there is no root to lift to, so the hook
        // is skipped and the helper runs with the caller's own ids.
        unsafe {
            use std::os::unix::process::CommandExt;
            command.pre_exec(|| {
                if libc::setresuid(0, 0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let output = {
        // Raise effective root only for the spawn window when requested; the
        // guard lowers it again as soon as the child has been forked off.
        let _scope = flags.as_root.then(|| privilege.raise());
        command.output()
    };

    let output = output.map_err(|e| SpawnError::Spawn(format!("Failed to run {prog}: {e}")))?;

    let status = match output.status.code() {
        Some(code) => code,
        None => {
            return Err(SpawnError::Abnormal(format!(
                "{prog} terminated abnormally (killed by a signal)"
            )));
        }
    };

    Ok(CaptureOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status,
    })
}

/// Run `prog` with `args` unprivileged, capturing stdout and stderr.
pub fn run_capture<S: AsRef<OsStr>>(prog: &str, args: &[S]) -> Result<CaptureOutput, SpawnError> {
    let flags = ExecFlags {
        capture_stdout: true,
        capture_stderr: true,
        ..ExecFlags::default()
    };
    run_with(prog, args, flags, &Privilege::unprivileged())
}

/// Resolve `binary` through `PATH`, returning its full path if present.
pub fn find_in_path(binary: &str) -> Option<std::path::PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(binary);
        candidate.is_file().then_some(candidate)
    })
}
