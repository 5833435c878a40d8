use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pmount",
    version,
    about = "Policy-enforcing mount wrapper for removable media",
    long_about = "pmount lets locally-logged-in users mount removable media without an\n\
                  fstab entry. It runs set-user-ID root and enforces a policy: the device\n\
                  must be removable (or allow-listed), not locked, and the mount point is\n\
                  created under /media and removed again on unmount.\n\n\
                  Invoked without a subcommand, pmount lists the media it mounted."
)]
pub struct Cli {
    /// Print each helper invocation and state transition to stderr
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mount a removable device (or a regular file via a loop device)
    Mount {
        /// Device node, or a regular file for a loopback mount
        device: PathBuf,

        /// Mount-point name under the media root (default: derived from the device path)
        label: Option<String>,

        /// Force read-only
        #[arg(short = 'r', long, conflicts_with = "read_write")]
        read_only: bool,

        /// Force read-write
        #[arg(short = 'w', long)]
        read_write: bool,

        /// Mount synchronously (no write caching; safe to unplug sooner)
        #[arg(short = 's', long)]
        sync: bool,

        /// Do not update file access times
        #[arg(short = 'A', long)]
        noatime: bool,

        /// Allow execution of binaries on the medium
        #[arg(short = 'e', long)]
        exec: bool,

        /// Filesystem type (default: auto-detected)
        #[arg(short = 't', long = "type", value_name = "FS")]
        fstype: Option<String>,

        /// I/O character set for filesystems that support one
        #[arg(short = 'c', long, value_name = "CHARSET")]
        charset: Option<String>,

        /// Permission mask (octal, at most 0777) for filesystems that support one
        #[arg(short = 'u', long, value_name = "MASK")]
        umask: Option<String>,

        /// File permission mask (default: umask with execute bits cleared)
        #[arg(long, value_name = "MASK")]
        fmask: Option<String>,

        /// Directory permission mask (default: umask)
        #[arg(long, value_name = "MASK")]
        dmask: Option<String>,

        /// Read the LUKS passphrase from this file instead of prompting
        #[arg(short = 'p', long = "passphrase", value_name = "FILE")]
        passphrase: Option<PathBuf>,

        /// Run fsck before mounting (may be disallowed by configuration)
        #[arg(short = 'F', long)]
        fsck: bool,

        /// SELinux context to mount with
        #[arg(long, value_name = "CONTEXT")]
        selinux_context: Option<String>,
    },

    /// Unmount a device mounted by you, undoing pmount's setup
    Umount {
        /// Device node, mount-point path, or bare mount-point name
        target: PathBuf,

        /// Lazy detach: detach now, clean up when the device is no longer busy
        #[arg(short = 'l', long, requires = "really_lazy")]
        lazy: bool,

        /// Confirm the lazy detach; on removable media it risks data loss
        #[arg(long = "yes-i-really-want-lazy-unmount")]
        really_lazy: bool,

        /// Close the LUKS mapping even if pmount did not open it
        #[arg(long)]
        luks_force: bool,
    },

    /// Hold a lock on a device so other pmount invocations refuse to mount it
    Lock {
        /// Device node to lock
        device: PathBuf,

        /// Pid the lock entry is tagged with; must name a live process
        pid: u32,
    },

    /// Release a lock entry (removing one that does not exist is not an error)
    Unlock {
        /// Device node to unlock
        device: PathBuf,

        /// Pid the lock entry was tagged with
        pid: u32,
    },

    /// List media currently mounted under the media root (the default)
    List,

    /// Generate shell completion script (bash, zsh, fish, powershell, elvish)
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
