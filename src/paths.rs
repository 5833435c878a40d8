//! Filesystem locations pmount works with.
//!
//! Threaded through the orchestrators as an explicit value instead of global
//! constants so tests can point everything at a scratch directory.

use std::path::{Path, PathBuf};

/// Hidden stamp written into mount-point directories pmount created itself;
/// the sole basis for later removal.
pub const CREATED_STAMP: &str = ".created_by_pmount";

/// Prefix stripped from device paths when deriving mount-point names.
pub const DEVICE_ROOT: &str = "/dev/";

#[derive(Debug, Clone)]
pub struct Paths {
    /// Mount points are created under here.
    pub media_root: PathBuf,
    /// Per-device lock directories (pid-tagged files).
    pub lock_root: PathBuf,
    /// LUKS-open tracking locks, keyed by the decrypted device path.
    pub luks_lock_root: PathBuf,
    /// Advisory per-mount-point flock files.
    pub mntpt_lock_root: PathBuf,
    /// The static mount table.
    pub fstab: PathBuf,
    /// The live mount table.
    pub mtab: PathBuf,
    /// YAML policy configuration.
    pub config: PathBuf,
    /// Allow-list of path/glob patterns.
    pub allowlist: PathBuf,
    /// sysfs root for removability classification.
    pub sysfs: PathBuf,
    /// Where device-mapper nodes appear.
    pub mapper_root: PathBuf,
}

impl Paths {
    /// The standard system locations.
    pub fn system() -> Self {
        Self {
            media_root: PathBuf::from("/media"),
            lock_root: PathBuf::from("/var/lock/pmount"),
            luks_lock_root: PathBuf::from("/var/lock/pmount-luks"),
            mntpt_lock_root: PathBuf::from("/var/lock/pmount-mntpt"),
            fstab: PathBuf::from("/etc/fstab"),
            mtab: PathBuf::from("/proc/mounts"),
            config: PathBuf::from("/etc/pmount.conf"),
            allowlist: PathBuf::from("/etc/pmount.allow"),
            sysfs: PathBuf::from("/sys"),
            mapper_root: PathBuf::from("/dev/mapper"),
        }
    }

    /// All state rooted under `root`; used by tests.
    #[cfg(test)]
    pub fn under(root: &Path) -> Self {
        Self {
            media_root: root.join("media"),
            lock_root: root.join("lock"),
            luks_lock_root: root.join("lock-luks"),
            mntpt_lock_root: root.join("lock-mntpt"),
            fstab: root.join("fstab"),
            mtab: root.join("mtab"),
            config: root.join("pmount.conf"),
            allowlist: root.join("pmount.allow"),
            sysfs: root.join("sys"),
            mapper_root: root.join("mapper"),
        }
    }
}
