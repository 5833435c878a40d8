/// Exit code: success.
pub const SUCCESS: i32 = 0;

/// Exit code: malformed arguments (bad mask value, bad charset, bad label, etc.).
pub const USAGE_ERROR: i32 = 1;

/// Exit code: device path missing, not a block device, or otherwise invalid.
pub const INVALID_DEVICE: i32 = 2;

/// Exit code: mount point invalid (non-empty, fstab-claimed, bad label).
pub const INVALID_MOUNT_POINT: i32 = 3;

/// Exit code: policy denial (already mounted, not mounted by you, locked, ...).
pub const POLICY_DENIED: i32 = 4;

/// Exit code: the mount/umount helper failed or could not be executed.
pub const HELPER_FAILED: i32 = 5;

/// Exit code: a lock entry could not be removed.
pub const UNLOCK_FAILED: i32 = 6;

/// Exit code: the pid given to lock/unlock does not exist.
pub const INVALID_PID: i32 = 7;

/// Exit code: the device (or mount-point) is already locked.
pub const ALREADY_LOCKED: i32 = 8;

/// Exit code: the operation is disallowed by the system configuration.
pub const CONFIG_DENIED: i32 = 9;

/// Exit code: no allow-listed loop device could be associated.
pub const LOOP_FAILED: i32 = 10;

/// Exit code: internal invariant violated (privilege change failed, helper
/// killed by a signal, corrupt state). "Should never happen; investigate."
pub const INTERNAL_ERROR: i32 = 100;
