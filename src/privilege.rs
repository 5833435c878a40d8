//! Privilege broker for the set-user-ID-root execution model.
//!
//! The binary is installed suid root. At startup the effective uid is dropped
//! to the real (calling) user, with root retained in the saved-id slot.
//! Every privileged filesystem or subprocess operation is then wrapped in the
//! narrowest possible raise → operate → lower bracket, expressed as a guard
//! whose `Drop` restores the unprivileged identity on every exit path.
//!
//! A failed identity change leaves the process with ambiguous privilege, so it
//! is never recoverable: the process terminates with the internal-error status.

use crate::exit_codes;

/// Snapshot of the process identity taken at startup.
///
/// `escalate` is true only when the process actually started with effective
/// root and a non-root real uid (i.e. a genuine suid installation). In a plain
/// unprivileged run (tests, development) every raise/lower is a no-op, so the
/// rest of the code can be exercised without a suid binary.
#[derive(Debug, Clone, Copy)]
pub struct Privilege {
    real_uid: libc::uid_t,
    real_gid: libc::gid_t,
    /// Group the binary is installed setgid to, if different from the real gid.
    setgid_group: Option<libc::gid_t>,
    escalate: bool,
    escalate_group: bool,
}

/// Guard holding effective uid root; lowers back to the real uid on drop.
pub struct RootScope<'a> {
    broker: &'a Privilege,
}

/// Guard holding effective gid 0; lowers back to the real gid on drop.
pub struct RootGroupScope<'a> {
    broker: &'a Privilege,
}

fn fatal_identity(op: &str) -> ! {
    eprintln!("pmount: internal error: {op} failed, cannot continue with ambiguous privilege");
    std::process::exit(exit_codes::INTERNAL_ERROR);
}

impl Privilege {
    /// Capture the startup identity and drop the effective ids to the real
    /// ones, keeping root in the saved slots for later re-escalation.
    pub fn startup() -> Self {
        let real_uid = unsafe { libc::getuid() };
        let real_gid = unsafe { libc::getgid() };
        let effective_uid = unsafe { libc::geteuid() };
        let effective_gid = unsafe { libc::getegid() };

        let escalate = effective_uid == 0 && real_uid != 0;
        let escalate_group = effective_gid == 0 && real_gid != 0;
        let setgid_group =
            (effective_gid != real_gid && effective_gid != 0).then_some(effective_gid);

        let broker = Self {
            real_uid,
            real_gid,
            setgid_group,
            escalate,
            escalate_group,
        };
        if escalate_group && unsafe { libc::setegid(real_gid) } != 0 {
            fatal_identity("dropping effective gid");
        }
        if escalate && unsafe { libc::seteuid(real_uid) } != 0 {
            fatal_identity("dropping effective uid");
        }
        broker
    }

    /// Broker for a process that never had elevated privilege (tests).
    pub fn unprivileged() -> Self {
        Self {
            real_uid: unsafe { libc::getuid() },
            real_gid: unsafe { libc::getgid() },
            setgid_group: None,
            escalate: false,
            escalate_group: false,
        }
    }

    /// The real (calling) user id.
    pub fn real_uid(&self) -> u32 {
        self.real_uid
    }

    /// The real (calling) primary group id.
    pub fn real_gid(&self) -> u32 {
        self.real_gid
    }

    /// Group to use for gid-mapping mount options: the setgid-inherited group
    /// when the binary is installed group-elevated, else the caller's primary
    /// group.
    pub fn mount_gid(&self) -> u32 {
        self.setgid_group.unwrap_or(self.real_gid)
    }

    /// Whether the real caller is the super-user.
    pub fn caller_is_root(&self) -> bool {
        self.real_uid == 0
    }

    /// Raise the effective uid to root for the lifetime of the guard.
    pub fn raise(&self) -> RootScope<'_> {
        if self.escalate && unsafe { libc::seteuid(0) } != 0 {
            fatal_identity("raising effective uid");
        }
        RootScope { broker: self }
    }

    /// Raise the effective gid to 0 for the lifetime of the guard.
    pub fn raise_group(&self) -> RootGroupScope<'_> {
        if self.escalate_group && unsafe { libc::setegid(0) } != 0 {
            fatal_identity("raising effective gid");
        }
        RootGroupScope { broker: self }
    }

    /// Give up root across all id slots so no re-escalation is ever possible
    /// again in this process image. Used right before exec-ing an unprivileged
    /// helper on the user's behalf.
    pub fn drop_permanently(&self) {
        if unsafe { libc::setresgid(self.real_gid, self.real_gid, self.real_gid) } != 0 {
            fatal_identity("dropping gid permanently");
        }
        if unsafe { libc::setresuid(self.real_uid, self.real_uid, self.real_uid) } != 0 {
            fatal_identity("dropping uid permanently");
        }
    }

    /// Whether this broker can actually re-escalate (suid installation).
    pub fn can_escalate(&self) -> bool {
        self.escalate
    }
}

impl Drop for RootScope<'_> {
    fn drop(&mut self) {
        if self.broker.escalate && unsafe { libc::seteuid(self.broker.real_uid) } != 0 {
            fatal_identity("lowering effective uid");
        }
    }
}

impl Drop for RootGroupScope<'_> {
    fn drop(&mut self) {
        if self.broker.escalate_group && unsafe { libc::setegid(self.broker.real_gid) } != 0 {
            fatal_identity("lowering effective gid");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprivileged_broker_reports_current_ids() {
        let broker = Privilege::unprivileged();
        assert_eq!(broker.real_uid(), unsafe { libc::getuid() });
        assert_eq!(broker.real_gid(), unsafe { libc::getgid() });
        assert!(!broker.can_escalate());
    }

    #[test]
    fn raise_and_lower_are_noops_without_suid() {
        let broker = Privilege::unprivileged();
        let before = unsafe { libc::geteuid() };
        {
            let _scope = broker.raise();
            assert_eq!(unsafe { libc::geteuid() }, before);
        }
        assert_eq!(unsafe { libc::geteuid() }, before);
    }

    #[test]
    fn mount_gid_defaults_to_real_gid() {
        let broker = Privilege::unprivileged();
        assert_eq!(broker.mount_gid(), broker.real_gid());
    }

    #[test]
    fn startup_without_suid_behaves_like_unprivileged() {
        // Test binaries are never suid, so startup must detect that and
        // produce a broker with no escalation capability.
        let broker = Privilege::startup();
        assert!(!broker.can_escalate());
        assert_eq!(broker.real_uid(), unsafe { libc::getuid() });
    }
}
