use assert_cmd::Command;
use predicates::prelude::*;

fn pmount() -> Command {
    Command::cargo_bin("pmount").unwrap()
}

// --- --help / --version ---

#[test]
fn help_exits_zero() {
    pmount().arg("--help").assert().success();
}

#[test]
fn help_lists_all_subcommands() {
    pmount()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mount"))
        .stdout(predicate::str::contains("umount"))
        .stdout(predicate::str::contains("lock"))
        .stdout(predicate::str::contains("unlock"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn version_exits_zero() {
    pmount().arg("--version").assert().success();
}

#[test]
fn version_output_contains_binary_name() {
    pmount()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pmount"));
}

// --- pmount mount --help ---

#[test]
fn mount_help_shows_read_only_and_read_write() {
    pmount()
        .args(["mount", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--read-only"))
        .stdout(predicate::str::contains("--read-write"));
}

#[test]
fn mount_help_shows_type_and_charset() {
    pmount()
        .args(["mount", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--type"))
        .stdout(predicate::str::contains("--charset"));
}

#[test]
fn mount_help_shows_masks() {
    pmount()
        .args(["mount", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--umask"))
        .stdout(predicate::str::contains("--fmask"))
        .stdout(predicate::str::contains("--dmask"));
}

#[test]
fn mount_help_shows_passphrase_and_fsck() {
    pmount()
        .args(["mount", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--passphrase"))
        .stdout(predicate::str::contains("--fsck"));
}

#[test]
fn mount_without_device_is_a_parse_error() {
    pmount().arg("mount").assert().failure().code(2);
}

#[test]
fn mount_read_only_conflicts_with_read_write() {
    pmount()
        .args(["mount", "-r", "-w", "/dev/sdz1"])
        .assert()
        .failure()
        .code(2);
}

// --- pmount umount --help ---

#[test]
fn umount_help_shows_lazy_gate() {
    pmount()
        .args(["umount", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--lazy"))
        .stdout(predicate::str::contains("--yes-i-really-want-lazy-unmount"));
}

#[test]
fn lazy_unmount_requires_the_confirmation_flag() {
    pmount()
        .args(["umount", "--lazy", "/dev/sdz1"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unmounting_an_unmounted_device_is_a_policy_denial() {
    pmount()
        .args(["umount", "/dev/pmount-test-absent"])
        .assert()
        .failure()
        .code(4);
}

// --- pmount lock / unlock ---

#[test]
fn lock_with_dead_pid_is_invalid_pid() {
    // No process can have this pid (beyond the default pid_max).
    pmount()
        .args(["lock", "/dev/pmount-test-absent", "4000000"])
        .assert()
        .failure()
        .code(7)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn lock_without_pid_is_a_parse_error() {
    pmount()
        .args(["lock", "/dev/sdz1"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unlock_never_locked_device_succeeds() {
    // Removing a lock entry that does not exist is not an error.
    pmount()
        .args(["unlock", "/dev/pmount-test-absent", "4000000"])
        .assert()
        .success();
}

// --- bare invocation / list ---

#[test]
fn bare_invocation_lists_and_exits_zero() {
    pmount().assert().success();
}

#[test]
fn explicit_list_subcommand_exits_zero() {
    pmount().arg("list").assert().success();
}

// --- completions ---

#[test]
fn completions_bash_emits_a_script() {
    pmount()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pmount"));
}

#[test]
fn completions_rejects_unknown_shell() {
    pmount()
        .args(["completions", "tcsh"])
        .assert()
        .failure()
        .code(2);
}
