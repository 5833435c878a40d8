mod cli;
mod cmd;
mod completions;
mod config;
mod debug;
mod exit_codes;
mod fstab;
mod fstype;
mod list;
mod locking;
mod loopdev;
mod luks;
mod mount;
mod mount_point;
mod options;
mod paths;
mod policy;
mod privilege;
mod removable;
mod signals;
mod umount;

use clap::Parser;

use crate::mount::MountRequest;
use crate::options::MountOptions;
use crate::umount::UmountRequest;

fn load_policy(paths: &paths::Paths) -> Result<config::PolicySnapshot, i32> {
    config::load(&paths.config, &paths.allowlist).map_err(|e| {
        eprintln!("pmount: {e}");
        exit_codes::CONFIG_DENIED
    })
}

fn main() {
    // The effective uid must be dropped before anything else runs, argument
    // parsing included.
    let privilege = privilege::Privilege::startup();
    let parsed = cli::Cli::parse();
    if parsed.debug {
        debug::enable();
    }
    let interrupted = signals::interrupted_flag();
    let paths = paths::Paths::system();

    let code = match parsed.command {
        None | Some(cli::Commands::List) => list::run_list(&paths),
        Some(cli::Commands::Mount {
            device,
            label,
            read_only,
            read_write,
            sync,
            noatime,
            exec,
            fstype,
            charset,
            umask,
            fmask,
            dmask,
            passphrase,
            fsck,
            selinux_context,
        }) => match load_policy(&paths) {
            Ok(policy_snapshot) => {
                let force_write = if read_only {
                    Some(false)
                } else if read_write {
                    Some(true)
                } else {
                    None
                };
                let request = MountRequest {
                    device,
                    label,
                    fstype,
                    options: MountOptions {
                        sync,
                        noatime,
                        exec,
                        force_write,
                        umask,
                        fmask,
                        dmask,
                        charset,
                        selinux_context,
                    },
                    passphrase_file: passphrase,
                    fsck,
                };
                mount::run_mount(&request, &paths, &policy_snapshot, &privilege, &interrupted)
            }
            Err(code) => code,
        },
        Some(cli::Commands::Umount {
            target,
            lazy,
            really_lazy: _,
            luks_force,
        }) => match load_policy(&paths) {
            Ok(policy_snapshot) => {
                let request = UmountRequest {
                    target,
                    lazy,
                    luks_force,
                };
                umount::run_umount(&request, &paths, &policy_snapshot, &privilege)
            }
            Err(code) => code,
        },
        Some(cli::Commands::Lock { device, pid }) => {
            let _scope = privilege.raise();
            match locking::add_lock(&paths.lock_root, &device, pid) {
                Ok(()) => exit_codes::SUCCESS,
                Err(e @ locking::LockError::InvalidPid(_)) => {
                    eprintln!("pmount: {e}");
                    exit_codes::INVALID_PID
                }
                Err(e) => {
                    eprintln!("pmount: {e}");
                    exit_codes::UNLOCK_FAILED
                }
            }
        }
        Some(cli::Commands::Unlock { device, pid }) => {
            let _scope = privilege.raise();
            match locking::remove_lock(&paths.lock_root, &device, pid) {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("pmount: {e}");
                    exit_codes::UNLOCK_FAILED
                }
            }
        }
        Some(cli::Commands::Completions { shell }) => completions::run_completions(shell),
    };
    std::process::exit(code);
}
