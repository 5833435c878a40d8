//! Listing of currently pmounted media.
//!
//! A bare invocation prints the live mount-table entries whose mount point
//! lives under the media root. Read-only and unprivileged.

use std::path::Path;

use crate::exit_codes;
use crate::fstab::{self, TableEntry};
use crate::paths::Paths;

/// Render the entries mounted under `media_root`, one line per mount, in the
/// style of the mount helper's own listing.
pub fn format_entries(entries: &[TableEntry], media_root: &Path) -> Vec<String> {
    let prefix = format!("{}/", media_root.to_string_lossy());
    entries
        .iter()
        .filter(|e| e.mount_point.starts_with(&prefix))
        .map(|e| {
            format!(
                "{} on {} type {} ({})",
                e.device,
                e.mount_point,
                e.fstype,
                e.options.join(",")
            )
        })
        .collect()
}

/// Entry point for the bare invocation; returns the process exit status.
pub fn run_list(paths: &Paths) -> i32 {
    let entries = match fstab::read_table(&paths.mtab) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("pmount: {e}");
            return exit_codes::INTERNAL_ERROR;
        }
    };
    for line in format_entries(&entries, &paths.media_root) {
        println!("{line}");
    }
    exit_codes::SUCCESS
}
