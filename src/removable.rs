//! Removability classification via sysfs.
//!
//! A device counts as removable when its block device exports
//! `removable == 1`, or when its device ancestry sits on a hotpluggable bus
//! (USB, FireWire, MMC, memory stick).

use std::path::Path;

const HOTPLUG_BUSES: &[&str] = &["usb", "ieee1394", "firewire", "mmc", "memstick"];

/// Candidate base block names for a device node name: `sdb1` also tries `sdb`,
/// `mmcblk0p1` also tries `mmcblk0p` and `mmcblk0`.
fn base_candidates(name: &str) -> Vec<String> {
    let mut candidates = vec![name.to_string()];
    let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed != name && !trimmed.is_empty() {
        candidates.push(trimmed.to_string());
        if let Some(without_p) = trimmed.strip_suffix('p')
            && !without_p.is_empty()
        {
            candidates.push(without_p.to_string());
        }
    }
    candidates
}

/// Find the `/sys/block` entry for `device`, trying partition-name fallbacks.
fn sys_block_dir(sysfs: &Path, device: &Path) -> Option<std::path::PathBuf> {
    let name = device.file_name()?.to_str()?;
    base_candidates(name)
        .into_iter()
        .map(|base| sysfs.join("block").join(base))
        .find(|dir| dir.exists())
}

/// Whether the bus ancestry of the block device passes through a hotpluggable
/// bus. The `device` symlink inside the sysfs block directory resolves into
/// the physical device path, which names the buses it hangs off.
fn on_hotplug_bus(block_dir: &Path) -> bool {
    let Ok(target) = std::fs::canonicalize(block_dir.join("device")) else {
        return false;
    };
    let target = target.to_string_lossy();
    HOTPLUG_BUSES
        .iter()
        .any(|bus| target.contains(&format!("/{bus}")))
}

/// Classify `device` as removable using the sysfs tree rooted at `sysfs`.
///
/// Unknown devices (no sysfs entry at all) are classified non-removable; the
/// allow-list is the escape hatch for those.
pub fn is_removable(sysfs: &Path, device: &Path) -> bool {
    let Some(block_dir) = sys_block_dir(sysfs, device) else {
        return false;
    };
    if let Ok(attr) = std::fs::read_to_string(block_dir.join("removable"))
        && attr.trim() == "1"
    {
        return true;
    }
    on_hotplug_bus(&block_dir)
}
