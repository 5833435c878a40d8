//! Filesystem-table oracle.
//!
//! Answers "does this table list an entry for device X / mount point Y" over
//! `/etc/fstab`, `/etc/mtab` and `/proc/mounts`. Device identity is matched
//! after resolving symlinks on both sides when possible, falling back to a
//! literal string comparison when resolution fails — the node may already be
//! gone if the user unplugged the hardware before unmounting.

use std::path::{Path, PathBuf};

/// One line of a mount-table-format file.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    /// The table's own device string; may be `LABEL=...`/`UUID=...` in fstab.
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
    pub options: Vec<String>,
}

impl TableEntry {
    /// The owning uid declared in the entry's options (`uid=N`), if any.
    pub fn owner_uid(&self) -> Option<u32> {
        self.options
            .iter()
            .find_map(|opt| opt.strip_prefix("uid="))
            .and_then(|v| v.parse().ok())
    }

    /// Whether the entry carries the given option verbatim.
    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|opt| opt == name)
    }
}

/// Decode the octal escapes mount tables use for whitespace (`\040` etc.).
fn decode_escapes(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let digits: String = chars.clone().take(3).collect();
            if digits.len() == 3
                && let Ok(code) = u8::from_str_radix(&digits, 8)
            {
                out.push(code as char);
                chars.nth(2);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Parse mount-table-format text. Comment lines and malformed lines are
/// skipped rather than reported; a table the kernel accepts is authoritative.
pub fn parse_table(text: &str) -> Vec<TableEntry> {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device = decode_escapes(parts.next()?);
            let mount_point = decode_escapes(parts.next()?);
            let fstype = parts.next()?.to_string();
            let options = parts
                .next()
                .map(|o| o.split(',').map(str::to_string).collect())
                .unwrap_or_default();
            Some(TableEntry {
                device,
                mount_point,
                fstype,
                options,
            })
        })
        .collect()
}

/// Read and parse the table file at `path`.
pub fn read_table(path: &Path) -> Result<Vec<TableEntry>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(parse_table(&text))
}

/// Canonicalize a path if it exists; `None` when resolution fails.
fn canonical(path: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok()
}

/// Whether two device strings name the same node, symlinks resolved when
/// possible, literal comparison otherwise.
fn same_device(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    // LABEL=/UUID= specs have no path form to resolve.
    if !a.starts_with('/') || !b.starts_with('/') {
        return false;
    }
    match (canonical(Path::new(a)), canonical(Path::new(b))) {
        (Some(ca), Some(cb)) => ca == cb,
        _ => false,
    }
}

/// Find the entry for `device`, tolerating path aliases on either side.
pub fn find_device<'a>(entries: &'a [TableEntry], device: &Path) -> Option<&'a TableEntry> {
    let wanted = device.to_string_lossy();
    entries.iter().find(|e| same_device(&e.device, &wanted))
}

/// Find the entry whose mount point is `mount_point` (literal match, as mount
/// points are recorded canonically by the tools that write these tables).
pub fn find_mount_point<'a>(entries: &'a [TableEntry], mount_point: &Path) -> Option<&'a TableEntry> {
    let wanted = mount_point.to_string_lossy();
    entries.iter().find(|e| e.mount_point == wanted)
}
