//! Mount option assembly.
//!
//! Builds the `-o` string for one mount attempt from the filesystem
//! descriptor and the user's flags. Later sources are appended after earlier
//! ones, so a later option overrides an earlier one where the kernel allows
//! duplicates.

use crate::fstype::FsDescriptor;

/// User-selected mount behavior, already parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    pub sync: bool,
    pub noatime: bool,
    pub exec: bool,
    /// `Some(false)` forces read-only, `Some(true)` read-write, `None` leaves
    /// the kernel default.
    pub force_write: Option<bool>,
    pub umask: Option<String>,
    pub fmask: Option<String>,
    pub dmask: Option<String>,
    pub charset: Option<String>,
    pub selinux_context: Option<String>,
}

/// Parse and validate an octal mask argument; the permitted range is
/// 0 through 0777.
pub fn validate_mask(value: &str) -> Result<u32, String> {
    let mask = u32::from_str_radix(value, 8)
        .map_err(|_| format!("Invalid umask value: {value}"))?;
    if mask > 0o777 {
        return Err(format!("umask value out of range (0..0777): {value}"));
    }
    Ok(mask)
}

/// Validate a charset name: nonempty, alphanumeric plus `-`/`_`. The value is
/// spliced into the option string, so anything else is rejected as an input
/// error before it can reach the mount helper.
pub fn validate_charset(value: &str) -> Result<(), String> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(format!("Invalid charset name: {value}"))
    }
}

/// Check every user-supplied option value without assembling anything, so
/// bad input is rejected before any device or helper is touched.
pub fn validate(opts: &MountOptions) -> Result<(), String> {
    for mask in [&opts.umask, &opts.fmask, &opts.dmask].into_iter().flatten() {
        validate_mask(mask)?;
    }
    if let Some(ref charset) = opts.charset {
        validate_charset(charset)?;
    }
    Ok(())
}

/// Whether the current locale uses UTF-8.
pub fn locale_is_utf8() -> bool {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .map(|value| {
            let lower = value.to_ascii_lowercase();
            lower.contains("utf-8") || lower.contains("utf8")
        })
        .unwrap_or(false)
}

/// Assemble the full option string for mounting with `fs`.
///
/// `uid`/`gid` are the ids mapped in when the filesystem supports it;
/// `utf8_locale` is passed in rather than read from the environment so the
/// charset fallback is testable.
pub fn assemble(
    fs: &FsDescriptor,
    opts: &MountOptions,
    uid: u32,
    gid: u32,
    utf8_locale: bool,
) -> Result<String, String> {
    let mut parts: Vec<String> = vec![fs.options.to_string()];

    parts.push(if opts.sync { "sync" } else { "async" }.to_string());
    parts.push(if opts.noatime { "noatime" } else { "atime" }.to_string());
    parts.push(if opts.exec { "exec" } else { "noexec" }.to_string());

    match opts.force_write {
        Some(false) => parts.push("ro".to_string()),
        Some(true) => parts.push("rw".to_string()),
        None => {}
    }

    if fs.support_ugid {
        parts.push(format!("uid={uid}"));
        parts.push(format!("gid={gid}"));
    }

    // Masks: user override beats the descriptor default. fmask defaults to
    // the umask with execute bits forced off; dmask defaults to the umask.
    let umask = match (&opts.umask, fs.default_umask) {
        (Some(value), _) => Some(validate_mask(value)?),
        (None, Some(default)) => Some(validate_mask(default)?),
        (None, None) => None,
    };
    if let Some(umask) = umask {
        parts.push(format!("umask={umask:04o}"));
        if fs.support_fdmask {
            let fmask = match &opts.fmask {
                Some(value) => validate_mask(value)?,
                None => umask | 0o111,
            };
            let dmask = match &opts.dmask {
                Some(value) => validate_mask(value)?,
                None => umask,
            };
            parts.push(format!("fmask={fmask:04o}"));
            parts.push(format!("dmask={dmask:04o}"));
        }
    }

    if let Some(charset_option) = fs.charset_option {
        if let Some(ref charset) = opts.charset {
            validate_charset(charset)?;
        }
        let explicit_utf8 = opts.charset.as_deref() == Some("utf8");
        if fs.fat && utf8_locale && !explicit_utf8 {
            // The kernel's utf8 option and a UTF-8 iocharset interact badly
            // for the FAT family; force utf8 and keep a Latin-1 on-disk
            // charset unless the user explicitly asked for utf8.
            parts.push("utf8".to_string());
            let on_disk = opts.charset.as_deref().unwrap_or("iso8859-1");
            parts.push(format!("{charset_option}={on_disk}"));
        } else if let Some(ref charset) = opts.charset {
            parts.push(format!("{charset_option}={charset}"));
        }
    }

    if fs.fat {
        parts.push("tz=UTC".to_string());
    }

    if let Some(ref context) = opts.selinux_context {
        parts.push(format!("context={context}"));
    }

    Ok(parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fstype;

    fn vfat() -> &'static FsDescriptor {
        fstype::find("vfat").unwrap()
    }

    fn ext4() -> &'static FsDescriptor {
        fstype::find("ext4").unwrap()
    }

    // --- validate_mask ---

    #[test]
    fn mask_0777_is_accepted() {
        assert_eq!(validate_mask("0777").unwrap(), 0o777);
    }

    #[test]
    fn mask_01000_is_rejected() {
        assert!(validate_mask("01000").is_err());
    }

    #[test]
    fn mask_non_octal_is_rejected() {
        assert!(validate_mask("9").is_err());
        assert!(validate_mask("rwx").is_err());
    }

    #[test]
    fn mask_007_parses() {
        assert_eq!(validate_mask("007").unwrap(), 0o007);
    }

    // --- validate_charset ---

    #[test]
    fn charset_iso8859_1_is_valid() {
        assert!(validate_charset("iso8859-1").is_ok());
    }

    #[test]
    fn charset_with_separator_chars_is_invalid() {
        assert!(validate_charset("iso,evil=1").is_err());
        assert!(validate_charset("").is_err());
    }

    // --- validate ---

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&MountOptions::default()).is_ok());
    }

    #[test]
    fn validate_rejects_each_bad_mask() {
        for field in ["umask", "fmask", "dmask"] {
            let mut opts = MountOptions::default();
            match field {
                "umask" => opts.umask = Some("01000".to_string()),
                "fmask" => opts.fmask = Some("rwx".to_string()),
                _ => opts.dmask = Some("9".to_string()),
            }
            assert!(validate(&opts).is_err(), "{field} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_bad_charset() {
        let opts = MountOptions {
            charset: Some("evil,charset".to_string()),
            ..MountOptions::default()
        };
        assert!(validate(&opts).is_err());
    }

    // --- assemble ---

    #[test]
    fn assemble_defaults_for_ext4() {
        let out = assemble(ext4(), &MountOptions::default(), 1000, 1000, false).unwrap();
        assert!(out.starts_with("nodev,nosuid"), "got: {out}");
        assert!(out.contains("async"), "got: {out}");
        assert!(out.contains("atime"), "got: {out}");
        assert!(out.contains("noexec"), "got: {out}");
        // ext4 has no uid/gid mapping and no umask.
        assert!(!out.contains("uid="), "got: {out}");
        assert!(!out.contains("umask="), "got: {out}");
    }

    #[test]
    fn assemble_vfat_maps_uid_gid_and_masks() {
        let out = assemble(vfat(), &MountOptions::default(), 1000, 1001, false).unwrap();
        assert!(out.contains("uid=1000"), "got: {out}");
        assert!(out.contains("gid=1001"), "got: {out}");
        assert!(out.contains("umask=0077"), "got: {out}");
        // fmask = umask with execute bits off; dmask = umask.
        assert!(out.contains("fmask=0177"), "got: {out}");
        assert!(out.contains("dmask=0077"), "got: {out}");
        assert!(out.contains("tz=UTC"), "got: {out}");
    }

    #[test]
    fn assemble_user_umask_overrides_default() {
        let opts = MountOptions {
            umask: Some("0022".to_string()),
            ..MountOptions::default()
        };
        let out = assemble(vfat(), &opts, 1000, 1000, false).unwrap();
        assert!(out.contains("umask=0022"), "got: {out}");
        assert!(out.contains("fmask=0133"), "got: {out}");
        assert!(out.contains("dmask=0022"), "got: {out}");
    }

    #[test]
    fn assemble_explicit_fmask_dmask_win() {
        let opts = MountOptions {
            fmask: Some("0111".to_string()),
            dmask: Some("0000".to_string()),
            ..MountOptions::default()
        };
        let out = assemble(vfat(), &opts, 1000, 1000, false).unwrap();
        assert!(out.contains("fmask=0111"), "got: {out}");
        assert!(out.contains("dmask=0000"), "got: {out}");
    }

    #[test]
    fn assemble_out_of_range_mask_is_input_error() {
        let opts = MountOptions {
            umask: Some("01000".to_string()),
            ..MountOptions::default()
        };
        assert!(assemble(vfat(), &opts, 1000, 1000, false).is_err());
    }

    #[test]
    fn assemble_forced_ro_and_rw() {
        let ro = MountOptions {
            force_write: Some(false),
            ..MountOptions::default()
        };
        let rw = MountOptions {
            force_write: Some(true),
            ..MountOptions::default()
        };
        assert!(assemble(ext4(), &ro, 0, 0, false).unwrap().contains(",ro"));
        assert!(assemble(ext4(), &rw, 0, 0, false).unwrap().contains(",rw"));
    }

    #[test]
    fn assemble_fat_utf8_locale_forces_kernel_utf8_with_latin1() {
        let out = assemble(vfat(), &MountOptions::default(), 1000, 1000, true).unwrap();
        assert!(out.contains(",utf8,"), "got: {out}");
        assert!(out.contains("iocharset=iso8859-1"), "got: {out}");
    }

    #[test]
    fn assemble_fat_explicit_utf8_charset_is_honored() {
        let opts = MountOptions {
            charset: Some("utf8".to_string()),
            ..MountOptions::default()
        };
        let out = assemble(vfat(), &opts, 1000, 1000, true).unwrap();
        assert!(out.contains("iocharset=utf8"), "got: {out}");
        assert!(!out.contains(",utf8,iocharset=iso8859-1"), "got: {out}");
    }

    #[test]
    fn assemble_explicit_charset_on_fat_under_utf8_locale_stays_on_disk() {
        // Kernel utf8 plus the user's on-disk charset.
        let opts = MountOptions {
            charset: Some("iso8859-15".to_string()),
            ..MountOptions::default()
        };
        let out = assemble(vfat(), &opts, 1000, 1000, true).unwrap();
        assert!(out.contains(",utf8,"), "got: {out}");
        assert!(out.contains("iocharset=iso8859-15"), "got: {out}");
    }

    #[test]
    fn assemble_ntfs_uses_nls_option() {
        let opts = MountOptions {
            charset: Some("utf8".to_string()),
            ..MountOptions::default()
        };
        let out = assemble(fstype::find("ntfs").unwrap(), &opts, 1000, 1000, false).unwrap();
        assert!(out.contains("nls=utf8"), "got: {out}");
    }

    #[test]
    fn assemble_bad_charset_is_input_error() {
        let opts = MountOptions {
            charset: Some("evil,charset".to_string()),
            ..MountOptions::default()
        };
        assert!(assemble(vfat(), &opts, 1000, 1000, false).is_err());
    }

    #[test]
    fn assemble_selinux_context_is_appended_last() {
        let opts = MountOptions {
            selinux_context: Some("system_u:object_r:removable_t:s0".to_string()),
            ..MountOptions::default()
        };
        let out = assemble(ext4(), &opts, 1000, 1000, false).unwrap();
        assert!(
            out.ends_with("context=system_u:object_r:removable_t:s0"),
            "got: {out}"
        );
    }

    #[test]
    fn assemble_charset_without_fs_support_is_dropped() {
        let opts = MountOptions {
            charset: Some("utf8".to_string()),
            ..MountOptions::default()
        };
        let out = assemble(ext4(), &opts, 1000, 1000, false).unwrap();
        assert!(!out.contains("utf8"), "got: {out}");
    }
}
