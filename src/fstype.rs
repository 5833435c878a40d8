//! Static table of supported filesystem types.
//!
//! The order is significant: the auto-detection sweep tries entries in
//! declaration order. Entries marked `skip_autodetect` are only used when
//! explicitly requested or substituted as an upgrade driver for a sniffed
//! type.

/// Compiled-in description of one supported filesystem type.
#[derive(Debug)]
pub struct FsDescriptor {
    /// Canonical type name as passed to `mount -t`.
    pub name: &'static str,
    /// Base mount option string, always applied.
    pub options: &'static str,
    /// Whether the type supports `uid=`/`gid=` mapping.
    pub support_ugid: bool,
    /// Default `umask` value when the type supports umask.
    pub default_umask: Option<&'static str>,
    /// Whether the type supports split `fmask=`/`dmask=` options.
    pub support_fdmask: bool,
    /// Option name carrying the I/O charset (`iocharset` or `nls`), if any.
    pub charset_option: Option<&'static str>,
    /// FAT family: gets the kernel `utf8` special case and the UTC hint.
    pub fat: bool,
    /// Excluded from the auto-detection sweep unless explicitly requested.
    pub skip_autodetect: bool,
}

const BASE: &str = "nodev,nosuid";

/// The supported filesystems, in auto-detection order.
pub const TABLE: &[FsDescriptor] = &[
    FsDescriptor {
        name: "udf",
        options: BASE,
        support_ugid: true,
        default_umask: Some("007"),
        support_fdmask: false,
        charset_option: Some("iocharset"),
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "iso9660",
        options: BASE,
        support_ugid: true,
        default_umask: None,
        support_fdmask: false,
        charset_option: Some("iocharset"),
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "vfat",
        options: "nodev,nosuid,quiet,shortname=mixed",
        support_ugid: true,
        default_umask: Some("077"),
        support_fdmask: true,
        charset_option: Some("iocharset"),
        fat: true,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "msdos",
        options: BASE,
        support_ugid: true,
        default_umask: Some("077"),
        support_fdmask: false,
        charset_option: Some("iocharset"),
        fat: true,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "hfsplus",
        options: BASE,
        support_ugid: true,
        default_umask: None,
        support_fdmask: false,
        charset_option: None,
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "hfs",
        options: BASE,
        support_ugid: true,
        default_umask: Some("077"),
        support_fdmask: false,
        charset_option: None,
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "ext3",
        options: BASE,
        support_ugid: false,
        default_umask: None,
        support_fdmask: false,
        charset_option: None,
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "ext2",
        options: BASE,
        support_ugid: false,
        default_umask: None,
        support_fdmask: false,
        charset_option: None,
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "ext4",
        options: BASE,
        support_ugid: false,
        default_umask: None,
        support_fdmask: false,
        charset_option: None,
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "reiserfs",
        options: BASE,
        support_ugid: false,
        default_umask: None,
        support_fdmask: false,
        charset_option: None,
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "xfs",
        options: BASE,
        support_ugid: false,
        default_umask: None,
        support_fdmask: false,
        charset_option: None,
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "jfs",
        options: BASE,
        support_ugid: false,
        default_umask: None,
        support_fdmask: false,
        charset_option: Some("iocharset"),
        fat: false,
        skip_autodetect: false,
    },
    FsDescriptor {
        name: "ntfs",
        options: BASE,
        support_ugid: true,
        default_umask: Some("077"),
        support_fdmask: false,
        charset_option: Some("nls"),
        fat: false,
        skip_autodetect: false,
    },
    // Userspace driver superseding the legacy kernel ntfs type; only tried
    // when requested, sniffed, or present as the installed upgrade driver.
    FsDescriptor {
        name: "ntfs-3g",
        options: BASE,
        support_ugid: true,
        default_umask: Some("077"),
        support_fdmask: true,
        charset_option: None,
        fat: false,
        skip_autodetect: true,
    },
];

/// Look up a descriptor by canonical name.
pub fn find(name: &str) -> Option<&'static FsDescriptor> {
    TABLE.iter().find(|fs| fs.name == name)
}

/// The upgrade driver for a sniffed type, when a more capable user-space
/// driver for the same on-disk format is installed: `ntfs` → `ntfs-3g`.
pub fn upgrade_for(sniffed: &str) -> Option<&'static FsDescriptor> {
    match sniffed {
        "ntfs" if crate::cmd::find_in_path("ntfs-3g").is_some() => find("ntfs-3g"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_known_type() {
        let vfat = find("vfat").unwrap();
        assert!(vfat.support_ugid);
        assert!(vfat.fat);
        assert_eq!(vfat.default_umask, Some("077"));
    }

    #[test]
    fn find_unknown_type_is_none() {
        assert!(find("befs").is_none());
    }

    #[test]
    fn all_names_are_unique() {
        for (i, a) in TABLE.iter().enumerate() {
            for b in &TABLE[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn only_ntfs_3g_skips_autodetect() {
        let skipped: Vec<&str> = TABLE
            .iter()
            .filter(|fs| fs.skip_autodetect)
            .map(|fs| fs.name)
            .collect();
        assert_eq!(skipped, vec!["ntfs-3g"]);
    }

    #[test]
    fn every_descriptor_forbids_suid_and_devices() {
        for fs in TABLE {
            assert!(fs.options.contains("nosuid"), "{} lacks nosuid", fs.name);
            assert!(fs.options.contains("nodev"), "{} lacks nodev", fs.name);
        }
    }

    #[test]
    fn fat_family_flags_are_set() {
        assert!(find("vfat").unwrap().fat);
        assert!(find("msdos").unwrap().fat);
        assert!(!find("ext4").unwrap().fat);
    }

    #[test]
    fn upgrade_for_unrelated_type_is_none() {
        assert!(upgrade_for("ext4").is_none());
        assert!(upgrade_for("vfat").is_none());
    }
}
