use std::fmt::Display;
use std::fs;
use std::fs::DirEntry;
use std::fs::FileType;
use std::fs::Metadata;
use std::path::Path as StdPath;

#[cfg(feature = "json_schema")]
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::config::ListingConfig;
use crate::errors::Error;
use crate::path::encode;
use crate::utils::format_system_time;

/// Separator between a symlink's name and its target in
/// [`EntryRecord::name`].
pub const LINK_POINTER: &str = " --> ";

/// Special file kinds that get a type tag. Everything else is untagged.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub enum SpecialKind {
    /// Block device.
    BlockDevice,
    /// Character device.
    CharDevice,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
}

impl SpecialKind {
    /// Classifies `file_type`, returning `None` for regular files,
    /// directories, symlinks and anything else that is not a special file.
    #[cfg(unix)]
    pub fn of(file_type: &FileType) -> Option<Self> {
        use std::os::unix::fs::FileTypeExt;

        if file_type.is_block_device() {
            Some(Self::BlockDevice)
        } else if file_type.is_char_device() {
            Some(Self::CharDevice)
        } else if file_type.is_fifo() {
            Some(Self::Fifo)
        } else if file_type.is_socket() {
            Some(Self::Socket)
        } else {
            None
        }
    }

    /// Special files do not exist outside of Unix.
    #[cfg(not(unix))]
    pub fn of(_file_type: &FileType) -> Option<Self> {
        None
    }

    /// Parses a tag produced by [`SpecialKind::as_str`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "S_ISBLK" => Some(Self::BlockDevice),
            "S_ISCHR" => Some(Self::CharDevice),
            "S_ISFIFO" => Some(Self::Fifo),
            "S_IFSOCK" => Some(Self::Socket),
            _ => None,
        }
    }

    /// The tag reported in the type column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockDevice => "S_ISBLK",
            Self::CharDevice => "S_ISCHR",
            Self::Fifo => "S_ISFIFO",
            Self::Socket => "S_IFSOCK",
        }
    }
}

impl Display for SpecialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified directory entry, ready to become a row.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub struct EntryRecord {
    /// `ls -l` style attribute string: directory flag followed by the
    /// owner, group and other `rwx` bits. Always 10 characters.
    pub attributes: String,
    /// Size in bytes of the status the attributes were taken from.
    pub size: i64,
    /// Last modification time, millisecond precision, with zone.
    pub modified: String,
    /// Special file tag, or `None` for ordinary entries.
    pub kind: Option<SpecialKind>,
    /// Base name. Symlinks carry `" --> "` and their unresolved target.
    pub name: String,
}

impl EntryRecord {
    /// Classifies one entry produced by `std::fs::read_dir`.
    ///
    /// Symlinks are described by their own status rather than their
    /// target's, except for the directory flag which follows the link.
    pub fn classify(entry: &DirEntry, config: &ListingConfig) -> Result<Self, Error> {
        let path = entry.path();
        let entry_type = entry.file_type().map_err(|e| stat_error(&path, e))?;
        let is_symlink = entry_type.is_symlink();

        let status = if is_symlink {
            fs::symlink_metadata(&path)
        } else {
            fs::metadata(&path)
        }
        .map_err(|e| stat_error(&path, e))?;

        // A broken link has no resolved type and is reported as a non-directory.
        let is_dir = if is_symlink {
            fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false)
        } else {
            status.is_dir()
        };

        let modified = status.modified().map_err(|e| stat_error(&path, e))?;

        let mut name = encode(entry.file_name())?;
        if is_symlink {
            let target = fs::read_link(&path).map_err(|e| stat_error(&path, e))?;
            name.push_str(LINK_POINTER);
            name.push_str(&encode(target)?);
        }

        Ok(Self {
            attributes: attribute_string(is_dir, &status),
            size: signed_size(&path, status.len())?,
            modified: format_system_time(modified, &config.time_format, config.time_zone)?,
            kind: SpecialKind::of(&status.file_type()),
            name,
        })
    }

    /// The type column as text, `None` for ordinary entries.
    pub fn kind_tag(&self) -> Option<&'static str> {
        self.kind.as_ref().map(SpecialKind::as_str)
    }
}

fn stat_error(path: &StdPath, e: std::io::Error) -> Error {
    Error::EntryStat {
        path: path.to_string_lossy().into_owned(),
        how: e.to_string(),
    }
}

fn signed_size(path: &StdPath, len: u64) -> Result<i64, Error> {
    i64::try_from(len).map_err(|_| Error::EntryStat {
        path: path.to_string_lossy().into_owned(),
        how: format!("size {len} does not fit a signed 64-bit column"),
    })
}

fn attribute_string(is_dir: bool, status: &Metadata) -> String {
    const FLAGS: [char; 3] = ['r', 'w', 'x'];

    let mode = permission_bits(status);
    let mut attributes = String::with_capacity(10);
    attributes.push(if is_dir { 'd' } else { '-' });
    for bit in 0..9 {
        let mask = 0o400 >> bit;
        attributes.push(if mode & mask != 0 { FLAGS[bit % 3] } else { '-' });
    }
    attributes
}

#[cfg(unix)]
fn permission_bits(status: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    status.permissions().mode() & 0o777
}

// Only the read-only attribute exists here; everything else reads as granted.
#[cfg(not(unix))]
fn permission_bits(status: &Metadata) -> u32 {
    if status.permissions().readonly() {
        0o555
    } else {
        0o777
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::TestRoot;

    fn classify_named(root: &TestRoot, name: &str) -> EntryRecord {
        let entry = fs::read_dir(root.path())
            .unwrap()
            .map(Result::unwrap)
            .find(|e| e.file_name() == name)
            .unwrap();
        EntryRecord::classify(&entry, &ListingConfig::default()).unwrap()
    }

    fn assert_layout(attributes: &str) {
        assert_eq!(attributes.chars().count(), 10);
        let mut chars = attributes.chars();
        assert!(matches!(chars.next(), Some('d' | '-')));
        for (i, c) in chars.enumerate() {
            assert!(c == '-' || c == ['r', 'w', 'x'][i % 3], "{attributes}");
        }
    }

    #[test]
    fn regular_file() {
        let root = TestRoot::new().unwrap();
        let record = classify_named(&root, "a.txt");
        assert_layout(&record.attributes);
        assert_eq!(record.name, "a.txt");
        assert_eq!(record.size, 10);
        assert_eq!(record.kind, None);
        assert!(record.modified.ends_with(" UTC"));
        #[cfg(unix)]
        assert_eq!(record.attributes, "-rw-r--r--");
    }

    #[test]
    fn directory() {
        let root = TestRoot::new().unwrap();
        let record = classify_named(&root, "sub");
        assert_layout(&record.attributes);
        assert!(record.attributes.starts_with('d'));
        assert_eq!(record.kind, None);
        #[cfg(unix)]
        assert_eq!(record.attributes, "drwxr-xr-x");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_reports_link_status_and_raw_target() {
        let root = TestRoot::new().unwrap();

        let record = classify_named(&root, "link-to-a");
        assert_eq!(record.name, format!("link-to-a{LINK_POINTER}a.txt"));
        // Linux reports 0o777 for symlinks regardless of the target's mode.
        #[cfg(target_os = "linux")]
        assert_eq!(record.attributes, "-rwxrwxrwx");
        assert_eq!(record.size, "a.txt".len() as i64);
        assert_eq!(record.kind, None);
    }

    #[cfg(unix)]
    #[test]
    fn broken_symlink_is_still_reported() {
        let root = TestRoot::new().unwrap();

        let record = classify_named(&root, "dangling");
        assert_eq!(record.name, format!("dangling{LINK_POINTER}missing/target"));
        assert!(record.attributes.starts_with('-'));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_directory_gets_directory_flag() {
        let root = TestRoot::new().unwrap();

        let record = classify_named(&root, "link-to-sub");
        assert!(record.attributes.starts_with('d'));
        assert!(record.name.ends_with(&format!("{LINK_POINTER}sub")));
    }

    #[cfg(unix)]
    #[test]
    fn socket_is_tagged() {
        let root = TestRoot::new().unwrap();

        let record = classify_named(&root, "control.sock");
        assert_eq!(record.kind, Some(SpecialKind::Socket));
        assert_eq!(record.kind_tag(), Some("S_IFSOCK"));
    }

    #[cfg(unix)]
    #[test]
    fn fifo_is_tagged() {
        let root = TestRoot::new().unwrap();

        let record = classify_named(&root, "pipe.fifo");
        assert_eq!(record.kind, Some(SpecialKind::Fifo));
        assert_eq!(record.kind_tag(), Some("S_ISFIFO"));
        assert!(record.attributes.starts_with('-'));
    }

    #[test]
    fn oversized_length_is_a_stat_error() {
        let path = StdPath::new("huge");
        assert_eq!(signed_size(path, 42).unwrap(), 42);
        assert_eq!(signed_size(path, i64::MAX as u64).unwrap(), i64::MAX);
        let err = signed_size(path, u64::MAX).unwrap_err();
        assert!(matches!(err, Error::EntryStat { path, .. } if path == "huge"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn char_device_is_tagged() {
        let entry = fs::read_dir("/dev")
            .unwrap()
            .map(Result::unwrap)
            .find(|e| e.file_name() == "null")
            .unwrap();
        let record = EntryRecord::classify(&entry, &ListingConfig::default()).unwrap();
        assert_eq!(record.kind, Some(SpecialKind::CharDevice));
        assert_eq!(record.kind_tag(), Some("S_ISCHR"));
    }

    #[test]
    fn vanished_entry_is_a_stat_error() {
        let root = TestRoot::new().unwrap();
        let entry = fs::read_dir(root.path())
            .unwrap()
            .map(Result::unwrap)
            .find(|e| e.file_name() == "a.txt")
            .unwrap();
        fs::remove_file(entry.path()).unwrap();

        let err = EntryRecord::classify(&entry, &ListingConfig::default()).unwrap_err();
        match err {
            Error::EntryStat { path, .. } => assert!(path.ends_with("a.txt")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn record_serializes_null_kind() {
        let record = EntryRecord {
            attributes: "-rw-r--r--".to_owned(),
            size: 10,
            modified: "01/26/18 18:30:09.453 UTC".to_owned(),
            kind: None,
            name: "a.txt".to_owned(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["kind"].is_null());
        assert_eq!(json["size"], 10);
    }
}
