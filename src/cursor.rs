use std::fs;
use std::fs::DirEntry;
use std::fs::ReadDir;
use std::path::Path as StdPath;
use std::path::PathBuf;

use crate::errors::Error;

/// Forward-only position within one directory's enumeration.
///
/// The entry under the cursor is fetched ahead of time so exhaustion can be
/// checked before anything is classified. Entries come back in whatever
/// order the platform yields them.
#[derive(Debug)]
pub(crate) struct DirCursor {
    dir: PathBuf,
    entries: ReadDir,
    current: Option<DirEntry>,
}

impl DirCursor {
    /// Opens `dir` and positions the cursor on its first entry.
    pub(crate) fn open<P: AsRef<StdPath>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        let entries = fs::read_dir(&dir).map_err(|e| Error::OpenDir {
            path: dir.to_string_lossy().into_owned(),
            how: e.to_string(),
        })?;
        let mut cursor = Self {
            dir,
            entries,
            current: None,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    pub(crate) fn current(&self) -> Option<&DirEntry> {
        self.current.as_ref()
    }

    /// Moves to the next entry. Advancing an exhausted cursor is a no-op.
    pub(crate) fn advance(&mut self) -> Result<(), Error> {
        self.current = match self.entries.next() {
            Some(entry) => Some(entry.map_err(|e| Error::EntryStat {
                path: self.dir.to_string_lossy().into_owned(),
                how: e.to_string(),
            })?),
            None => None,
        };
        Ok(())
    }

    pub(crate) fn dir(&self) -> &StdPath {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::TestRoot;

    #[test]
    fn walks_every_entry_once() {
        let root = TestRoot::new().unwrap();
        let mut cursor = DirCursor::open(root.path()).unwrap();
        let mut seen = BTreeSet::new();
        while let Some(entry) = cursor.current() {
            assert!(seen.insert(entry.file_name()));
            cursor.advance().unwrap();
        }
        assert!(cursor.is_exhausted());
        assert_eq!(seen.len(), root.entry_count());

        cursor.advance().unwrap();
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn empty_directory_starts_exhausted() {
        let root = TestRoot::empty().unwrap();
        let cursor = DirCursor::open(root.path()).unwrap();
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.dir(), root.path());
    }

    #[test]
    fn missing_directory_fails_to_open() {
        let root = TestRoot::empty().unwrap();
        let err = DirCursor::open(root.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::OpenDir { .. }));
    }
}
