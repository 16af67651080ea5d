use std::collections::BTreeSet;
use std::fs;
use std::path::Path as StdPath;

use tempdir::TempDir;

use crate::Error;

// Relative path, contents and mode of the regular files and directories
// created by `TestRoot::new`. Directories have `None` contents.
static TEMP_FILES: &[(&str, Option<&str>, u32)] = &[
    ("a.txt", Some("0123456789"), 0o644),
    ("sub", None, 0o755),
    ("sub/inner.txt", Some("inner"), 0o600),
];

// Symlinks created by `TestRoot::new`, name and raw target.
#[cfg(unix)]
static TEMP_LINKS: &[(&str, &str)] = &[
    ("link-to-a", "a.txt"),
    ("link-to-sub", "sub"),
    ("dangling", "missing/target"),
];

#[cfg(unix)]
const SOCKET_NAME: &str = "control.sock";

#[cfg(unix)]
const FIFO_NAME: &str = "pipe.fifo";

/// Temporary directory populated with entries of every kind the listing
/// distinguishes.
#[derive(Debug)]
pub struct TestRoot {
    /// Root of the temporary test directory.
    pub root: TempDir,
    names: BTreeSet<String>,
}

fn create_error(what: &StdPath, e: std::io::Error) -> Error {
    Error::Sync {
        what: format!("creating {}", what.display()),
        how: e.to_string(),
    }
}

impl TestRoot {
    /// Creates an empty temporary directory.
    pub fn empty() -> Result<Self, Error> {
        let root = TempDir::new("dirstream").map_err(|e| create_error(StdPath::new("tmp"), e))?;
        Ok(Self {
            root,
            names: BTreeSet::new(),
        })
    }

    /// Creates a directory holding `a.txt` (10 bytes, mode 644), `sub/`
    /// (mode 755) and, on Unix, symlinks to both, a dangling symlink, a
    /// socket and a named pipe.
    pub fn new() -> Result<Self, Error> {
        let mut ret = Self::empty()?;
        for (relative_path, contents, mode) in TEMP_FILES {
            let full_path = ret.path().join(relative_path);
            let created = match contents {
                Some(contents) => fs::write(&full_path, contents),
                None => fs::create_dir(&full_path),
            };
            created.map_err(|e| create_error(&full_path, e))?;
            set_mode(&full_path, *mode)?;
            ret.track(relative_path);
        }
        #[cfg(unix)]
        {
            for (name, target) in TEMP_LINKS {
                let link = ret.path().join(name);
                std::os::unix::fs::symlink(target, &link).map_err(|e| create_error(&link, e))?;
                ret.track(name);
            }
            // The socket file outlives the listener.
            let socket = ret.path().join(SOCKET_NAME);
            std::os::unix::net::UnixListener::bind(&socket)
                .map_err(|e| create_error(&socket, e))?;
            ret.track(SOCKET_NAME);

            let fifo = ret.path().join(FIFO_NAME);
            let status = std::process::Command::new("mkfifo")
                .arg(&fifo)
                .status()
                .map_err(|e| create_error(&fifo, e))?;
            if !status.success() {
                return Err(Error::Sync {
                    what: format!("creating {}", fifo.display()),
                    how: format!("mkfifo exited with {status}"),
                });
            }
            ret.track(FIFO_NAME);
        }
        Ok(ret)
    }

    /// Creates a directory holding `count` regular files `f0`, `f1`, ...
    pub fn with_files(count: usize) -> Result<Self, Error> {
        Self::with_prefixed_files("f", count)
    }

    /// Creates a directory holding `count` regular files named
    /// `{prefix}0`, `{prefix}1`, ...
    pub fn with_prefixed_files(prefix: &str, count: usize) -> Result<Self, Error> {
        let mut ret = Self::empty()?;
        for i in 0..count {
            let name = format!("{prefix}{i}");
            let full_path = ret.path().join(&name);
            fs::write(&full_path, name.as_bytes()).map_err(|e| create_error(&full_path, e))?;
            ret.track(&name);
        }
        Ok(ret)
    }

    fn track(&mut self, relative_path: &str) {
        if !relative_path.contains('/') {
            self.names.insert(relative_path.to_owned());
        }
    }

    /// Path of the temporary directory.
    pub fn path(&self) -> &StdPath {
        self.root.path()
    }

    /// Base names of the entries directly under the root.
    pub fn names(&self) -> BTreeSet<String> {
        self.names.clone()
    }

    /// Number of entries directly under the root.
    pub fn entry_count(&self) -> usize {
        self.names.len()
    }
}

#[cfg(unix)]
fn set_mode(path: &StdPath, mode: u32) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| create_error(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &StdPath, _mode: u32) -> Result<(), Error> {
    Ok(())
}
