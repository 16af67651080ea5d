use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::Path as StdPath;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::TryLockError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use log::debug;
use log::warn;
use lru::LruCache;
#[cfg(feature = "json_schema")]
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::cursor::DirCursor;
use crate::errors::Error;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

static GLOBAL: LazyLock<Arc<SessionRegistry>> =
    LazyLock::new(|| Arc::new(SessionRegistry::new()));

/// Opaque identity of one directory listing, stable across all the calls
/// that make it up. Tokens are never reused within a process.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Issues a token that no other session in this process has used.
    pub fn issue() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// State that must outlive a single call: the cursor plus the row budget.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) cursor: DirCursor,
    pub(crate) row_limit: u64,
    pub(crate) produced: u64,
}

impl Session {
    pub(crate) fn has_more(&self) -> bool {
        !self.cursor.is_exhausted() && self.produced < self.row_limit
    }
}

type SharedSession = Arc<Mutex<Session>>;

/// Thread-safe map from [`SessionToken`] to the directory cursor it owns.
///
/// The map lock is held only for lookup, insert and removal; directory I/O
/// always happens outside of it. Each session additionally sits behind its
/// own lock so that two calls racing on one token are detected instead of
/// interleaving on the cursor.
pub struct SessionRegistry {
    sessions: Mutex<LruCache<SessionToken, SharedSession>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Creates a registry that never evicts. Sessions abandoned by callers
    /// stay registered until process exit.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Creates a registry holding at most `capacity` sessions. Registering
    /// one more evicts the least recently used session.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The process-wide registry. Starts empty; never torn down.
    pub fn global() -> Arc<SessionRegistry> {
        GLOBAL.clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<SessionToken, SharedSession>>, Error> {
        self.sessions.lock().map_err(|e| Error::Sync {
            what: "session registry".into(),
            how: e.to_string(),
        })
    }

    /// Opens a cursor over `dir` and registers it under `token`.
    pub(crate) fn open(
        &self,
        token: SessionToken,
        dir: &StdPath,
        row_limit: u64,
    ) -> Result<(), Error> {
        let session = Session {
            cursor: DirCursor::open(dir)?,
            row_limit,
            produced: 0,
        };

        let evicted = {
            let mut sessions = self.lock()?;
            if sessions.contains(&token) {
                return Err(Error::DuplicateSession(token));
            }
            sessions.push(token, Arc::new(Mutex::new(session)))
        };
        debug!("{token}: opened {} (limit {row_limit})", dir.display());
        if let Some((victim, _)) = evicted {
            warn!("{victim}: evicted from full session registry");
        }
        Ok(())
    }

    /// Looks up the session registered under `token`.
    pub(crate) fn get(&self, token: SessionToken) -> Result<SharedSession, Error> {
        self.lock()?
            .get(&token)
            .cloned()
            .ok_or(Error::UnknownSession(token))
    }

    /// Removes and drops the session registered under `token`.
    pub fn close(&self, token: SessionToken) -> Result<(), Error> {
        let session = self.lock()?.pop(&token);
        match session {
            Some(_) => {
                debug!("{token}: closed");
                Ok(())
            }
            None => Err(Error::UnknownSession(token)),
        }
    }

    /// Whether `token` names a live session.
    pub fn contains(&self, token: SessionToken) -> Result<bool, Error> {
        Ok(self.lock()?.contains(&token))
    }

    /// Number of live sessions.
    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.lock()?.len())
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.lock()?.is_empty())
    }
}

/// Takes exclusive use of a session for the duration of one call.
pub(crate) fn acquire(
    token: SessionToken,
    session: &SharedSession,
) -> Result<MutexGuard<'_, Session>, Error> {
    session.try_lock().map_err(|e| match e {
        TryLockError::WouldBlock => Error::SessionBusy(token),
        TryLockError::Poisoned(e) => Error::Sync {
            what: format!("{token}"),
            how: e.to_string(),
        },
    })
}
