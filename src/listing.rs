use std::path::Path as StdPath;
use std::sync::Arc;

use log::debug;
use log::trace;
use log::warn;

use crate::config::ErrorPolicy;
use crate::config::ListingConfig;
use crate::entry::EntryRecord;
use crate::errors::Error;
use crate::registry::SessionRegistry;
use crate::registry::SessionToken;
use crate::registry::acquire;
use crate::row::FieldBuffer;
use crate::row::TupleSink;
use crate::row::check_descriptor;

/// Drives directory listing sessions, one entry per call.
///
/// A session is opened once, then advanced by repeated calls to
/// [`DirLister::next`] or [`DirLister::next_row`] until they report the end
/// of data, at which point the session is already gone from the registry.
///
/// Calls on *different* sessions may run concurrently. Calls on the same
/// session must be serialized by the caller; a call that races another one
/// on the same token fails with [`Error::SessionBusy`].
#[derive(Clone)]
pub struct DirLister {
    registry: Arc<SessionRegistry>,
    config: ListingConfig,
}

impl DirLister {
    /// Lister backed by the process-wide registry, using default settings.
    pub fn global() -> Self {
        Self::new(SessionRegistry::global(), ListingConfig::default())
    }

    /// Lister sharing `registry` with whoever else holds it.
    /// `config.registry_capacity` is ignored; the registry is already built.
    pub fn new(registry: Arc<SessionRegistry>, config: ListingConfig) -> Self {
        Self { registry, config }
    }

    /// Lister with a private registry sized by `config.registry_capacity`.
    pub fn with_config(config: ListingConfig) -> Self {
        let registry = match config.registry_capacity {
            Some(capacity) => SessionRegistry::with_capacity(capacity),
            None => SessionRegistry::new(),
        };
        Self::new(Arc::new(registry), config)
    }

    /// The registry owning this lister's cursors.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Settings applied to every session.
    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    /// Opens a session over `dir` that yields at most `row_limit` entries.
    pub fn open<P: AsRef<StdPath>>(&self, row_limit: i64, dir: P) -> Result<SessionToken, Error> {
        let row_limit = u64::try_from(row_limit).map_err(|_| {
            Error::InvalidArgument(format!("row limit must not be negative, got {row_limit}"))
        })?;
        let token = SessionToken::issue();
        self.registry.open(token, dir.as_ref(), row_limit)?;
        Ok(token)
    }

    /// Classifies the entry under the session's cursor and advances it.
    ///
    /// Returns `Ok(None)` once the directory is exhausted or the row limit
    /// is reached; the session is closed by that call and `token` becomes
    /// unknown.
    pub fn next(&self, token: SessionToken) -> Result<Option<EntryRecord>, Error> {
        self.guarded(token, || self.step(token, Ok))
    }

    /// Like [`DirLister::next`], handing the record to `sink` as one row.
    ///
    /// The cursor only moves once `sink` has accepted the row.
    pub fn next_row<S: TupleSink>(
        &self,
        token: SessionToken,
        sink: &mut S,
    ) -> Result<Option<S::Row>, Error> {
        self.guarded(token, || {
            self.step(token, |record| {
                let fields = FieldBuffer::fill(record)?;
                sink.form_row(fields.values(), fields.nulls())
            })
        })
    }

    fn step<T>(
        &self,
        token: SessionToken,
        emit: impl FnOnce(EntryRecord) -> Result<T, Error>,
    ) -> Result<Option<T>, Error> {
        let shared = self.registry.get(token)?;
        let row = {
            let mut session = acquire(token, &shared)?;
            let row = match session.cursor.current() {
                Some(entry) if session.has_more() => {
                    let record = EntryRecord::classify(entry, &self.config)?;
                    trace!("{token}: {} in {}", record.name, session.cursor.dir().display());
                    Some(emit(record)?)
                }
                _ => None,
            };
            if row.is_some() {
                session.cursor.advance()?;
                session.produced += 1;
            }
            row
        };

        if row.is_none() {
            drop(shared);
            self.finish(token)?;
        }
        Ok(row)
    }

    /// Closes a session that has nothing left to do. A session already
    /// evicted from a full registry counts as closed.
    fn finish(&self, token: SessionToken) -> Result<(), Error> {
        match self.registry.close(token) {
            Err(Error::UnknownSession(_)) => {
                debug!("{token}: already gone from the registry");
                Ok(())
            }
            closed => closed,
        }
    }

    /// Runs one call, applying the error policy if it fails.
    fn guarded<T>(
        &self,
        token: SessionToken,
        call: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        call().inspect_err(|err| self.abandon(token, err))
    }

    fn abandon(&self, token: SessionToken, err: &Error) {
        // Neither error leaves this call owning the session.
        if matches!(err, Error::UnknownSession(_) | Error::SessionBusy(_)) {
            debug!("{token}: {err}");
            return;
        }
        match self.config.error_policy {
            ErrorPolicy::Evict => match self.registry.close(token) {
                Ok(()) => warn!("{token}: evicted after error: {err}"),
                Err(close_err) => debug!("{token}: {err}; {close_err}"),
            },
            ErrorPolicy::Preserve => warn!("{token}: kept for retry after error: {err}"),
        }
    }
}

/// Where one logical listing is in its lifecycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// No call has been made yet.
    #[default]
    Uninitialized,
    /// A session is open and may have more rows.
    Active(SessionToken),
    /// The listing ended, normally or through an error.
    Done,
}

/// Result of one [`ListingCall::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next<R> {
    /// One more row.
    Row(R),
    /// No more rows; the session is finished.
    Done,
}

/// Host-side state of one set-returning call sequence.
///
/// Mirrors a host that calls the same function repeatedly with the same
/// arguments: the first call opens the session, the following ones only
/// advance it and ignore their arguments.
#[derive(Debug, Default)]
pub struct ListingCall {
    state: CallState,
}

impl ListingCall {
    /// A call sequence that has not started yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Token of the open session, if any.
    pub fn token(&self) -> Option<SessionToken> {
        match self.state {
            CallState::Active(token) => Some(token),
            _ => None,
        }
    }

    /// Produces the next row of the listing of `dir`.
    ///
    /// `row_limit` and `dir` are consulted on the first call only. Any error
    /// ends the sequence and closes its session whatever the lister's
    /// [`ErrorPolicy`]; later calls report [`Next::Done`].
    pub fn invoke<P: AsRef<StdPath>, S: TupleSink>(
        &mut self,
        lister: &DirLister,
        row_limit: i64,
        dir: P,
        sink: &mut S,
    ) -> Result<Next<S::Row>, Error> {
        let token = match self.state {
            CallState::Done => return Ok(Next::Done),
            CallState::Active(token) => token,
            CallState::Uninitialized => {
                let opened = check_descriptor(sink.descriptor())
                    .and_then(|()| lister.open(row_limit, dir.as_ref()));
                match opened {
                    Ok(token) => {
                        self.state = CallState::Active(token);
                        token
                    }
                    Err(e) => {
                        self.state = CallState::Done;
                        return Err(e);
                    }
                }
            }
        };

        match lister.next_row(token, sink) {
            Ok(Some(row)) => Ok(Next::Row(row)),
            Ok(None) => {
                self.state = CallState::Done;
                Ok(Next::Done)
            }
            Err(e) => {
                // Nobody can reach the token once the call is done.
                if let Err(close_err) = lister.finish(token) {
                    debug!("{token}: {close_err}");
                }
                self.state = CallState::Done;
                Err(e)
            }
        }
    }
}
