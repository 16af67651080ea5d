//! Async access to a listing session.
//!
//! Every step runs on tokio's blocking pool so directory I/O never stalls
//! the runtime's worker threads.
use std::path::PathBuf;

use futures_lite::Stream;
use futures_lite::stream;
use log::debug;
use tokio::task;

use crate::DirLister;
use crate::EntryRecord;
use crate::Error;
use crate::SessionToken;

async fn blocking<T, F>(what: String, f: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Error> + Send + 'static,
{
    task::spawn_blocking(f).await.map_err(|e| Error::Sync {
        what,
        how: e.to_string(),
    })?
}

struct StreamState {
    lister: DirLister,
    token: SessionToken,
    finished: bool,
}

impl Drop for StreamState {
    fn drop(&mut self) {
        if !self.finished && self.lister.registry().close(self.token).is_ok() {
            debug!("{}: closed by dropped stream", self.token);
        }
    }
}

/// Streams the remaining records of an open session.
///
/// The stream ends after the last record or after the first error. Dropping
/// it early closes the session.
pub fn session_stream(
    lister: DirLister,
    token: SessionToken,
) -> impl Stream<Item = Result<EntryRecord, Error>> + Send + 'static {
    let state = StreamState {
        lister,
        token,
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        let lister = state.lister.clone();
        let token = state.token;
        match blocking(token.to_string(), move || lister.next(token)).await {
            Ok(Some(record)) => Some((Ok(record), state)),
            Ok(None) => {
                state.finished = true;
                None
            }
            Err(e) => {
                // A join failure skips the error policy applied by `next`.
                if matches!(e, Error::Sync { .. })
                    && let Err(close_err) = state.lister.registry().close(token)
                {
                    debug!("{token}: {close_err}");
                }
                state.finished = true;
                Some((Err(e), state))
            }
        }
    })
}

/// Opens `dir` and streams at most `row_limit` of its entries.
pub async fn list_dir(
    lister: DirLister,
    row_limit: i64,
    dir: PathBuf,
) -> Result<impl Stream<Item = Result<EntryRecord, Error>> + Send + 'static, Error> {
    let opener = lister.clone();
    let token = blocking(dir.display().to_string(), move || {
        opener.open(row_limit, &dir)
    })
    .await?;
    Ok(session_stream(lister, token))
}
