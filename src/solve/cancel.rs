//! Session-wide cancellation signal shared by every solve task.
//!
//! One [`CancelSource`] per session fans out to any number of
//! [`CancelToken`]s. A token reports cancellation when the source was
//! cancelled in-process *or* when one of the session's marker files exists,
//! so out-of-process solvers watching the same files and in-process solvers
//! polling the token see the same signal. Only the presence of a marker
//! matters, never its content.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::warn;

const LIVE: u8 = 0;
const SIBLING_SOLVED: u8 = 1;
const CALLER_ABORT: u8 = 2;

/// Why a session was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Another partition produced the accepted solution.
    SiblingSolved,
    /// The caller aborted the session.
    CallerAbort,
    /// The cancel marker appeared without an in-process cancel.
    Marker,
    /// The "already solved" marker appeared without an in-process cancel.
    SolvedMarker,
}

/// Cancel and "already solved" marker paths for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFiles {
    pub cancel: PathBuf,
    pub solved: PathBuf,
}

impl MarkerFiles {
    pub fn in_dir(dir: &Path, base_name: &str) -> Self {
        Self {
            cancel: dir.join(format!("{}.cancel", base_name)),
            solved: dir.join(format!("{}.solved", base_name)),
        }
    }

    /// Whether either marker exists.
    pub fn any_present(&self) -> bool {
        self.cancel.exists() || self.solved.exists()
    }

    /// Remove both markers, ignoring ones that do not exist.
    pub fn remove(&self) {
        for path in [&self.cancel, &self.solved] {
            if let Err(err) = std::fs::remove_file(path)
                && err.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %path.display(), %err, "could not remove marker file");
            }
        }
    }

    fn touch_for(&self, reason: CancelReason) {
        let path = match reason {
            CancelReason::SiblingSolved | CancelReason::SolvedMarker => &self.solved,
            CancelReason::CallerAbort | CancelReason::Marker => &self.cancel,
        };
        if let Err(err) = OpenOptions::new().create(true).append(true).open(path) {
            warn!(path = %path.display(), %err, "could not create marker file");
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    status: AtomicU8,
    markers: OnceLock<MarkerFiles>,
}

impl CancelState {
    fn reason(&self) -> Option<CancelReason> {
        match self.status.load(Ordering::SeqCst) {
            SIBLING_SOLVED => Some(CancelReason::SiblingSolved),
            CALLER_ABORT => Some(CancelReason::CallerAbort),
            _ => None,
        }
    }
}

/// Owning side of the cancellation channel.
#[derive(Debug, Clone, Default)]
pub struct CancelSource {
    state: Arc<CancelState>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token observing this source, without a deadline.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            state: Arc::clone(&self.state),
            deadline: None,
        }
    }

    /// Attach the session's marker files. Only the first call has an effect.
    ///
    /// If the source was already cancelled the matching marker is created
    /// straight away.
    pub fn attach_markers(&self, markers: MarkerFiles) -> bool {
        if self.state.markers.set(markers).is_err() {
            return false;
        }
        if let (Some(reason), Some(markers)) = (self.state.reason(), self.state.markers.get()) {
            markers.touch_for(reason);
        }
        true
    }

    pub fn markers(&self) -> Option<&MarkerFiles> {
        self.state.markers.get()
    }

    /// Broadcast cancellation. Returns `true` only for the call that
    /// actually cancelled.
    ///
    /// The marker file is created before the in-process flag is raised, so a
    /// task that wakes up on the flag always finds the marker in place.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let code = match reason {
            CancelReason::SiblingSolved | CancelReason::SolvedMarker => SIBLING_SOLVED,
            CancelReason::CallerAbort | CancelReason::Marker => CALLER_ABORT,
        };
        if let Some(markers) = self.state.markers.get() {
            markers.touch_for(reason);
        }
        self.state
            .status
            .compare_exchange(LIVE, code, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether [`CancelSource::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.state.status.load(Ordering::SeqCst) != LIVE
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.state.reason()
    }
}

/// Observing side of the cancellation channel, optionally with its own
/// deadline.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<CancelState>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never cancelled; for running a solver standalone.
    pub fn detached() -> Self {
        CancelSource::new().token()
    }

    /// Same signal, with a deadline `limit` from now (or the existing
    /// deadline if that is sooner).
    pub fn with_time_limit(&self, limit: Duration) -> Self {
        let candidate = Instant::now().checked_add(limit);
        let deadline = match (self.deadline, candidate) {
            (Some(current), Some(new)) => Some(current.min(new)),
            (current, new) => current.or(new),
        };
        Self {
            state: Arc::clone(&self.state),
            deadline,
        }
    }

    /// Cancelled in-process or by a marker file.
    pub fn is_cancelled(&self) -> bool {
        self.state.status.load(Ordering::SeqCst) != LIVE
            || self.state.markers.get().is_some_and(|m| m.any_present())
    }

    /// Past this token's own deadline.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Whether a solver holding this token should stop now.
    pub fn should_stop(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    /// Why the token is cancelled. An in-process cancel takes precedence
    /// over marker files, and the cancel marker over the solved marker.
    pub fn reason(&self) -> Option<CancelReason> {
        self.state.reason().or_else(|| {
            let markers = self.state.markers.get()?;
            if markers.cancel.exists() {
                Some(CancelReason::Marker)
            } else if markers.solved.exists() {
                Some(CancelReason::SolvedMarker)
            } else {
                None
            }
        })
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Sleep for `duration` in `poll`-sized slices, returning early (with
    /// `true`) as soon as the token says to stop.
    pub fn sleep(&self, duration: Duration, poll: Duration) -> bool {
        let end = Instant::now() + duration;
        let poll = poll.max(Duration::from_millis(1));
        loop {
            if self.should_stop() {
                return true;
            }
            let now = Instant::now();
            if now >= end {
                return false;
            }
            std::thread::sleep(poll.min(end - now));
        }
    }
}
