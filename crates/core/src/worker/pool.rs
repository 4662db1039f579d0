//! Bounded pool of evaluator sessions
//!
//! Loading the checker into an evaluator is expensive, so sessions are kept
//! around between workers. A session is only ever used by one worker at a
//! time: it is checked out, used and checked back in.

use super::evaluator::EvaluatorFactory;
use crate::error::Result;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::debug;

/// Idle sessions older than this are dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

struct IdleSession<S> {
    session: S,
    since: Instant,
}

struct PoolState<S> {
    idle: Vec<IdleSession<S>>,
    /// Sessions in existence, idle or checked out
    live: usize,
}

pub struct SessionPool<F: EvaluatorFactory> {
    factory: F,
    max: usize,
    min_idle: usize,
    idle_timeout: Duration,
    state: Mutex<PoolState<F::Session>>,
    returned: Condvar,
}

impl<F: EvaluatorFactory> SessionPool<F> {
    /// Pool creating at most `max` sessions (at least one)
    pub fn new(factory: F, max: usize) -> Self {
        Self {
            factory,
            max: max.max(1),
            min_idle: 1,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                live: 0,
            }),
            returned: Condvar::new(),
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Number of idle sessions that survive eviction
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Sessions currently in existence
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    pub fn idle(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Rents a session: an idle one, a new one while under the bound, or
    /// otherwise the next one to be checked in
    pub fn checkout(&self) -> Result<PooledSession<'_, F>> {
        let mut state = self.state.lock();
        loop {
            self.evict(&mut state);

            if let Some(idle) = state.idle.pop() {
                return Ok(PooledSession::new(self, idle.session));
            }

            if state.live < self.max {
                state.live += 1;
                drop(state);
                debug!("Creating evaluator session");
                return match self.factory.create() {
                    Ok(session) => Ok(PooledSession::new(self, session)),
                    Err(e) => {
                        self.forget();
                        Err(e)
                    }
                };
            }

            self.returned.wait(&mut state);
        }
    }

    /// Drops idle sessions that outlived the idle timeout
    pub fn evict_expired(&self) {
        let mut state = self.state.lock();
        self.evict(&mut state);
    }

    fn evict(&self, state: &mut MutexGuard<'_, PoolState<F::Session>>) {
        let now = Instant::now();
        // oldest sessions sit at the front
        while state.idle.len() > self.min_idle
            && state
                .idle
                .first()
                .is_some_and(|idle| now.duration_since(idle.since) >= self.idle_timeout)
        {
            state.idle.remove(0);
            state.live -= 1;
            debug!("Evicted idle evaluator session");
        }
    }

    fn checkin(&self, session: F::Session) {
        let mut state = self.state.lock();
        state.idle.push(IdleSession {
            session,
            since: Instant::now(),
        });
        self.returned.notify_one();
    }

    fn forget(&self) {
        let mut state = self.state.lock();
        state.live -= 1;
        self.returned.notify_one();
    }
}

/// A rented session, returned to its pool when dropped.
///
/// A session dropped during a panic is discarded rather than reused.
pub struct PooledSession<'a, F: EvaluatorFactory> {
    pool: &'a SessionPool<F>,
    session: Option<F::Session>,
}

impl<'a, F: EvaluatorFactory> PooledSession<'a, F> {
    fn new(pool: &'a SessionPool<F>, session: F::Session) -> Self {
        Self {
            pool,
            session: Some(session),
        }
    }
}

impl<F: EvaluatorFactory> Deref for PooledSession<'_, F> {
    type Target = F::Session;

    fn deref(&self) -> &Self::Target {
        // only taken in drop
        self.session.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<F: EvaluatorFactory> DerefMut for PooledSession<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<F: EvaluatorFactory> Drop for PooledSession<'_, F> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if std::thread::panicking() {
                drop(session);
                self.pool.forget();
            } else {
                self.pool.checkin(session);
            }
        }
    }
}
