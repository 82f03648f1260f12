//! Connection pool: bounded free/used/terminated sets with fair,
//! notify-based acquisition, idle recycling and a graceful/forced shutdown
//! lifecycle.

use std::collections::{HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::opts::{ConnectOpts, PoolOpts};

/// A pool of reusable sessions.
///
/// At every instant `|free| + |used| + acquiring <= maxsize`, and a session
/// belongs to at most one of the free, used and terminated sets.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    conn_opts: ConnectOpts,
    opts: PoolOpts,
    state: Mutex<PoolState>,
    cond: Notify,
}

#[derive(Default)]
struct PoolState {
    free: VecDeque<Connection>,
    used: HashSet<u64>,
    terminated: HashSet<u64>,
    acquiring: usize,
    next_id: u64,
    closing: bool,
    closed: bool,
}

impl PoolState {
    fn size(&self) -> usize {
        self.free.len() + self.used.len() + self.acquiring
    }
}

fn lock(inner: &PoolInner) -> MutexGuard<'_, PoolState> {
    inner.state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Pool {
    /// Create a pool and establish `minsize` connections.
    pub async fn connect(conn_opts: ConnectOpts, opts: PoolOpts) -> Result<Self> {
        conn_opts.validate()?;
        opts.validate()?;
        let pool = Self {
            inner: Arc::new(PoolInner {
                conn_opts,
                opts,
                state: Mutex::new(PoolState::default()),
                cond: Notify::new(),
            }),
        };
        pool.fill_free(false).await?;
        Ok(pool)
    }

    pub fn minsize(&self) -> usize {
        self.inner.opts.minsize
    }

    pub fn maxsize(&self) -> usize {
        self.inner.opts.maxsize
    }

    /// free + used + in-progress connection count.
    pub fn size(&self) -> usize {
        lock(&self.inner).size()
    }

    pub fn freesize(&self) -> usize {
        lock(&self.inner).free.len()
    }

    pub fn closed(&self) -> bool {
        lock(&self.inner).closed
    }

    /// Take a session out of the pool, waiting for one when the pool is at
    /// capacity.
    pub async fn acquire(&self) -> Result<PooledConn> {
        loop {
            {
                let state = lock(&self.inner);
                if state.closing || state.closed {
                    return Err(Error::Interface(
                        "Cannot acquire connection after closing pool".into(),
                    ));
                }
            }
            self.fill_free(true).await?;

            let notified = self.inner.cond.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = lock(&self.inner);
                if let Some(conn) = state.free.pop_front() {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.used.insert(id);
                    if self.inner.opts.echo {
                        debug!(id, free = state.free.len(), "connection acquired");
                    }
                    return Ok(PooledConn {
                        conn: Some(conn),
                        id,
                        pool: self.inner.clone(),
                    });
                }
            }
            // woken on every release and on new-connection completion
            notified.as_mut().await;
        }
    }

    /// Return a session to the pool. Dropping the [`PooledConn`] does the
    /// same; this form only makes the hand-back explicit.
    pub fn release(&self, conn: PooledConn) {
        drop(conn);
    }

    /// Sweep the free list once, then grow to `minsize` (and, when
    /// `override_min` is set and the free list is empty, by one more up to
    /// `maxsize`).
    async fn fill_free(&self, override_min: bool) -> Result<()> {
        let recycle = self.inner.opts.pool_recycle;
        {
            let mut state = lock(&self.inner);
            let swept = state.free.len();
            for _ in 0..swept {
                let Some(conn) = state.free.pop_back() else {
                    break;
                };
                if !conn.connected() || conn.pending_result() {
                    debug!("dropping dead pooled connection");
                } else if recycle.is_some_and(|r| conn.last_usage().elapsed() >= r) {
                    debug!("recycling connection past its idle deadline");
                } else {
                    state.free.push_front(conn);
                }
            }
        }

        loop {
            {
                let mut state = lock(&self.inner);
                if state.closing || state.size() >= self.inner.opts.minsize {
                    break;
                }
                state.acquiring += 1;
            }
            self.open_one().await?;
        }

        if override_min {
            let should_open = {
                let mut state = lock(&self.inner);
                let open = !state.closing
                    && state.free.is_empty()
                    && state.size() < self.inner.opts.maxsize;
                if open {
                    state.acquiring += 1;
                }
                open
            };
            if should_open {
                self.open_one().await?;
            }
        }
        Ok(())
    }

    /// Establish one connection; `acquiring` was already incremented.
    async fn open_one(&self) -> Result<()> {
        let connected = Connection::connect(self.inner.conn_opts.clone()).await;
        let mut state = lock(&self.inner);
        state.acquiring -= 1;
        let result = match connected {
            Ok(conn) => {
                if self.inner.opts.echo {
                    debug!(size = state.size() + 1, "opened pool connection");
                }
                state.free.push_back(conn);
                Ok(())
            }
            Err(e) => Err(e),
        };
        drop(state);
        self.inner.cond.notify_waiters();
        result
    }

    /// Close all free connections, leaving handed-out sessions alone.
    pub async fn clear(&self) {
        let free: Vec<Connection> = {
            let mut state = lock(&self.inner);
            state.free.drain(..).collect()
        };
        for mut conn in free {
            let _ = conn.ensure_closed().await;
        }
        self.inner.cond.notify_waiters();
    }

    /// Stop handing out sessions; released ones are closed instead of
    /// returned.
    pub fn close(&self) {
        let mut state = lock(&self.inner);
        if state.closed {
            return;
        }
        state.closing = true;
        drop(state);
        self.inner.cond.notify_waiters();
    }

    /// `close()` plus setting every handed-out session aside for a forced
    /// close on release.
    pub fn terminate(&self) {
        self.close();
        let mut state = lock(&self.inner);
        let ids: Vec<u64> = state.used.drain().collect();
        for id in ids {
            state.terminated.insert(id);
        }
        drop(state);
        self.inner.cond.notify_waiters();
    }

    /// Wait until every session has been returned and closed. Must follow
    /// `close()`.
    pub async fn wait_closed(&self) -> Result<()> {
        {
            let state = lock(&self.inner);
            if state.closed {
                return Ok(());
            }
            if !state.closing {
                return Err(Error::Interface(
                    "wait_closed() should be called after close()".into(),
                ));
            }
        }

        loop {
            let notified = self.inner.cond.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (to_close, done) = {
                let mut state = lock(&self.inner);
                let to_close: Vec<Connection> = state.free.drain(..).collect();
                let done = state.used.is_empty()
                    && state.terminated.is_empty()
                    && state.acquiring == 0;
                if done && to_close.is_empty() {
                    state.closed = true;
                }
                (to_close, done)
            };
            for mut conn in to_close {
                let _ = conn.ensure_closed().await;
            }
            if done {
                if !lock(&self.inner).closed {
                    // free list was non-empty this round; re-check
                    continue;
                }
                return Ok(());
            }
            notified.as_mut().await;
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner);
        f.debug_struct("Pool")
            .field("free", &state.free.len())
            .field("used", &state.used.len())
            .field("acquiring", &state.acquiring)
            .field("closing", &state.closing)
            .finish()
    }
}

/// A session checked out of the pool. Dropping it hands the session back:
/// healthy idle sessions return to the free list; sessions inside a
/// transaction, with an undrained result, or abandoned mid-operation are
/// closed instead.
pub struct PooledConn {
    conn: Option<Connection>,
    id: u64,
    pool: Arc<PoolInner>,
}

impl std::fmt::Debug for PooledConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConn").field("id", &self.id).finish()
    }
}

impl PooledConn {
    /// Take the session out of the pool's accounting entirely.
    pub fn detach(mut self) -> Connection {
        let conn = self.conn.take();
        let mut state = lock(&self.pool);
        state.terminated.remove(&self.id);
        state.used.remove(&self.id);
        drop(state);
        self.pool.cond.notify_waiters();
        conn.expect("pooled connection already detached")
    }
}

impl Deref for PooledConn {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("pooled connection already released")
    }
}

impl DerefMut for PooledConn {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("pooled connection already released")
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        let conn = self.conn.take();
        let echo = self.pool.opts.echo;
        let mut state = lock(&self.pool);

        if state.terminated.remove(&self.id) {
            // forced close during terminate(); drop silently
        } else if state.used.remove(&self.id) {
            if let Some(mut conn) = conn {
                if conn.connected() {
                    if state.closing {
                        conn.close();
                    } else if conn.get_transaction_status() || conn.pending_result() {
                        // unknown protocol or transaction position: poisoned
                        warn!(id = self.id, "closing released connection in unclean state");
                        conn.close();
                    } else {
                        if echo {
                            debug!(id = self.id, "connection released");
                        }
                        state.free.push_back(conn);
                    }
                }
            }
        }

        drop(state);
        self.pool.cond.notify_waiters();
    }
}
