//! # Connection Pool
//!
//! Purpose: Reuse connections across lookups to avoid a connect per request,
//! while never holding more than a fixed number at once.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: A bounded set of reusable resources built by an
//!    injected [`Manager`].
//! 2. **RAII Return**: [`Pooled`] hands its resource back on drop, so every
//!    exit path releases or destroys it.
//! 3. **Cancellable Waits**: A blocked `acquire` selects over idle resources,
//!    free capacity, pool shutdown and the caller's [`Context`].
//! 4. **Minimal Locking**: The mutex guards only the live count and the
//!    closed flag; resources move through channels.
//!
//! ## Accounting
//! `capacity` slot tokens sit in a channel. Constructing a resource consumes
//! one, destroying a resource returns it. Idle resources keep their slot.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::context::Context;
use crate::error::{Error, Result};

/// Builds and tears down pooled resources
pub trait Manager: Send + Sync + 'static {
    type Resource: Send;

    /// Construct a new resource. Failures propagate to the caller of
    /// `acquire`; the pool never retries.
    fn create(&self, ctx: &Context) -> Result<Self::Resource>;

    /// Release everything the resource holds
    fn destroy(&self, resource: Self::Resource);
}

/// Snapshot of pool accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    /// Idle + acquired + under construction
    pub live: usize,
    pub idle: usize,
    pub closed: bool,
}

struct PoolState {
    live: usize,
    closed: bool,
    /// Dropped on close to wake every blocked acquirer
    shutdown: Option<Sender<()>>,
}

struct PoolInner<M: Manager> {
    manager: M,
    capacity: usize,
    state: Mutex<PoolState>,
    drained: Condvar,
    idle_tx: Sender<M::Resource>,
    idle_rx: Receiver<M::Resource>,
    slot_tx: Sender<()>,
    slot_rx: Receiver<()>,
    shutdown_rx: Receiver<()>,
}

/// Bounded pool of reusable resources
pub struct Pool<M: Manager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: Manager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Manager> Pool<M> {
    /// Creates an empty pool holding at most `capacity` resources
    pub fn new(manager: M, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (idle_tx, idle_rx) = channel::unbounded();
        let (slot_tx, slot_rx) = channel::bounded(capacity);
        for _ in 0..capacity {
            let _ = slot_tx.try_send(());
        }
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);

        Pool {
            inner: Arc::new(PoolInner {
                manager,
                capacity,
                state: Mutex::new(PoolState {
                    live: 0,
                    closed: false,
                    shutdown: Some(shutdown_tx),
                }),
                drained: Condvar::new(),
                idle_tx,
                idle_rx,
                slot_tx,
                slot_rx,
                shutdown_rx,
            }),
        }
    }

    /// Acquires a resource, constructing one if capacity allows
    ///
    /// Blocks while the pool is at capacity with nothing idle. Returns the
    /// context error as soon as `ctx` is done, and `PoolClosed` once `close`
    /// has been called.
    pub fn acquire(&self, ctx: &Context) -> Result<Pooled<M>> {
        let inner = &self.inner;
        loop {
            ctx.check()?;
            if inner.state.lock().closed {
                return Err(Error::PoolClosed);
            }

            // Prefer reuse over construction when both are possible.
            if let Ok(resource) = inner.idle_rx.try_recv() {
                return inner.checkout(resource);
            }
            if inner.slot_rx.try_recv().is_ok() {
                return inner.construct(ctx);
            }

            let expired = ctx.expired();
            crossbeam::select! {
                recv(inner.idle_rx) -> resource => {
                    if let Ok(resource) = resource {
                        return inner.checkout(resource);
                    }
                }
                recv(inner.slot_rx) -> slot => {
                    if slot.is_ok() {
                        return inner.construct(ctx);
                    }
                }
                recv(inner.shutdown_rx) -> _ => return Err(Error::PoolClosed),
                recv(ctx.cancelled()) -> _ => return Err(Error::Cancelled),
                recv(expired) -> _ => return Err(Error::DeadlineExceeded),
            }
        }
    }

    /// Closes the pool
    ///
    /// Idle resources are destroyed now; acquired ones are destroyed when they
    /// are released. Blocks until every resource is gone. Later acquires fail
    /// with `PoolClosed`.
    pub fn close(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        if !state.closed {
            state.closed = true;
            state.shutdown.take();

            let idle: Vec<_> = inner.idle_rx.try_iter().collect();
            state.live -= idle.len();
            drop(state);

            tracing::debug!("Closing pool, destroying {} idle connections", idle.len());
            for resource in idle {
                inner.manager.destroy(resource);
            }
            state = inner.state.lock();
        }

        while state.live > 0 {
            inner.drained.wait(&mut state);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            capacity: self.inner.capacity,
            live: state.live,
            idle: self.inner.idle_rx.len(),
            closed: state.closed,
        }
    }
}

impl<M: Manager> PoolInner<M> {
    fn wrap(self: &Arc<Self>, resource: M::Resource) -> Pooled<M> {
        Pooled {
            pool: self.clone(),
            resource: Some(resource),
            broken: false,
        }
    }

    fn checkout(self: &Arc<Self>, resource: M::Resource) -> Result<Pooled<M>> {
        if self.state.lock().closed {
            self.destroy(resource);
            return Err(Error::PoolClosed);
        }
        Ok(self.wrap(resource))
    }

    /// Build a resource in a slot already taken from `slot_rx`
    fn construct(self: &Arc<Self>, ctx: &Context) -> Result<Pooled<M>> {
        {
            let mut state = self.state.lock();
            if state.closed {
                let _ = self.slot_tx.try_send(());
                return Err(Error::PoolClosed);
            }
            state.live += 1;
        }

        match self.manager.create(ctx) {
            Ok(resource) => Ok(self.wrap(resource)),
            Err(e) => {
                tracing::debug!("Connection construction failed: {}", e);
                self.forget();
                Err(e)
            }
        }
    }

    fn release(&self, resource: M::Resource) {
        let state = self.state.lock();
        if state.closed {
            drop(state);
            self.destroy(resource);
            return;
        }
        // Sent under the lock so `close` cannot miss it while draining.
        let _ = self.idle_tx.send(resource);
    }

    fn destroy(&self, resource: M::Resource) {
        self.manager.destroy(resource);
        self.forget();
    }

    /// Drop one resource from accounting and free its slot
    fn forget(&self) {
        let mut state = self.state.lock();
        state.live -= 1;
        if state.live == 0 {
            self.drained.notify_all();
        }
        drop(state);
        let _ = self.slot_tx.try_send(());
    }
}

/// RAII wrapper returning a resource to the pool on drop
pub struct Pooled<M: Manager> {
    pool: Arc<PoolInner<M>>,
    resource: Option<M::Resource>,
    broken: bool,
}

impl<M: Manager> Pooled<M> {
    /// Destroy on drop instead of returning to the idle set
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Return the resource to the idle set (or destroy it if broken).
    /// Dropping the guard does the same; this just names the intent.
    pub fn release(self) {}

    /// Close the resource and free its slot; it is never reused
    pub fn destroy(mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.destroy(resource);
        }
    }
}

impl<M: Manager> fmt::Debug for Pooled<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl<M: Manager> Deref for Pooled<M> {
    type Target = M::Resource;

    fn deref(&self) -> &M::Resource {
        self.resource.as_ref().expect("pooled resource present until drop")
    }
}

impl<M: Manager> DerefMut for Pooled<M> {
    fn deref_mut(&mut self) -> &mut M::Resource {
        self.resource.as_mut().expect("pooled resource present until drop")
    }
}

impl<M: Manager> Drop for Pooled<M> {
    fn drop(&mut self) {
        let resource = match self.resource.take() {
            Some(resource) => resource,
            None => return,
        };

        if self.broken {
            self.pool.destroy(resource);
        } else {
            self.pool.release(resource);
        }
    }
}
