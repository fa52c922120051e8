//! Cancellation Context
//!
//! A cheap, cloneable scope carrying a cancellation signal and an optional
//! deadline. Every blocking operation in the crate takes a `&Context` and
//! checks it at call boundaries.
//!
//! ## Design
//! - Cancellation is signalled by dropping the sender half of a crossbeam
//!   channel, so any number of waiters can `select!` on `cancelled()` and wake
//!   the moment it fires.
//! - Deadlines are exposed as `crossbeam::channel::at` timers for the same
//!   reason.
//! - Children inherit the parent's deadline (never extending it) and are
//!   cancelled when the parent is cancelled.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::error::{Error, Result};

struct Token {
    /// Dropped on cancel, which disconnects `receiver`
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
    children: Mutex<Vec<Weak<Token>>>,
}

impl Token {
    fn new() -> Arc<Self> {
        let (sender, receiver) = channel::bounded(0);
        Arc::new(Token {
            sender: Mutex::new(Some(sender)),
            receiver,
            children: Mutex::new(Vec::new()),
        })
    }

    fn child(self: &Arc<Self>) -> Arc<Self> {
        let child = Token::new();
        let mut children = self.children.lock();
        if self.is_cancelled() {
            drop(children);
            child.cancel();
        } else {
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child));
        }
        child
    }

    fn is_cancelled(&self) -> bool {
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    fn cancel(&self) {
        // Sender is dropped under the children lock so `child()` either sees
        // the cancellation or registers before the cascade.
        let children = {
            let mut children = self.children.lock();
            self.sender.lock().take();
            std::mem::take(&mut *children)
        };
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// Cancellation and deadline scope for blocking operations
#[derive(Clone)]
pub struct Context {
    token: Arc<Token>,
    deadline: Option<Instant>,
}

/// Handle that cancels the [`Context`] it was created with, and every
/// context derived from it.
#[derive(Clone)]
pub struct CancelHandle {
    token: Arc<Token>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Context {
            token: Token::new(),
            deadline: None,
        }
    }

    /// Derive a child that can be cancelled independently of `self`
    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let token = self.token.child();
        let ctx = Context {
            token: token.clone(),
            deadline: self.deadline,
        };
        (ctx, CancelHandle { token })
    }

    /// Derive a child that expires at `deadline` (or earlier if `self` does)
    pub fn with_deadline(&self, deadline: Instant) -> (Context, CancelHandle) {
        let (mut ctx, handle) = self.with_cancel();
        ctx.deadline = Some(match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        });
        (ctx, handle)
    }

    /// Derive a child that expires `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> (Context, CancelHandle) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The reason this context is done, or `None` while it is still live.
    ///
    /// Explicit cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Ok(())` while live, otherwise the cancellation error
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Disconnects when the context is cancelled. Never yields a message.
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.token.receiver
    }

    /// Fires once at the deadline; never fires without one
    pub fn expired(&self) -> Receiver<Instant> {
        match self.deadline {
            Some(deadline) => channel::at(deadline),
            None => channel::never(),
        }
    }

    /// Block until the context is done and return why.
    ///
    /// Blocks forever on a background context.
    pub fn done(&self) -> Error {
        let expired = self.expired();
        crossbeam::select! {
            recv(self.cancelled()) -> _ => {}
            recv(expired) -> _ => {}
        }
        self.err().unwrap_or(Error::Cancelled)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
