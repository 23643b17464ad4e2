//! One-shot interest bookkeeping for live connections.
//!
//! Every accepted connection gets a [`Token`] and an [`Interest`]. A
//! connection is either *armed* (the event loop is waiting for a single
//! readiness notification on it) or *dispatched* (a worker owns it). The only
//! legal transitions are:
//!
//! ```text
//! register -> Armed --dispatch--> Dispatched --rearm--> Armed
//!                                     |
//!                                     +--deregister--> (gone)
//! ```
//!
//! The event loop owns the registry outright; workers report back through
//! their return value, so no locking is involved.

use std::collections::HashMap;
use std::fmt;

use crate::server::error::RegistryError;

/// Identifies one accepted connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the event loop currently expects from a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Waiting for exactly one readiness notification.
    Armed,
    /// Owned by a worker; no notification may be delivered.
    Dispatched,
}

/// Interest table for every live connection.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<Token, Interest>,
    next: u64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted connection in the armed state.
    pub fn register(&mut self) -> Token {
        let token = Token(self.next);
        self.next += 1;
        self.entries.insert(token, Interest::Armed);
        token
    }

    /// Hand an armed connection to a worker.
    pub fn dispatch(&mut self, token: Token) -> Result<(), RegistryError> {
        match self.entries.get_mut(&token) {
            Some(interest) if *interest == Interest::Armed => {
                *interest = Interest::Dispatched;
                Ok(())
            }
            Some(_) => Err(RegistryError::AlreadyDispatched(token)),
            None => Err(RegistryError::UnknownToken(token)),
        }
    }

    /// Arm a dispatched connection for one more notification.
    pub fn rearm(&mut self, token: Token) -> Result<(), RegistryError> {
        match self.entries.get_mut(&token) {
            Some(interest) if *interest == Interest::Dispatched => {
                *interest = Interest::Armed;
                Ok(())
            }
            Some(_) => Err(RegistryError::AlreadyArmed(token)),
            None => Err(RegistryError::UnknownToken(token)),
        }
    }

    /// Forget a connection. Armed connections may be dropped during shutdown.
    pub fn deregister(&mut self, token: Token) -> Result<Interest, RegistryError> {
        self.entries.remove(&token).ok_or(RegistryError::UnknownToken(token))
    }

    /// Current interest of a connection, if it is registered.
    pub fn interest(&self, token: Token) -> Option<Interest> {
        self.entries.get(&token).copied()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of connections currently owned by workers.
    pub fn dispatched(&self) -> usize {
        self.entries.values().filter(|i| **i == Interest::Dispatched).count()
    }
}
