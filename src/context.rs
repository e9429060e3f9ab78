// src/context.rs

//! Continuation contexts handed out by the host with every callback.

// dependencies
use crate::address::Address;

/// An opaque, single-use token tying a host instruction to the callback that
/// issued it.
///
/// Contexts are not `Copy`: every context-taking host operation consumes the
/// one it was given and hands back a successor. The `app` is the account the
/// host opened the frame for; the `stamp` is the host's validity marker for
/// that frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    app: Address,
    stamp: u64,
}

impl Context {
    /// Hosts mint contexts; apps only pass them along.
    pub fn new(app: Address, stamp: u64) -> Self {
        Self { app, stamp }
    }

    pub fn app(&self) -> Address {
        self.app
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}
