//! Shared wire types and small pure utilities for the flag farm.
//!
//! Anything that crosses a process boundary (HTTP request/response bodies,
//! the upstream game-system wire shapes) or that both the server and the
//! client need to agree on without importing each other lives here.

pub mod defaults;
pub mod naming;
pub mod teams;
pub mod types;

pub use types::{Flag, FlagStatus, Verdict, VerdictStatus};
