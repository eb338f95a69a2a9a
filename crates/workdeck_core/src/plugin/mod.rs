//! Plugin protocol and dispatch.
//!
//! # Responsibility
//! - Define the capability trait external extensions implement.
//! - Fan lifecycle events out to every registered plugin with per-plugin
//!   failure isolation.
//!
//! # Invariants
//! - A misbehaving plugin never breaks a manager operation or the other
//!   plugins; its error is logged and swallowed.
//! - Events are delivered in registration order.

pub mod protocol;
pub mod registry;
pub mod sprint;
