//! Control panel for a remote VWAP trading strategy engine.
//!
//! The engine itself (order execution, VWAP computation) runs elsewhere and
//! is reached only through its REST API. This crate keeps a local view of
//! the engine's state fresh via periodic polling, lets an operator start and
//! stop the strategy, and serves the operator-facing dashboard.

pub mod client;
pub mod config;
pub mod controller;
pub mod panel;
