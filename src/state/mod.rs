//! State module for tracking walk progress
//!
//! # Components
//!
//! - `PoolState`: lifecycle of the worker pool (running, draining, terminated)

mod pool_state;

pub use pool_state::PoolState;
