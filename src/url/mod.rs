//! URL handling module for Sumi-Walk
//!
//! Discovered links are canonicalized before deduplication so that trivial
//! variants of one page (fragments, tracking parameters, parameter order)
//! share a single entry in the seen filter.

mod normalize;

pub use normalize::canonicalize;
