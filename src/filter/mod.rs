//! Deduplication of discovered URLs
//!
//! The walker consults a [`SeenFilter`] before resubmitting any discovered
//! URL. The filter is a Bloom filter: it can wrongly report an unseen URL as
//! seen (bounded by the configured rate) but never forgets a recorded one.

mod bloom;

pub use bloom::SeenFilter;
