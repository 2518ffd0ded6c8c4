//! Per-speaker Markov chains and text generation.
//!
//! - Weighted successor multisets (`State`)
//! - One speaker's transition table (`Chain`)
//! - The generation walk and its dead-end policy (`DeadEnd`)
//! - The per-speaker model with rebuild, merge and snapshots (`MarkovModel`)

/// Per-speaker model: ingestion, generation, parallel rebuild, snapshots.
pub mod markov_model;

/// Order-`k` transition table of a single speaker.
///
/// Maps context windows to successor multisets and keeps the weighted
/// index used to draw starting contexts.
pub mod chain;

/// Dead-end policy and the generation walk.
pub mod generator;

/// Weighted successor multiset of one context window.
pub mod state;
