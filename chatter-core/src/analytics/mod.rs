//! Streaming chat statistics and rankings.
//!
//! - Insertion-ordered counters (`Tally`)
//! - Rankable metrics and standings (`Metric`, `Standing`)
//! - The counters built from the message stream (`Aggregator`)

/// Word, like and message counters fed by ingested messages.
pub mod aggregator;
/// Leaderboard metrics and the standing of one user within them.
pub mod metric;
/// Counter that ranks keys by count and breaks ties by insertion order.
pub mod tally;
