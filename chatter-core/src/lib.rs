//! Speaker-style text generation and chat statistics.
//!
//! This crate turns a stream of chat messages into:
//! - Per-speaker order-`k` Markov chains weighted by likes, used to generate
//!   text in a speaker's style
//! - Streaming statistics (word frequency, likes given/received, self-likes,
//!   like/message ratio) with rankings
//!
//! Both consumers are fed by the ingestion `Engine`, which delivers each
//! message once. Everything is explicit owned state: no process-wide globals.

/// Error taxonomy and the crate `Result` alias.
pub mod error;

/// Settings loaded from TOML.
pub mod config;

/// Chat message record and identifiers.
pub mod message;

/// Text normalization and stopwords.
pub mod tokenizer;

/// Per-speaker Markov chains and generation.
pub mod model;

/// Streaming statistics and rankings.
pub mod analytics;

/// User id ↔ display name lookup.
pub mod directory;

/// Message sources (in-memory, JSON lines).
pub mod source;

/// Ingestion driver owning the model and the aggregator.
pub mod ingest;

/// I/O utilities (line reading, snapshot paths).
///
/// Not exposed
pub(crate) mod io;

pub use analytics::aggregator::Aggregator;
pub use analytics::metric::{LikeSummary, Metric, Standing};
pub use config::Config;
pub use error::{ChatError, Result};
pub use ingest::{Engine, IngestReport, Ingested};
pub use message::{Message, MessageId, UserId};
pub use model::generator::DeadEnd;
pub use model::markov_model::MarkovModel;
pub use tokenizer::{Token, Tokenizer};
