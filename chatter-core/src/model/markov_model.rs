use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chain::Chain;
use super::generator::{DeadEnd, walk};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::io::snapshot_path;
use crate::message::{Message, UserId};
use crate::source::{JsonlSource, MessageSource};
use crate::tokenizer::{Token, Tokenizer};

/// Per-speaker order-`k` Markov model built from a message stream.
///
/// This struct manages:
/// - `chains`: one transition table per speaker
/// - `tokenizer`: how message text becomes tokens (stopwords are kept)
/// - `order`: the chain order `k`, fixed for the lifetime of the model
///
/// A model is only ever extended. Changing `k` means building a new one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MarkovModel {
	order: usize,
	tokenizer: Tokenizer,
	chains: HashMap<UserId, Chain>,
}

impl MarkovModel {
	/// Creates an empty model of order `order`.
	///
	/// # Errors
	/// `InvalidConfiguration` if `order == 0`.
	pub fn new(order: usize, tokenizer: Tokenizer) -> Result<Self> {
		if order == 0 {
			return Err(ChatError::InvalidConfiguration("chain order must be >= 1".to_owned()));
		}
		Ok(Self { order, tokenizer, chains: HashMap::new() })
	}

	/// Creates an empty model from the shared settings.
	pub fn from_config(config: &Config) -> Result<Self> {
		config.validate()?;
		Self::new(config.order, config.tokenizer())
	}

	/// Loads the model for a JSONL corpus, using the binary snapshot when one
	/// exists for the configured order.
	///
	/// - Snapshot path: `<corpus stem>.k<order>.bin` next to the corpus.
	/// - A snapshot of another order or tokenizer is ignored and replaced.
	/// - Otherwise the corpus is read, the model rebuilt and the snapshot written.
	pub fn open<P: AsRef<Path>>(corpus: P, config: &Config) -> Result<Self> {
		let snapshot = snapshot_path(&corpus, config.order)?;
		if snapshot.exists() {
			let model = Self::load(&snapshot)?;
			if model.order == config.order && model.tokenizer == config.tokenizer() {
				info!("loaded model snapshot {}", snapshot.display());
				return Ok(model);
			}
			warn!("snapshot {} does not match the configuration, rebuilding", snapshot.display());
		}

		let messages = JsonlSource::new(corpus.as_ref()).messages()?;
		let mut model = Self::from_config(config)?;
		if config.parallel_rebuild {
			model.rebuild_parallel(&messages)?;
		} else {
			model.rebuild(&messages);
		}
		model.save(&snapshot)?;
		Ok(model)
	}

	/// Reads a snapshot written by `save`.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		let mut model: Self = postcard::from_bytes(&bytes)?;
		if model.order == 0 {
			return Err(ChatError::InvalidConfiguration("snapshot has chain order 0".to_owned()));
		}
		for chain in model.chains.values_mut() {
			chain.reindex();
		}
		Ok(model)
	}

	/// Writes the model as an opaque binary snapshot.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(&path, bytes)?;
		info!("wrote model snapshot {} ({} speakers)", path.as_ref().display(), self.chains.len());
		Ok(())
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn tokenizer(&self) -> &Tokenizer {
		&self.tokenizer
	}

	/// Adds one message to its sender's chain.
	///
	/// Returns `false` (and records nothing) for messages that are not
	/// ingestible. Weight of every transition: `1 + |likers|`.
	///
	/// # Notes
	/// - Not idempotent: ingesting the same message twice doubles its weight.
	///   Delivering each message once is the caller's job.
	pub fn ingest(&mut self, message: &Message) -> bool {
		let Some(text) = message.ingestible_text() else {
			debug!("model skipped message {}", message.id);
			return false;
		};

		let tokens = self.tokenizer.tokens(text);
		let order = self.order;
		let chain = self.chains.entry(message.sender_id.clone()).or_insert_with(|| Chain::new(order));
		chain.add_tokens(&tokens, message.weight());
		true
	}

	/// Discards nothing: adds every message in order. Call on an empty model
	/// for a full rebuild.
	pub fn rebuild(&mut self, messages: &[Message]) {
		let accepted = messages.iter().filter(|message| self.ingest(message)).count();
		info!("model rebuilt from {} messages ({} skipped)", accepted, messages.len() - accepted);
	}

	/// Same result as `rebuild`, computed on worker threads.
	///
	/// # Behavior
	/// - Splits the messages into `cpus * 8` chunks.
	/// - Builds one partial model per chunk on its own thread.
	/// - Merges the partial models in chunk order, so weights and context
	///   order match a sequential rebuild exactly.
	pub fn rebuild_parallel(&mut self, messages: &[Message]) -> Result<()> {
		if messages.is_empty() {
			return Ok(());
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = messages.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for (position, chunk) in messages.chunks(chunk_size).enumerate() {
				let tx = tx.clone();
				let mut partial = Self { order: self.order, tokenizer: self.tokenizer.clone(), chains: HashMap::new() };
				scope.spawn(move || {
					for message in chunk {
						partial.ingest(message);
					}
					// the receiver outlives the scope
					let _ = tx.send((position, partial));
				});
			}
		});
		drop(tx);

		let mut partials: Vec<(usize, MarkovModel)> = rx.iter().collect();
		partials.sort_by_key(|(position, _)| *position);
		for (_, partial) in &partials {
			self.merge(partial)?;
		}

		info!("model rebuilt from {} messages on {} chunks", messages.len(), partials.len());
		Ok(())
	}

	/// Merges another model into this one.
	///
	/// # Errors
	/// `InvalidConfiguration` if the orders or tokenizers differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(ChatError::InvalidConfiguration(format!(
				"order mismatch: self={}, other={}",
				self.order, other.order
			)));
		}
		if self.tokenizer != other.tokenizer {
			return Err(ChatError::InvalidConfiguration("tokenizer mismatch".to_owned()));
		}

		// Sort speakers so the merge order does not depend on hash iteration.
		let mut speakers: Vec<&UserId> = other.chains.keys().collect();
		speakers.sort();
		for speaker in speakers {
			let chain = &other.chains[speaker];
			let order = self.order;
			self.chains.entry(speaker.clone()).or_insert_with(|| Chain::new(order)).merge(chain);
		}
		Ok(())
	}

	/// Transition table of one speaker, if the speaker ever sent text.
	pub fn chain(&self, speaker_id: &str) -> Option<&Chain> {
		self.chains.get(speaker_id)
	}

	/// Speakers with at least one weighted transition, sorted.
	pub fn speakers(&self) -> Vec<&str> {
		let mut speakers: Vec<&str> = self
			.chains
			.iter()
			.filter(|(_, chain)| chain.total_weight() > 0)
			.map(|(speaker, _)| speaker.as_str())
			.collect();
		speakers.sort_unstable();
		speakers
	}

	/// Generates up to `length` tokens in the style of `speaker_id`, joined by spaces.
	///
	/// # Errors
	/// `NoDataForSpeaker` if the speaker has no weighted transition.
	pub fn generate(&self, speaker_id: &str, length: usize, dead_end: DeadEnd) -> Result<String> {
		let tokens = self.generate_tokens(speaker_id, length, dead_end, &mut rand::rng())?;
		Ok(tokens.join(" "))
	}

	/// Token-level generation with a caller-provided random source.
	pub fn generate_tokens<R: Rng + ?Sized>(
		&self,
		speaker_id: &str,
		length: usize,
		dead_end: DeadEnd,
		rng: &mut R,
	) -> Result<Vec<Token>> {
		self.chain(speaker_id)
			.and_then(|chain| walk(chain, length, dead_end, rng))
			.ok_or_else(|| ChatError::NoDataForSpeaker { speaker_id: speaker_id.to_owned() })
	}
}
