use std::collections::HashSet;

use log::{debug, info};
use serde::Serialize;

use crate::analytics::aggregator::Aggregator;
use crate::config::Config;
use crate::directory::UserDirectory;
use crate::error::Result;
use crate::message::{Message, MessageId};
use crate::model::generator::DeadEnd;
use crate::model::markov_model::MarkovModel;
use crate::source::{Cursor, MessageSource};

/// What happened to one delivered message.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Ingested {
	/// Fed to the model and the aggregator.
	Accepted,
	/// Id already ingested; nothing changed.
	Duplicate,
	/// System message or no text; nothing changed.
	Skipped,
}

/// Outcome counts of an ingestion pass.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
	pub accepted: usize,
	pub duplicates: usize,
	pub skipped: usize,
}

impl IngestReport {
	fn count(&mut self, outcome: Ingested) {
		match outcome {
			Ingested::Accepted => self.accepted += 1,
			Ingested::Duplicate => self.duplicates += 1,
			Ingested::Skipped => self.skipped += 1,
		}
	}
}

/// Single-writer ingestion driver.
///
/// Owns the Markov model, the aggregator and the user directory, and feeds
/// each message id to both consumers at most once. Readers share the engine
/// behind a read lock; `ingest` needs exclusive access, which makes every
/// message visible as a unit.
#[derive(Clone, Debug)]
pub struct Engine {
	config: Config,
	model: MarkovModel,
	analytics: Aggregator,
	directory: UserDirectory,
	seen: HashSet<MessageId>,
	cursor: Option<Cursor>,
}

impl Engine {
	/// Creates an empty engine.
	///
	/// # Errors
	/// `InvalidConfiguration` if the configuration does not validate.
	pub fn new(config: Config) -> Result<Self> {
		let model = MarkovModel::from_config(&config)?;
		let analytics = Aggregator::from_config(&config);
		Ok(Self {
			config,
			model,
			analytics,
			directory: UserDirectory::new(),
			seen: HashSet::new(),
			cursor: None,
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn model(&self) -> &MarkovModel {
		&self.model
	}

	pub fn analytics(&self) -> &Aggregator {
		&self.analytics
	}

	pub fn directory(&self) -> &UserDirectory {
		&self.directory
	}

	/// Newest message surfaced so far.
	pub fn cursor(&self) -> Option<&Cursor> {
		self.cursor.as_ref()
	}

	/// Number of distinct messages accepted.
	pub fn message_count(&self) -> usize {
		self.seen.len()
	}

	/// Feeds one message to both consumers.
	pub fn ingest(&mut self, message: &Message) -> Ingested {
		let outcome = self.admit(message);
		if outcome == Ingested::Accepted {
			self.model.ingest(message);
		}
		outcome
	}

	/// Feeds messages in order.
	pub fn ingest_all<'a, I: IntoIterator<Item = &'a Message>>(&mut self, messages: I) -> IngestReport {
		let mut report = IngestReport::default();
		for message in messages {
			report.count(self.ingest(message));
		}
		report
	}

	/// Discards all state and rebuilds it from every message of `source`.
	///
	/// The current state is only replaced once the rebuild succeeded.
	pub fn rebuild<S: MessageSource + ?Sized>(&mut self, source: &S) -> Result<IngestReport> {
		let messages = source.messages()?;
		let mut fresh = Engine::new(self.config.clone())?;
		let mut report = IngestReport::default();

		if self.config.parallel_rebuild {
			let mut accepted = Vec::with_capacity(messages.len());
			for message in messages {
				let outcome = fresh.admit(&message);
				report.count(outcome);
				if outcome == Ingested::Accepted {
					accepted.push(message);
				}
			}
			fresh.model.rebuild_parallel(&accepted)?;
		} else {
			report = fresh.ingest_all(&messages);
		}

		*self = fresh;
		info!(
			"rebuild: {} accepted, {} duplicates, {} skipped",
			report.accepted, report.duplicates, report.skipped
		);
		Ok(report)
	}

	/// Ingests the messages `source` holds past the cursor.
	pub fn refresh<S: MessageSource + ?Sized>(&mut self, source: &S) -> Result<IngestReport> {
		let messages = match &self.cursor {
			Some(cursor) => source.messages_after(cursor)?,
			None => source.messages()?,
		};
		let report = self.ingest_all(&messages);
		info!(
			"refresh: {} accepted, {} duplicates, {} skipped",
			report.accepted, report.duplicates, report.skipped
		);
		Ok(report)
	}

	/// Generates text for a speaker; `None` uses the configured dead-end policy.
	pub fn generate(&self, speaker_id: &str, length: usize, dead_end: Option<DeadEnd>) -> Result<String> {
		self.model.generate(speaker_id, length, dead_end.unwrap_or(self.config.dead_end))
	}

	/// Everything `ingest` does except the model update.
	fn admit(&mut self, message: &Message) -> Ingested {
		if self.seen.contains(&message.id) {
			debug!("duplicate message {}", message.id);
			return Ingested::Duplicate;
		}
		if self.cursor.as_ref().is_none_or(|cursor| message.timestamp >= cursor.timestamp) {
			self.cursor = Some(Cursor::of(message));
		}
		if !self.analytics.ingest(message) {
			return Ingested::Skipped;
		}
		self.seen.insert(message.id.clone());
		if let Some(name) = &message.sender_name {
			self.directory.insert(&message.sender_id, name);
		}
		Ingested::Accepted
	}
}
