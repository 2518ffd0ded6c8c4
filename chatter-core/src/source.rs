use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::read_file;
use crate::message::{Message, MessageId};

/// Position of the newest message seen by an ingestion pass.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
	pub id: MessageId,
	pub timestamp: i64,
}

impl Cursor {
	pub fn of(message: &Message) -> Self {
		Self { id: message.id.clone(), timestamp: message.timestamp }
	}
}

/// Where messages come from.
///
/// Implementations return a finite, replayable sequence in a stable order and
/// surface each message id at most once per call.
pub trait MessageSource {
	/// Every message, for a full rebuild.
	fn messages(&self) -> Result<Vec<Message>>;

	/// Messages at or after the cursor's timestamp.
	///
	/// Messages sharing the cursor's timestamp are returned again; the engine
	/// drops the ones it already ingested by id.
	fn messages_after(&self, cursor: &Cursor) -> Result<Vec<Message>> {
		Ok(self
			.messages()?
			.into_iter()
			.filter(|message| message.timestamp >= cursor.timestamp && message.id != cursor.id)
			.collect())
	}
}

/// Messages held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
	messages: Vec<Message>,
}

impl MemorySource {
	pub fn new(messages: Vec<Message>) -> Self {
		Self { messages }
	}

	pub fn push(&mut self, message: Message) {
		self.messages.push(message);
	}
}

impl MessageSource for MemorySource {
	fn messages(&self) -> Result<Vec<Message>> {
		Ok(self.messages.clone())
	}
}

/// One JSON message per line.
///
/// Blank lines are ignored. A line that is not a valid message is logged and
/// skipped so one bad record does not block a rebuild.
#[derive(Clone, Debug)]
pub struct JsonlSource {
	path: PathBuf,
}

impl JsonlSource {
	pub fn new<P: AsRef<Path>>(path: P) -> Self {
		Self { path: path.as_ref().to_path_buf() }
	}
}

impl MessageSource for JsonlSource {
	fn messages(&self) -> Result<Vec<Message>> {
		let mut messages = Vec::new();
		for (line_number, line) in read_file(&self.path)?.iter().enumerate() {
			if line.trim().is_empty() {
				continue;
			}
			match Message::from_json(line) {
				Ok(message) => messages.push(message),
				Err(e) => warn!("{}:{}: skipped record: {}", self.path.display(), line_number + 1, e),
			}
		}
		Ok(messages)
	}
}
