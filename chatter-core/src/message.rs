use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Identifier of a chat participant.
pub type UserId = String;

/// Identifier of a chat message.
pub type MessageId = String;

/// A chat message as delivered by the message source.
///
/// Immutable once ingested. Field aliases accept the raw chat export format
/// (`user_id`, `favorited_by`, `created_at`, `name`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
	pub id: MessageId,

	#[serde(alias = "user_id")]
	pub sender_id: UserId,

	/// Display name of the sender at the time of the message, if known.
	#[serde(default, alias = "name")]
	pub sender_name: Option<String>,

	/// Message body. `None` for attachment-only messages.
	#[serde(default)]
	pub text: Option<String>,

	/// Users who liked the message. Treated as a set.
	#[serde(default, alias = "favorited_by")]
	pub liker_ids: Vec<UserId>,

	#[serde(default, alias = "created_at")]
	pub timestamp: i64,

	/// Platform-generated message (member joined, topic changed...).
	#[serde(default)]
	pub system: bool,
}

impl Message {
	/// Builds a user message.
	///
	/// # Errors
	/// `InvalidConfiguration` if `sender_id` is empty.
	pub fn new<I, S>(id: &str, sender_id: &str, text: &str, liker_ids: I, timestamp: i64) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<UserId>,
	{
		if sender_id.is_empty() {
			return Err(ChatError::InvalidConfiguration(format!("message {id} has no sender_id")));
		}
		Ok(Self {
			id: id.to_owned(),
			sender_id: sender_id.to_owned(),
			sender_name: None,
			text: Some(text.to_owned()),
			liker_ids: liker_ids.into_iter().map(Into::into).collect(),
			timestamp,
			system: false,
		})
	}

	/// Parses one JSON record.
	pub fn from_json(record: &str) -> Result<Self> {
		Ok(serde_json::from_str(record)?)
	}

	/// Sets the sender display name.
	pub fn with_sender_name(mut self, name: &str) -> Self {
		self.sender_name = Some(name.to_owned());
		self
	}

	/// Returns the text if the message should feed the models.
	///
	/// System messages, messages without text and messages without a sender
	/// are skipped by both consumers.
	pub fn ingestible_text(&self) -> Option<&str> {
		if self.system || self.sender_id.is_empty() {
			return None;
		}
		self.text.as_deref()
	}

	/// Distinct likers, in first-listed order.
	pub fn likers(&self) -> Vec<&str> {
		let mut seen = HashSet::new();
		self.liker_ids
			.iter()
			.map(String::as_str)
			.filter(|liker| seen.insert(*liker))
			.collect()
	}

	/// Sampling weight of every transition taken from this message: `1 + |likers|`.
	pub fn weight(&self) -> u64 {
		1 + self.likers().len() as u64
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_sender_is_rejected() {
		let err = Message::new("1", "", "hello", Vec::<String>::new(), 0).unwrap_err();
		assert!(matches!(err, ChatError::InvalidConfiguration(_)));
	}

	#[test]
	fn duplicate_likers_count_once() {
		let message = Message::new("1", "a", "hi", ["b", "c", "b"], 0).unwrap();
		assert_eq!(message.likers(), vec!["b", "c"]);
		assert_eq!(message.weight(), 3);
	}

	#[test]
	fn zero_likes_still_weigh_one() {
		let message = Message::new("1", "a", "hi", Vec::<String>::new(), 0).unwrap();
		assert_eq!(message.weight(), 1);
	}

	#[test]
	fn export_aliases_are_accepted() {
		let message = Message::from_json(
			r#"{"id":"9","user_id":"u1","name":"Ann","text":"yo","favorited_by":["u2"],"created_at":17,"system":false}"#,
		)
		.unwrap();
		assert_eq!(message.sender_id, "u1");
		assert_eq!(message.sender_name.as_deref(), Some("Ann"));
		assert_eq!(message.liker_ids, vec!["u2".to_owned()]);
		assert_eq!(message.timestamp, 17);
	}

	#[test]
	fn system_and_textless_messages_are_not_ingestible() {
		let system = Message::from_json(r#"{"id":"1","sender_id":"s","text":"joined","system":true}"#).unwrap();
		assert_eq!(system.ingestible_text(), None);

		let textless = Message::from_json(r#"{"id":"2","sender_id":"s","text":null}"#).unwrap();
		assert_eq!(textless.ingestible_text(), None);

		let plain = Message::new("3", "s", "hello there", Vec::<String>::new(), 0).unwrap();
		assert_eq!(plain.ingestible_text(), Some("hello there"));
	}
}
