use thiserror::Error;

/// Error type shared by every fallible operation of the crate.
///
/// Query failures are reported to the caller as values; none of them leaves
/// the model or the aggregator in a partially updated state.
#[derive(Debug, Error)]
pub enum ChatError {
	/// The query references a user id absent from the relevant table.
	#[error("Unknown user: {user_id}")]
	UnknownUser { user_id: String },

	/// Generation was requested for a speaker without any weighted transition.
	#[error("No data for speaker: {speaker_id}")]
	NoDataForSpeaker { speaker_id: String },

	/// A like/message ratio was requested for a user who never sent a message.
	#[error("Division undefined: user {user_id} has sent no messages")]
	DivisionUndefined { user_id: String },

	/// Chain order, message shape or settings are not usable.
	#[error("Invalid configuration: {0}")]
	InvalidConfiguration(String),

	/// A model snapshot could not be encoded or decoded.
	#[error("Snapshot error: {0}")]
	Snapshot(#[from] postcard::Error),

	/// A message record is not valid JSON for a `Message`.
	#[error("Malformed message record: {0}")]
	Record(#[from] serde_json::Error),

	/// The configuration file is not valid TOML for a `Config`.
	#[error("Config parse error: {0}")]
	ConfigParse(#[from] toml::de::Error),

	/// I/O operation failed.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ChatError>;
