use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::model::generator::DeadEnd;
use crate::tokenizer::{DEFAULT_STOPWORDS, Stopwords, Tokenizer};

/// Default chain order used when none is configured.
pub const DEFAULT_ORDER: usize = 6;

/// Settings shared by the Markov model, the aggregator and the ingestion engine.
///
/// Every field has a default, so a TOML file only needs the keys it overrides:
///
/// ```toml
/// order = 2
/// dead_end = "stop"
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
	/// Chain order `k` (number of tokens in a context window), must be >= 1.
	pub order: usize,

	/// Replacement for every character of the punctuation class.
	pub punctuation_substitute: String,

	/// Tokens excluded from word-frequency tables (never from the chain).
	pub stopwords: Vec<String>,

	/// Dead-end policy used when a caller does not pick one.
	pub dead_end: DeadEnd,

	/// Build the Markov model on worker threads during a full rebuild.
	pub parallel_rebuild: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			order: DEFAULT_ORDER,
			punctuation_substitute: String::new(),
			stopwords: DEFAULT_STOPWORDS.iter().map(|w| (*w).to_owned()).collect(),
			dead_end: DeadEnd::Reseed,
			parallel_rebuild: true,
		}
	}
}

impl Config {
	/// Parses and validates a configuration from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		let config: Config = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and validates a configuration file.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::from_toml_str(&fs::read_to_string(path)?)
	}

	/// Checks the invariants the model relies on.
	///
	/// # Errors
	/// `InvalidConfiguration` if the chain order is zero.
	pub fn validate(&self) -> Result<()> {
		if self.order == 0 {
			return Err(ChatError::InvalidConfiguration("chain order must be >= 1".to_owned()));
		}
		Ok(())
	}

	pub fn tokenizer(&self) -> Tokenizer {
		Tokenizer::new(&self.punctuation_substitute)
	}

	pub fn stopwords(&self) -> Stopwords {
		Stopwords::new(self.stopwords.iter().map(String::as_str))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let config = Config::default();
		assert_eq!(config.order, DEFAULT_ORDER);
		assert_eq!(config.dead_end, DeadEnd::Reseed);
		assert!(config.validate().is_ok());
		assert!(config.stopwords().contains("the"));
	}

	#[test]
	fn partial_toml_keeps_other_defaults() {
		let config = Config::from_toml_str("order = 2\ndead_end = \"stop\"\n").unwrap();
		assert_eq!(config.order, 2);
		assert_eq!(config.dead_end, DeadEnd::Stop);
		assert_eq!(config.punctuation_substitute, "");
		assert!(config.parallel_rebuild);
	}

	#[test]
	fn zero_order_is_rejected() {
		let err = Config::from_toml_str("order = 0").unwrap_err();
		assert!(matches!(err, ChatError::InvalidConfiguration(_)));
	}

	#[test]
	fn garbage_toml_is_a_parse_error() {
		let err = Config::from_toml_str("order = [").unwrap_err();
		assert!(matches!(err, ChatError::ConfigParse(_)));
	}

	#[test]
	fn load_reads_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("chatter.toml");
		fs::write(&path, "order = 3\nstopwords = [\"foo\"]\n").unwrap();
		let config = Config::load(&path).unwrap();
		assert_eq!(config.order, 3);
		assert!(config.stopwords().contains("foo"));
		assert!(!config.stopwords().contains("the"));
	}
}
