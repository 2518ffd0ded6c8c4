use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A normalized word.
pub type Token = String;

/// Characters stripped from every word before it becomes a token.
pub const PUNCTUATION: &str = "!\"#%'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Words left out of frequency tables by default. The empty token is included
/// so that runs of spaces never show up as a "word".
pub const DEFAULT_STOPWORDS: &[&str] = &[
	"the", "be", "to", "of", "and", "a", "in", "that", "have", "it", "for", "not", "on",
	"with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
	"say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
	"what", "so", "up", "out", "if", "about", "who", "get", "which", "go", "me", "when",
	"make", "can", "like", "time", "no", "just", "him", "know", "take", "person", "into",
	"year", "your", "good", "some", "could", "them", "see", "other", "than", "then", "now",
	"look", "only", "come", "its", "over", "think", "also", "back", "after", "use", "two",
	"how", "our", "work", "first", "well", "way", "even", "new", "want", "because", "any",
	"these", "give", "day", "most", "us", "",
];

/// Turns raw message text into tokens.
///
/// Pure and deterministic: the same text always yields the same tokens.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Tokenizer {
	substitute: String,
}

impl Tokenizer {
	/// Creates a tokenizer replacing punctuation with `substitute`.
	pub fn new(substitute: &str) -> Self {
		Self { substitute: substitute.to_owned() }
	}

	/// Replaces punctuation and lowercases a single raw word.
	pub fn normalize(&self, raw_word: &str) -> Token {
		let mut token = String::with_capacity(raw_word.len());
		for c in raw_word.chars() {
			if PUNCTUATION.contains(c) {
				token.push_str(&self.substitute);
			} else {
				token.push(c);
			}
		}
		token.to_lowercase()
	}

	/// Splits on single spaces. Consecutive spaces produce empty words;
	/// empty text produces nothing.
	pub fn split(text: &str) -> Vec<&str> {
		if text.is_empty() {
			return Vec::new();
		}
		text.split(' ').collect()
	}

	/// `split` followed by `normalize` on every word.
	pub fn tokens(&self, text: &str) -> Vec<Token> {
		Self::split(text).into_iter().map(|word| self.normalize(word)).collect()
	}
}

/// Tokens excluded from word-frequency statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
	pub fn new<'a, I: IntoIterator<Item = &'a str>>(words: I) -> Self {
		Self(words.into_iter().map(str::to_owned).collect())
	}

	pub fn contains(&self, token: &str) -> bool {
		self.0.contains(token)
	}
}

impl Default for Stopwords {
	fn default() -> Self {
		Self::new(DEFAULT_STOPWORDS.iter().copied())
	}
}
