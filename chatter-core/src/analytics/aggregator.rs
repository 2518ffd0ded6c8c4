use std::collections::{HashMap, HashSet};

use log::debug;

use super::metric::{LikeSummary, Metric, Standing, sort_descending, standing_in};
use super::tally::Tally;
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::message::{Message, MessageId, UserId};
use crate::tokenizer::{Stopwords, Token, Tokenizer};

/// Streaming statistics over the message history.
///
/// Every counter is append-only: ingesting a message only ever increases
/// counts. Derived values (totals, ratios, ranks) are computed on query.
///
/// Lookups for a user the aggregator has never seen (neither as sender nor as
/// liker) fail with `UnknownUser`, so a real zero is never confused with
/// missing data.
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregator {
	tokenizer: Tokenizer,
	stopwords: Stopwords,

	known: HashSet<UserId>,
	message_log: HashMap<UserId, Vec<MessageId>>,
	messages_sent: Tally<UserId>,

	/// word -> count, all senders
	words: Tally<Token>,
	/// word -> (sender -> count)
	word_users: HashMap<Token, Tally<UserId>>,
	/// sender -> (word -> count)
	user_words: HashMap<UserId, Tally<Token>>,

	/// liker -> (liked sender -> count)
	likes_given: HashMap<UserId, Tally<UserId>>,
	given_totals: Tally<UserId>,
	/// sender -> (liker -> count)
	likes_received: HashMap<UserId, Tally<UserId>>,
	received_totals: Tally<UserId>,

	self_likes: Tally<UserId>,
}

impl Aggregator {
	pub fn new(tokenizer: Tokenizer, stopwords: Stopwords) -> Self {
		Self {
			tokenizer,
			stopwords,
			known: HashSet::new(),
			message_log: HashMap::new(),
			messages_sent: Tally::new(),
			words: Tally::new(),
			word_users: HashMap::new(),
			user_words: HashMap::new(),
			likes_given: HashMap::new(),
			given_totals: Tally::new(),
			likes_received: HashMap::new(),
			received_totals: Tally::new(),
			self_likes: Tally::new(),
		}
	}

	pub fn from_config(config: &Config) -> Self {
		Self::new(config.tokenizer(), config.stopwords())
	}

	/// Updates every counter with one message.
	///
	/// Returns `false` and changes nothing for messages that are not ingestible.
	pub fn ingest(&mut self, message: &Message) -> bool {
		let Some(text) = message.ingestible_text() else {
			debug!("aggregator skipped message {}", message.id);
			return false;
		};
		let sender = &message.sender_id;

		self.known.insert(sender.clone());
		self.messages_sent.add(sender, 1);
		self.message_log.entry(sender.clone()).or_default().push(message.id.clone());

		for token in self.tokenizer.tokens(text) {
			// runs of spaces and punctuation-only words normalize to ""
			if token.is_empty() || self.stopwords.contains(&token) {
				continue;
			}
			self.words.add(&token, 1);
			self.word_users.entry(token.clone()).or_default().add(sender, 1);
			self.user_words.entry(sender.clone()).or_default().add(&token, 1);
		}

		for liker in message.likers() {
			let liker = liker.to_owned();
			self.known.insert(liker.clone());
			self.likes_given.entry(liker.clone()).or_default().add(sender, 1);
			self.given_totals.add(&liker, 1);
			self.likes_received.entry(sender.clone()).or_default().add(&liker, 1);
			self.received_totals.add(sender, 1);

			if &liker == sender {
				self.self_likes.add(sender, 1);
			}
		}
		true
	}

	/// Ingests messages in order.
	pub fn rebuild(&mut self, messages: &[Message]) {
		for message in messages {
			self.ingest(message);
		}
	}

	/// True if the user ever sent or liked a message.
	pub fn is_known(&self, user_id: &str) -> bool {
		self.known.contains(user_id)
	}

	/// Number of distinct users seen.
	pub fn user_count(&self) -> usize {
		self.known.len()
	}

	fn require_known(&self, user_id: &str) -> Result<()> {
		if self.is_known(user_id) {
			Ok(())
		} else {
			Err(ChatError::UnknownUser { user_id: user_id.to_owned() })
		}
	}

	/// Most used words overall, at most `limit`.
	pub fn top_words(&self, limit: usize) -> Vec<(&str, u64)> {
		as_str_pairs(self.words.top(limit))
	}

	/// Most used words of one user, at most `limit`.
	pub fn words_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<(&str, u64)>> {
		self.require_known(user_id)?;
		Ok(self.user_words.get(user_id).map(|words| as_str_pairs(words.top(limit))).unwrap_or_default())
	}

	/// Users who used `word` the most. `None` if the word was never counted.
	pub fn top_users_for_word(&self, word: &str, limit: usize) -> Option<Vec<(&str, u64)>> {
		self.word_users.get(word).map(|users| as_str_pairs(users.top(limit)))
	}

	pub fn messages_sent(&self, user_id: &str) -> Result<u64> {
		self.require_known(user_id)?;
		Ok(self.messages_sent.get(user_id).unwrap_or(0))
	}

	/// Ids of the messages sent by the user, in ingestion order.
	pub fn message_ids(&self, user_id: &str) -> Result<&[MessageId]> {
		self.require_known(user_id)?;
		Ok(self.message_log.get(user_id).map(Vec::as_slice).unwrap_or_default())
	}

	/// Likes the user gave, broken down by the sender liked.
	pub fn likes_given(&self, user_id: &str) -> Result<LikeSummary<'_>> {
		self.require_known(user_id)?;
		Ok(summary(self.likes_given.get(user_id)))
	}

	/// Likes the user received, broken down by liker.
	pub fn likes_received(&self, user_id: &str) -> Result<LikeSummary<'_>> {
		self.require_known(user_id)?;
		Ok(summary(self.likes_received.get(user_id)))
	}

	pub fn self_like_count(&self, user_id: &str) -> Result<u64> {
		self.require_known(user_id)?;
		Ok(self.self_likes.get(user_id).unwrap_or(0))
	}

	/// Likes received per message sent.
	///
	/// # Errors
	/// `DivisionUndefined` if the user has sent no message (known or not).
	pub fn ratio(&self, user_id: &str) -> Result<f64> {
		match self.messages_sent.get(user_id) {
			Some(sent) if sent > 0 => {
				let received = self.received_totals.get(user_id).unwrap_or(0);
				Ok(received as f64 / sent as f64)
			}
			_ => Err(ChatError::DivisionUndefined { user_id: user_id.to_owned() }),
		}
	}

	/// Every user in the metric's domain, best first.
	///
	/// Equal values are ordered by when the user entered the domain.
	pub fn leaderboard(&self, metric: Metric) -> Vec<(&str, f64)> {
		let mut board: Vec<(&str, f64)> = match metric {
			Metric::LikesGiven => as_f64_pairs(&self.given_totals),
			Metric::LikesReceived => as_f64_pairs(&self.received_totals),
			Metric::MessagesSent => as_f64_pairs(&self.messages_sent),
			Metric::SelfLikes => as_f64_pairs(&self.self_likes),
			Metric::Ratio => self
				.messages_sent
				.iter()
				.map(|(user, sent)| {
					let received = self.received_totals.get(user).unwrap_or(0);
					(user.as_str(), received as f64 / sent as f64)
				})
				.collect(),
		};
		sort_descending(&mut board);
		board
	}

	/// Value and 1-based rank of the user for `metric`.
	///
	/// A known user outside the metric's domain is `Standing::Unranked`.
	///
	/// # Errors
	/// `UnknownUser` if the user was never seen.
	pub fn rank(&self, metric: Metric, user_id: &str) -> Result<Standing> {
		self.require_known(user_id)?;
		Ok(standing_in(&self.leaderboard(metric), user_id))
	}
}

impl Default for Aggregator {
	fn default() -> Self {
		Self::new(Tokenizer::default(), Stopwords::default())
	}
}

fn as_str_pairs(entries: Vec<(&String, u64)>) -> Vec<(&str, u64)> {
	entries.into_iter().map(|(key, count)| (key.as_str(), count)).collect()
}

fn as_f64_pairs(tally: &Tally<UserId>) -> Vec<(&str, f64)> {
	tally.iter().map(|(user, count)| (user.as_str(), count as f64)).collect()
}

fn summary(table: Option<&Tally<UserId>>) -> LikeSummary<'_> {
	match table {
		Some(table) => LikeSummary { total: table.total(), by_user: as_str_pairs(table.ranked()) },
		None => LikeSummary { total: 0, by_user: Vec::new() },
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn message(id: &str, sender: &str, text: &str, likers: &[&str]) -> Message {
		Message::new(id, sender, text, likers.iter().copied(), 0).unwrap()
	}

	fn aggregator(messages: &[Message]) -> Aggregator {
		let mut aggregator = Aggregator::default();
		aggregator.rebuild(messages);
		aggregator
	}

	#[test]
	fn word_counts_skip_stopwords_and_punctuation() {
		let aggregator = aggregator(&[
			message("1", "a", "The pizza, the PIZZA!", &[]),
			message("2", "b", "pizza  party", &[]),
		]);
		assert_eq!(aggregator.top_words(10), vec![("pizza", 3), ("party", 1)]);
		assert_eq!(aggregator.top_words(1), vec![("pizza", 3)]);
		assert_eq!(aggregator.words_for_user("b", 10).unwrap(), vec![("pizza", 1), ("party", 1)]);
	}

	#[test]
	fn custom_stopwords_still_drop_empty_tokens() {
		let config = Config::from_toml_str("stopwords = [\"the\"]").unwrap();
		let mut aggregator = Aggregator::from_config(&config);
		aggregator.ingest(&message("1", "a", "pizza  ... !! the tacos", &[]));
		assert_eq!(aggregator.top_words(10), vec![("pizza", 1), ("tacos", 1)]);
		assert_eq!(aggregator.words_for_user("a", 10).unwrap(), vec![("pizza", 1), ("tacos", 1)]);
		assert_eq!(aggregator.top_users_for_word("", 5), None);
	}

	#[test]
	fn word_ties_keep_first_seen_order() {
		let aggregator = aggregator(&[message("1", "a", "zebra apple mango apple zebra", &[])]);
		assert_eq!(aggregator.top_words(3), vec![("zebra", 2), ("apple", 2), ("mango", 1)]);
	}

	#[test]
	fn top_users_for_word() {
		let aggregator = aggregator(&[
			message("1", "a", "tacos", &[]),
			message("2", "b", "tacos tacos", &[]),
		]);
		assert_eq!(aggregator.top_users_for_word("tacos", 5), Some(vec![("b", 2), ("a", 1)]));
		assert_eq!(aggregator.top_users_for_word("sushi", 5), None);
	}

	#[test]
	fn like_tables_both_directions() {
		let aggregator = aggregator(&[
			message("1", "a", "hi", &["b", "c"]),
			message("2", "a", "yo", &["b"]),
			message("3", "c", "hey", &["b", "c"]),
		]);

		let given = aggregator.likes_given("b").unwrap();
		assert_eq!(given.total, 3);
		assert_eq!(given.by_user, vec![("a", 2), ("c", 1)]);

		let received = aggregator.likes_received("a").unwrap();
		assert_eq!(received.total, 3);
		assert_eq!(received.by_user, vec![("b", 2), ("c", 1)]);

		assert_eq!(aggregator.self_like_count("c").unwrap(), 1);
		assert_eq!(aggregator.self_like_count("a").unwrap(), 0);
	}

	#[test]
	fn known_user_with_no_likes_is_zero_unknown_is_error() {
		let aggregator = aggregator(&[message("1", "a", "hi", &["b"])]);

		let given = aggregator.likes_given("a").unwrap();
		assert_eq!(given.total, 0);
		assert!(given.by_user.is_empty());
		assert_eq!(aggregator.words_for_user("b", 5).unwrap(), Vec::<(&str, u64)>::new());
		assert_eq!(aggregator.messages_sent("b").unwrap(), 0);

		for result in [aggregator.likes_given("z").map(|_| ()), aggregator.likes_received("z").map(|_| ())] {
			assert!(matches!(result, Err(ChatError::UnknownUser { .. })));
		}
		assert!(matches!(aggregator.self_like_count("z"), Err(ChatError::UnknownUser { .. })));
		assert!(matches!(aggregator.rank(Metric::Ratio, "z"), Err(ChatError::UnknownUser { .. })));
	}

	#[test]
	fn ratio_and_undefined_ratio() {
		let aggregator = aggregator(&[
			message("1", "x", "one", &["y", "z"]),
			message("2", "x", "two", &["y", "z", "w"]),
			message("3", "x", "three", &["y"]),
			message("4", "x", "four", &["z", "w"]),
		]);
		assert_eq!(aggregator.ratio("x").unwrap(), 2.0);
		assert!(matches!(aggregator.ratio("y"), Err(ChatError::DivisionUndefined { .. })));
		assert!(matches!(aggregator.ratio("nobody"), Err(ChatError::DivisionUndefined { .. })));
	}

	#[test]
	fn rank_domains() {
		let aggregator = aggregator(&[message("1", "a", "hi", &["b"]), message("2", "c", "hello", &[])]);

		assert_eq!(aggregator.rank(Metric::LikesReceived, "a").unwrap(), Standing::Ranked { value: 1.0, rank: 1 });
		// "c" sent a message but was never liked
		assert_eq!(aggregator.rank(Metric::LikesReceived, "c").unwrap(), Standing::Unranked);
		assert_eq!(aggregator.rank(Metric::Ratio, "c").unwrap(), Standing::Ranked { value: 0.0, rank: 2 });
		// "b" never sent anything
		assert_eq!(aggregator.rank(Metric::Ratio, "b").unwrap(), Standing::Unranked);
		assert_eq!(aggregator.rank(Metric::LikesGiven, "b").unwrap().rank(), Some(1));
		assert_eq!(aggregator.rank(Metric::SelfLikes, "a").unwrap(), Standing::Unranked);
	}

	#[test]
	fn message_log_per_user() {
		let aggregator = aggregator(&[message("m1", "a", "hi", &[]), message("m2", "a", "there", &[])]);
		assert_eq!(aggregator.messages_sent("a").unwrap(), 2);
		assert_eq!(aggregator.message_ids("a").unwrap(), ["m1".to_owned(), "m2".to_owned()]);
	}

	#[test]
	fn skipped_messages_leave_no_trace() {
		let mut aggregator = Aggregator::default();
		let mut system = message("1", "a", "a joined", &["b"]);
		system.system = true;
		assert!(!aggregator.ingest(&system));
		assert!(!aggregator.is_known("a"));
		assert!(!aggregator.is_known("b"));
		assert_eq!(aggregator.user_count(), 0);
	}
}
