use rand::Rng;

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;

/// The weighted successor multiset of one context window.
///
/// A `State` is a node of a speaker's Markov chain. Every observation of
/// (context → successor) is appended together with the running total of
/// weights, so sampling is a binary search over `cumulative` instead of a
/// scan over a list where each token is repeated `weight` times.
///
/// ## Invariants
/// - `successors.len() == cumulative.len()`
/// - `cumulative` is strictly increasing (every weight is >= 1)
/// - An empty state is a legitimate terminal: the context was observed as the
///   tail of a message but never continued.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
	/// Observed successors, in observation order.
	successors: Vec<Token>,
	/// Running total of weights up to and including each observation.
	cumulative: Vec<u64>,
}

impl State {
	/// Creates a terminal state (no successor yet).
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one observation of `next` with the given weight.
	///
	/// A zero weight is ignored so that `cumulative` stays strictly increasing.
	pub fn add_transition(&mut self, next: &str, weight: u64) {
		if weight == 0 {
			return;
		}
		let total = self.total_weight().saturating_add(weight);
		self.successors.push(next.to_owned());
		self.cumulative.push(total);
	}

	/// Sum of the weights of every recorded observation.
	pub fn total_weight(&self) -> u64 {
		self.cumulative.last().copied().unwrap_or(0)
	}

	/// True when the context never had a successor.
	pub fn is_terminal(&self) -> bool {
		self.successors.is_empty()
	}

	/// Number of recorded observations (not their weight).
	pub fn observations(&self) -> usize {
		self.successors.len()
	}

	/// Total weight recorded for `token`.
	pub fn weight_of(&self, token: &str) -> u64 {
		self.iter().filter(|(successor, _)| *successor == token).map(|(_, weight)| weight).sum()
	}

	/// Aggregated weight per distinct successor, in first-observed order.
	pub fn weights(&self) -> Vec<(&str, u64)> {
		let mut weights: Vec<(&str, u64)> = Vec::new();
		for (successor, weight) in self.iter() {
			match weights.iter_mut().find(|(token, _)| *token == successor) {
				Some((_, total)) => *total += weight,
				None => weights.push((successor, weight)),
			}
		}
		weights
	}

	/// Iterates over `(successor, weight)` observations.
	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
		self.successors.iter().zip(self.cumulative.iter()).scan(0u64, |previous, (successor, total)| {
			let weight = total - *previous;
			*previous = *total;
			Some((successor.as_str(), weight))
		})
	}

	/// Draws a successor with probability proportional to its weight.
	///
	/// Returns `None` for a terminal state.
	pub fn predict<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
		let index = pick(&self.cumulative, rng)?;
		self.successors.get(index).map(String::as_str)
	}

	/// Appends every observation of `other` after the ones of `self`.
	pub fn merge(&mut self, other: &Self) {
		for (successor, weight) in other.iter() {
			self.add_transition(successor, weight);
		}
	}
}

/// Draws an index from a strictly increasing cumulative weight array.
///
/// `None` if the array is empty.
pub(crate) fn pick<R: Rng + ?Sized>(cumulative: &[u64], rng: &mut R) -> Option<usize> {
	let total = *cumulative.last()?;
	let r = rng.random_range(0..total);
	Some(cumulative.partition_point(|&bound| bound <= r))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn new_state_is_terminal() {
		let state = State::new();
		assert!(state.is_terminal());
		assert_eq!(state.total_weight(), 0);
		assert_eq!(state.predict(&mut StdRng::seed_from_u64(1)), None);
	}

	#[test]
	fn weights_accumulate_per_token() {
		let mut state = State::new();
		state.add_transition("pizza", 1);
		state.add_transition("tacos", 3);
		state.add_transition("pizza", 2);
		assert_eq!(state.total_weight(), 6);
		assert_eq!(state.observations(), 3);
		assert_eq!(state.weight_of("pizza"), 3);
		assert_eq!(state.weight_of("tacos"), 3);
		assert_eq!(state.weight_of("sushi"), 0);
		assert_eq!(state.weights(), vec![("pizza", 3), ("tacos", 3)]);
	}

	#[test]
	fn zero_weight_is_ignored() {
		let mut state = State::new();
		state.add_transition("x", 0);
		assert!(state.is_terminal());
	}

	#[test]
	fn pick_follows_cumulative_bounds() {
		// weights 1, 3, 1
		let cumulative = [1, 4, 5];
		let mut rng = StdRng::seed_from_u64(7);
		let mut hits = [0usize; 3];
		for _ in 0..5000 {
			hits[pick(&cumulative, &mut rng).unwrap()] += 1;
		}
		assert!(hits[1] > hits[0] * 2);
		assert!(hits[1] > hits[2] * 2);
		assert!(hits[0] > 0 && hits[2] > 0);
	}

	#[test]
	fn predict_only_returns_observed_tokens() {
		let mut state = State::new();
		state.add_transition("a", 1);
		state.add_transition("b", 1_000_000);
		let mut rng = StdRng::seed_from_u64(3);
		for _ in 0..100 {
			let next = state.predict(&mut rng).unwrap();
			assert!(next == "a" || next == "b");
		}
	}

	#[test]
	fn merge_sums_weights() {
		let mut left = State::new();
		left.add_transition("a", 2);
		let mut right = State::new();
		right.add_transition("a", 1);
		right.add_transition("b", 4);
		left.merge(&right);
		assert_eq!(left.weights(), vec![("a", 3), ("b", 4)]);
		assert_eq!(left.total_weight(), 7);
	}
}
