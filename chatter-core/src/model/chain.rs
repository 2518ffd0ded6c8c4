use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{State, pick};
use crate::tokenizer::Token;

/// One speaker's order-`k` transition table.
///
/// Maps a context window of exactly `order` tokens to its weighted successor
/// multiset. Contexts are kept in first-observed order; `index` resolves a
/// window to its slot.
///
/// Besides the table, the chain keeps a seed index: one entry per recorded
/// observation pointing at the context that produced it, with running weight
/// totals. Drawing from it picks a starting context with probability
/// proportional to the context's total observed weight.
///
/// # Invariants
/// - Every key has exactly `order` tokens
/// - `contexts`, `states` are parallel arrays; `index` maps each context to its slot
///   and is not serialized (`reindex` restores it after deserialization)
/// - `seed_cumulative` is strictly increasing and its last value equals the
///   sum of every state's `total_weight`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Chain {
	order: usize,
	contexts: Vec<Vec<Token>>,
	states: Vec<State>,
	#[serde(skip)]
	index: HashMap<Vec<Token>, usize>,
	seeds: Vec<usize>,
	seed_cumulative: Vec<u64>,
}

impl Chain {
	/// Creates an empty chain. `order` is validated by the owning model.
	pub fn new(order: usize) -> Self {
		Self {
			order,
			contexts: Vec::new(),
			states: Vec::new(),
			index: HashMap::new(),
			seeds: Vec::new(),
			seed_cumulative: Vec::new(),
		}
	}

	pub fn order(&self) -> usize {
		self.order
	}

	/// Adds one message worth of tokens.
	///
	/// - Fewer than `order` tokens: nothing is recorded.
	/// - Every window `tokens[i..i+k]` with a follower gets `tokens[i+k]` with `weight`.
	/// - The last window is registered even without follower (terminal state);
	///   an existing state is never reset.
	pub fn add_tokens(&mut self, tokens: &[Token], weight: u64) {
		let k = self.order;
		if tokens.len() < k {
			return;
		}

		for window in tokens.windows(k + 1) {
			let slot = self.slot(&window[..k]);
			self.record(slot, &window[k], weight);
		}

		self.slot(&tokens[tokens.len() - k..]);
	}

	/// Looks up a context window.
	///
	/// `None` means the window was never observed; `Some` with a terminal
	/// state means it was observed only as the end of a message.
	pub fn state(&self, context: &[Token]) -> Option<&State> {
		let slot = *self.index.get(context)?;
		self.states.get(slot)
	}

	/// Draws a starting context, weighted by observed transition weight.
	///
	/// Returns `None` if the chain has no weighted transition at all
	/// (only terminal states, or nothing).
	pub fn random_seed<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&[Token]> {
		let draw = pick(&self.seed_cumulative, rng)?;
		let slot = *self.seeds.get(draw)?;
		self.contexts.get(slot).map(Vec::as_slice)
	}

	/// Sum of every transition weight in the chain.
	pub fn total_weight(&self) -> u64 {
		self.seed_cumulative.last().copied().unwrap_or(0)
	}

	/// Number of distinct context windows (terminal ones included).
	pub fn context_count(&self) -> usize {
		self.contexts.len()
	}

	/// Iterates over `(context, state)` in first-observed order.
	pub fn iter(&self) -> impl Iterator<Item = (&[Token], &State)> {
		self.contexts.iter().map(Vec::as_slice).zip(self.states.iter())
	}

	/// Appends every observation of `other` after the ones of `self`.
	///
	/// Merging the partial chains of consecutive message batches in batch order
	/// gives the same chain as ingesting the batches one after the other.
	/// Both chains must have the same order (checked by the owning model).
	pub fn merge(&mut self, other: &Self) {
		let mut remap = Vec::with_capacity(other.contexts.len());
		for context in &other.contexts {
			remap.push(self.slot(context));
		}

		let mut previous = 0;
		for (other_slot, total) in other.seeds.iter().zip(other.seed_cumulative.iter()) {
			let weight = total - previous;
			previous = *total;
			let slot = remap[*other_slot];
			self.push_seed(slot, weight);
		}

		for (slot, state) in remap.into_iter().zip(other.states.iter()) {
			self.states[slot].merge(state);
		}
	}

	/// Rebuilds the context lookup from `contexts`.
	pub(crate) fn reindex(&mut self) {
		self.index = self.contexts.iter().enumerate().map(|(slot, context)| (context.clone(), slot)).collect();
	}

	/// Returns the slot of `context`, creating a terminal state on first access.
	fn slot(&mut self, context: &[Token]) -> usize {
		if let Some(slot) = self.index.get(context) {
			return *slot;
		}
		let slot = self.contexts.len();
		self.contexts.push(context.to_vec());
		self.states.push(State::new());
		self.index.insert(context.to_vec(), slot);
		slot
	}

	fn record(&mut self, slot: usize, next: &str, weight: u64) {
		if weight == 0 {
			return;
		}
		self.states[slot].add_transition(next, weight);
		self.push_seed(slot, weight);
	}

	fn push_seed(&mut self, slot: usize, weight: u64) {
		if weight == 0 {
			return;
		}
		let total = self.total_weight().saturating_add(weight);
		self.seeds.push(slot);
		self.seed_cumulative.push(total);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn tokens(text: &str) -> Vec<Token> {
		text.split(' ').map(str::to_owned).collect()
	}

	fn key(text: &str) -> Vec<Token> {
		tokens(text)
	}

	#[test]
	fn records_every_window_with_weight() {
		let mut chain = Chain::new(2);
		chain.add_tokens(&tokens("a b c d"), 3);
		assert_eq!(chain.state(&key("a b")).unwrap().weights(), vec![("c", 3)]);
		assert_eq!(chain.state(&key("b c")).unwrap().weights(), vec![("d", 3)]);
		assert!(chain.state(&key("c d")).unwrap().is_terminal());
		assert_eq!(chain.total_weight(), 6);
		assert_eq!(chain.context_count(), 3);
	}

	#[test]
	fn terminal_and_unseen_are_distinct() {
		let mut chain = Chain::new(2);
		chain.add_tokens(&tokens("x y z"), 1);
		assert!(chain.state(&key("y z")).is_some_and(State::is_terminal));
		assert!(chain.state(&key("z y")).is_none());
	}

	#[test]
	fn tail_registration_keeps_existing_successors() {
		let mut chain = Chain::new(2);
		chain.add_tokens(&tokens("a b c"), 1);
		chain.add_tokens(&tokens("x a b"), 1);
		let state = chain.state(&key("a b")).unwrap();
		assert_eq!(state.weights(), vec![("c", 1)]);
	}

	#[test]
	fn short_and_exact_inputs() {
		let mut chain = Chain::new(3);
		chain.add_tokens(&tokens("a b"), 1);
		assert_eq!(chain.context_count(), 0);

		chain.add_tokens(&tokens("a b c"), 1);
		assert_eq!(chain.context_count(), 1);
		assert!(chain.state(&key("a b c")).unwrap().is_terminal());
		assert_eq!(chain.total_weight(), 0);
	}

	#[test]
	fn keys_all_have_chain_order() {
		let mut chain = Chain::new(3);
		chain.add_tokens(&tokens("one two three four five"), 1);
		chain.add_tokens(&tokens("one two three"), 1);
		chain.add_tokens(&tokens("two"), 1);
		assert!(chain.iter().all(|(context, _)| context.len() == 3));
	}

	#[test]
	fn seed_draw_follows_context_weight() {
		let mut chain = Chain::new(1);
		chain.add_tokens(&tokens("rare x"), 1);
		chain.add_tokens(&tokens("common y"), 50);
		assert_eq!(chain.total_weight(), 51);

		let mut rng = StdRng::seed_from_u64(11);
		let mut common = 0;
		for _ in 0..1000 {
			let seed = chain.random_seed(&mut rng).unwrap();
			assert_eq!(seed.len(), 1);
			// terminal contexts have no weight and are never drawn
			assert!(seed[0] == "rare" || seed[0] == "common");
			if seed[0] == "common" {
				common += 1;
			}
		}
		assert!(common > 900);
	}

	#[test]
	fn no_seed_without_transitions() {
		let mut chain = Chain::new(2);
		assert!(chain.random_seed(&mut StdRng::seed_from_u64(0)).is_none());
		chain.add_tokens(&tokens("only two"), 4);
		assert!(chain.random_seed(&mut StdRng::seed_from_u64(0)).is_none());
	}

	#[test]
	fn merge_matches_sequential_ingest() {
		let batches = [("a b c", 1), ("b c d", 2), ("a b e", 1), ("z a b", 3)];

		let mut sequential = Chain::new(2);
		for (text, weight) in batches {
			sequential.add_tokens(&tokens(text), weight);
		}

		let mut first = Chain::new(2);
		let mut second = Chain::new(2);
		for (text, weight) in &batches[..2] {
			first.add_tokens(&tokens(text), *weight);
		}
		for (text, weight) in &batches[2..] {
			second.add_tokens(&tokens(text), *weight);
		}
		first.merge(&second);

		assert_eq!(first, sequential);
	}

	#[test]
	fn deserialized_chain_resolves_contexts_after_reindex() {
		let mut chain = Chain::new(2);
		chain.add_tokens(&tokens("a b c d"), 2);

		let bytes = postcard::to_stdvec(&chain).unwrap();
		let mut restored: Chain = postcard::from_bytes(&bytes).unwrap();
		assert!(restored.state(&key("a b")).is_none());

		restored.reindex();
		assert_eq!(restored.state(&key("a b")).unwrap().weights(), vec![("c", 2)]);
		assert!(restored.state(&key("c d")).unwrap().is_terminal());
		assert_eq!(restored, chain);

		// new observations land on the existing slots
		restored.add_tokens(&tokens("a b c"), 1);
		assert_eq!(restored.state(&key("a b")).unwrap().weights(), vec![("c", 3)]);
		assert_eq!(restored.context_count(), 3);
	}
}
