use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Counter keyed by `K` that remembers first-insertion order.
///
/// Insertion happens on first `add`; reading an absent key never creates it,
/// so "never counted" (`None`) stays distinct from a count.
///
/// # Invariants
/// - `order` holds each key of `counts` exactly once, in first-insertion order
/// - Counts only grow
#[derive(Clone, Debug, PartialEq)]
pub struct Tally<K: Eq + Hash> {
	order: Vec<K>,
	counts: HashMap<K, u64>,
}

impl<K: Eq + Hash> Default for Tally<K> {
	fn default() -> Self {
		Self { order: Vec::new(), counts: HashMap::new() }
	}
}

impl<K: Eq + Hash + Clone> Tally<K> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `amount` to `key`, inserting it first if needed.
	pub fn add(&mut self, key: &K, amount: u64) {
		match self.counts.get_mut(key) {
			Some(count) => *count += amount,
			None => {
				self.order.push(key.clone());
				self.counts.insert(key.clone(), amount);
			}
		}
	}

	pub fn get<Q>(&self, key: &Q) -> Option<u64>
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.counts.get(key).copied()
	}

	/// Sum of every count.
	pub fn total(&self) -> u64 {
		self.counts.values().sum()
	}

	/// `(key, count)` in first-insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
		self.order.iter().map(|key| (key, self.counts.get(key).copied().unwrap_or(0)))
	}

	/// `(key, count)` by descending count; equal counts keep insertion order.
	pub fn ranked(&self) -> Vec<(&K, u64)> {
		let mut ranked: Vec<(&K, u64)> = self.iter().collect();
		ranked.sort_by(|a, b| b.1.cmp(&a.1));
		ranked
	}

	/// First `limit` entries of `ranked`.
	pub fn top(&self, limit: usize) -> Vec<(&K, u64)> {
		let mut ranked = self.ranked();
		ranked.truncate(limit);
		ranked
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tally(entries: &[(&str, u64)]) -> Tally<String> {
		let mut tally = Tally::new();
		for (key, amount) in entries {
			tally.add(&(*key).to_owned(), *amount);
		}
		tally
	}

	#[test]
	fn absent_key_is_none_not_zero() {
		let mut tally = tally(&[("a", 0)]);
		assert_eq!(tally.get("a"), Some(0));
		assert_eq!(tally.get("b"), None);
		tally.add(&"b".to_owned(), 2);
		assert_eq!(tally.get("b"), Some(2));
	}

	#[test]
	fn ranked_is_descending_and_stable() {
		let tally = tally(&[("late", 1), ("x", 3), ("y", 1), ("z", 3), ("late", 2)]);
		let ranked: Vec<(&str, u64)> = tally.ranked().into_iter().map(|(k, c)| (k.as_str(), c)).collect();
		assert_eq!(ranked, vec![("late", 3), ("x", 3), ("z", 3), ("y", 1)]);
	}

	#[test]
	fn top_truncates() {
		let tally = tally(&[("a", 1), ("b", 2), ("c", 3)]);
		let top: Vec<&String> = tally.top(2).into_iter().map(|(k, _)| k).collect();
		assert_eq!(top, vec!["c", "b"]);
		assert_eq!(tally.top(10).len(), 3);
		assert_eq!(tally.total(), 6);
	}
}
