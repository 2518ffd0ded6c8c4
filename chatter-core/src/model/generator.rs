use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chain::Chain;
use crate::tokenizer::Token;

/// What to do when the walk reaches a context without successor.
///
/// # Variants
/// - `Stop`: return what was generated so far, so the text ends where the
///   speaker actually stopped talking.
/// - `Reseed`: draw a fresh weighted starting context and append it,
///   truncated if it would overshoot the target length.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeadEnd {
	Stop,
	#[default]
	Reseed,
}

/// Walks `chain` until `length` tokens are produced or a dead end stops it.
///
/// The output never exceeds `length`. With `DeadEnd::Reseed` it is exactly
/// `length` tokens long. Every iteration appends at least one token or
/// returns, so the walk takes at most `length` steps.
///
/// Returns `None` if the chain has no weighted transition to start from.
pub(crate) fn walk<R: Rng + ?Sized>(chain: &Chain, length: usize, dead_end: DeadEnd, rng: &mut R) -> Option<Vec<Token>> {
	let k = chain.order();
	let mut output: Vec<Token> = chain.random_seed(rng)?.to_vec();
	output.truncate(length);

	while output.len() < length {
		let context = &output[output.len() - k..];
		let next = chain.state(context).and_then(|state| state.predict(rng));

		match next {
			Some(token) => output.push(token.to_owned()),
			None => match dead_end {
				DeadEnd::Stop => break,
				DeadEnd::Reseed => {
					let room = length - output.len();
					let seed = chain.random_seed(rng)?;
					output.extend(seed.iter().take(room).cloned());
				}
			},
		}
	}

	Some(output)
}
