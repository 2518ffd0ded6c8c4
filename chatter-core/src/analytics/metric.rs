use serde::{Deserialize, Serialize};

/// Per-user statistic that can be ranked.
///
/// Each metric has its own domain, the users for which it is defined:
/// - `LikesGiven`: users who liked at least one message
/// - `LikesReceived`: users whose messages were liked at least once
/// - `Ratio`, `MessagesSent`: users who sent at least one message
/// - `SelfLikes`: users who liked their own message at least once
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
	LikesGiven,
	LikesReceived,
	Ratio,
	MessagesSent,
	SelfLikes,
}

impl Metric {
	pub const ALL: [Metric; 5] = [
		Metric::LikesGiven,
		Metric::LikesReceived,
		Metric::Ratio,
		Metric::MessagesSent,
		Metric::SelfLikes,
	];
}

/// Position of a user within a metric.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Standing {
	/// `rank` is 1-based.
	Ranked { value: f64, rank: usize },
	/// The user is outside the metric's domain.
	Unranked,
}

impl Standing {
	pub fn rank(&self) -> Option<usize> {
		match self {
			Standing::Ranked { rank, .. } => Some(*rank),
			Standing::Unranked => None,
		}
	}

	pub fn value(&self) -> Option<f64> {
		match self {
			Standing::Ranked { value, .. } => Some(*value),
			Standing::Unranked => None,
		}
	}
}

/// Total likes between one user and everyone else, with the per-counterpart
/// breakdown by descending count.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LikeSummary<'a> {
	pub total: u64,
	pub by_user: Vec<(&'a str, u64)>,
}

/// Sorts `(user, value)` by descending value. The sort is stable, so equal
/// values keep the order they came in.
pub(crate) fn sort_descending(entries: &mut [(&str, f64)]) {
	entries.sort_by(|a, b| b.1.total_cmp(&a.1));
}

/// Finds `user_id` in a board produced by `sort_descending`.
pub(crate) fn standing_in(board: &[(&str, f64)], user_id: &str) -> Standing {
	match board.iter().position(|(user, _)| *user == user_id) {
		Some(position) => Standing::Ranked { value: board[position].1, rank: position + 1 },
		None => Standing::Unranked,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sort_keeps_ties_in_input_order() {
		let mut board = vec![("a", 1.0), ("b", 2.0), ("c", 1.0), ("d", 2.0)];
		sort_descending(&mut board);
		assert_eq!(board, vec![("b", 2.0), ("d", 2.0), ("a", 1.0), ("c", 1.0)]);
	}

	#[test]
	fn standing_is_one_based() {
		let board = vec![("top", 9.0), ("next", 3.0)];
		assert_eq!(standing_in(&board, "top"), Standing::Ranked { value: 9.0, rank: 1 });
		assert_eq!(standing_in(&board, "next").rank(), Some(2));
		assert_eq!(standing_in(&board, "absent"), Standing::Unranked);
		assert_eq!(standing_in(&board, "absent").value(), None);
	}

	#[test]
	fn metric_names() {
		assert_eq!(serde_json::to_string(&Metric::LikesReceived).unwrap(), "\"likes_received\"");
		assert_eq!(serde_json::from_str::<Metric>("\"self_likes\"").unwrap(), Metric::SelfLikes);
	}

	#[test]
	fn standing_serializes_with_status() {
		let json = serde_json::to_string(&Standing::Ranked { value: 2.0, rank: 1 }).unwrap();
		assert_eq!(json, r#"{"status":"ranked","value":2.0,"rank":1}"#);
		assert_eq!(serde_json::to_string(&Standing::Unranked).unwrap(), r#"{"status":"unranked"}"#);
	}
}
