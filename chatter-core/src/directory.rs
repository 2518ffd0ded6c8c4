use std::collections::HashMap;

use crate::message::UserId;

/// Maps user ids to display names and back.
///
/// Name lookup is an exact string match. When a user changes name, the newest
/// name wins and the old name stops resolving.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserDirectory {
	names: HashMap<UserId, String>,
	ids: HashMap<String, UserId>,
}

impl UserDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records or updates the display name of `id`.
	pub fn insert(&mut self, id: &str, name: &str) {
		if let Some(previous) = self.names.insert(id.to_owned(), name.to_owned()) {
			if previous != name && self.ids.get(&previous).is_some_and(|owner| owner == id) {
				self.ids.remove(&previous);
			}
		}
		self.ids.insert(name.to_owned(), id.to_owned());
	}

	pub fn name_of(&self, id: &str) -> Option<&str> {
		self.names.get(id).map(String::as_str)
	}

	pub fn id_of(&self, name: &str) -> Option<&str> {
		self.ids.get(name).map(String::as_str)
	}
}
