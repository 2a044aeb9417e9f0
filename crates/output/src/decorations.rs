//! Channel-owned decoration bookkeeping.

use std::collections::BTreeSet;

use spool_primitives::DecorationId;

use crate::buffer::{Decoration, TextBuffer};

/// Decorations a channel placed on its buffer.
///
/// Every method patches the buffer's decoration layer and the owned set
/// together, so the two never drift apart.
#[derive(Debug, Default, Clone)]
pub struct DecorationSet {
	ids: BTreeSet<DecorationId>,
}

impl DecorationSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn contains(&self, id: DecorationId) -> bool {
		self.ids.contains(&id)
	}

	/// Owned identifiers in ascending order.
	pub fn ids(&self) -> impl Iterator<Item = DecorationId> + '_ {
		self.ids.iter().copied()
	}

	/// Adds decorations to the buffer and records their identifiers.
	pub fn add(&mut self, buffer: &mut dyn TextBuffer, decorations: Vec<Decoration>) -> Vec<DecorationId> {
		let ids = buffer.add_decorations(decorations);
		self.ids.extend(ids.iter().copied());
		ids
	}

	/// Removes owned decorations from the buffer. Returns how many were removed.
	///
	/// Identifiers this set does not own are skipped with a warning.
	pub fn remove(&mut self, buffer: &mut dyn TextBuffer, ids: &[DecorationId]) -> usize {
		let mut owned = Vec::with_capacity(ids.len());
		for &id in ids {
			if self.ids.remove(&id) {
				owned.push(id);
			} else {
				tracing::warn!(%id, "output.decorations.not_owned");
			}
		}
		if !owned.is_empty() {
			buffer.remove_decorations(&owned);
		}
		owned.len()
	}

	/// Removes owned decorations touching any line in `first..=last`.
	///
	/// Decorations placed by someone else stay on the buffer.
	pub fn remove_in_lines(&mut self, buffer: &mut dyn TextBuffer, first: usize, last: usize) -> usize {
		let hits: Vec<_> = buffer
			.decorations_in_lines(first, last)
			.into_iter()
			.filter(|id| self.ids.contains(id))
			.collect();
		self.remove(buffer, &hits)
	}

	/// Removes every owned decoration.
	pub fn clear(&mut self, buffer: &mut dyn TextBuffer) -> usize {
		let all: Vec<_> = self.ids.iter().copied().collect();
		self.remove(buffer, &all)
	}
}

#[cfg(test)]
mod tests {
	use spool_primitives::TextRange;

	use super::*;
	use crate::buffer::RopeBuffer;

	fn deco(line: usize) -> Decoration {
		Decoration::new(TextRange::from_coords(line, 1, line, 2), "spool-output-error")
	}

	#[test]
	fn add_and_clear_keep_buffer_in_sync() {
		let mut buffer = RopeBuffer::new();
		buffer.set_value("a\nb\n");
		let mut set = DecorationSet::new();

		let ids = set.add(&mut buffer, vec![deco(1), deco(2)]);
		assert_eq!(set.len(), 2);
		assert!(ids.iter().all(|id| buffer.decoration(*id).is_some()));

		assert_eq!(set.clear(&mut buffer), 2);
		assert!(set.is_empty());
		assert_eq!(buffer.decoration_count(), 0);
	}

	#[test]
	fn remove_in_lines_leaves_foreign_decorations() {
		let mut buffer = RopeBuffer::new();
		buffer.set_value("a\nb\n");
		let mut set = DecorationSet::new();

		let ours = set.add(&mut buffer, vec![deco(1), deco(2)]);
		let foreign = buffer.add_decorations(vec![deco(1)]);

		assert_eq!(set.remove_in_lines(&mut buffer, 1, 1), 1);
		assert!(!set.contains(ours[0]));
		assert!(set.contains(ours[1]));
		assert!(buffer.decoration(foreign[0]).is_some());
	}

	#[test]
	fn removing_unowned_ids_is_not_fatal() {
		let mut buffer = RopeBuffer::new();
		buffer.set_value("a");
		let mut set = DecorationSet::new();
		let foreign = buffer.add_decorations(vec![deco(1)]);

		assert_eq!(set.remove(&mut buffer, &foreign), 0);
		assert!(buffer.decoration(foreign[0]).is_some());
	}
}
