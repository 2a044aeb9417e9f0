use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use spool_primitives::{
	DecorationId, Position, Rope, TextRange, char_to_position, line_count, line_first_non_whitespace_column,
	line_last_non_whitespace_column, line_max_column, position_to_char,
};

use super::{BufferProvider, Decoration, SharedBuffer, TextBuffer};

/// Decoration anchored by char offsets.
#[derive(Debug, Clone)]
struct Anchored {
	start: usize,
	end: usize,
	class: String,
}

/// Maps one marker through an edit replacing `from..to` with `inserted` chars.
fn shift_marker(pos: usize, from: usize, to: usize, inserted: usize, stick_after: bool) -> usize {
	if pos < from {
		pos
	} else if pos > to || (pos == to && to > from) {
		pos - (to - from) + inserted
	} else if from == to {
		if stick_after { pos + inserted } else { pos }
	} else {
		from
	}
}

/// In-memory [`TextBuffer`] backed by a rope.
#[derive(Debug, Clone)]
pub struct RopeBuffer {
	text: Rope,
	eol: String,
	decorations: BTreeMap<DecorationId, Anchored>,
	next_decoration: u64,
	disposed: bool,
}

impl Default for RopeBuffer {
	fn default() -> Self {
		Self::new()
	}
}

impl RopeBuffer {
	/// Creates an empty buffer using `\n` line terminators.
	pub fn new() -> Self {
		Self::with_eol("\n")
	}

	/// Creates an empty buffer with a custom line terminator.
	pub fn with_eol(eol: impl Into<String>) -> Self {
		Self {
			text: Rope::new(),
			eol: eol.into(),
			decorations: BTreeMap::new(),
			next_decoration: 1,
			disposed: false,
		}
	}

	/// Wraps the buffer into a [`SharedBuffer`].
	pub fn shared(self) -> SharedBuffer {
		Arc::new(Mutex::new(self))
	}

	/// Lines of the buffer without terminators.
	pub fn lines(&self) -> Vec<String> {
		(1..=line_count(self.text.slice(..)))
			.map(|line| {
				let start = position_to_char(self.text.slice(..), Position::new(line, 1));
				let len = line_max_column(self.text.slice(..), line) - 1;
				self.text.slice(start..start + len).to_string()
			})
			.collect()
	}

	/// Number of decorations on the layer.
	pub fn decoration_count(&self) -> usize {
		self.decorations.len()
	}

	fn to_range(&self, anchored: &Anchored) -> TextRange {
		let text = self.text.slice(..);
		TextRange::new(char_to_position(text, anchored.start), char_to_position(text, anchored.end))
	}
}

impl TextBuffer for RopeBuffer {
	fn line_count(&self) -> usize {
		line_count(self.text.slice(..))
	}

	fn line_max_column(&self, line: usize) -> usize {
		line_max_column(self.text.slice(..), line)
	}

	fn line_first_non_whitespace_column(&self, line: usize) -> usize {
		line_first_non_whitespace_column(self.text.slice(..), line)
	}

	fn line_last_non_whitespace_column(&self, line: usize) -> usize {
		line_last_non_whitespace_column(self.text.slice(..), line)
	}

	fn apply_edit(&mut self, range: TextRange, text: &str, move_markers: bool) {
		let from = position_to_char(self.text.slice(..), range.start);
		let to = position_to_char(self.text.slice(..), range.end).max(from);
		if from < to {
			self.text.remove(from..to);
		}
		if !text.is_empty() {
			self.text.insert(from, text);
		}

		let inserted = text.chars().count();
		for anchored in self.decorations.values_mut() {
			anchored.start = shift_marker(anchored.start, from, to, inserted, move_markers);
			anchored.end = shift_marker(anchored.end, from, to, inserted, false).max(anchored.start);
		}
	}

	fn add_decorations(&mut self, decorations: Vec<Decoration>) -> Vec<DecorationId> {
		decorations
			.into_iter()
			.map(|decoration| {
				let id = DecorationId(self.next_decoration);
				self.next_decoration += 1;
				let text = self.text.slice(..);
				let anchored = Anchored {
					start: position_to_char(text, decoration.range.start),
					end: position_to_char(text, decoration.range.end),
					class: decoration.class,
				};
				self.decorations.insert(id, anchored);
				id
			})
			.collect()
	}

	fn remove_decorations(&mut self, ids: &[DecorationId]) {
		for id in ids {
			self.decorations.remove(id);
		}
	}

	fn decoration(&self, id: DecorationId) -> Option<Decoration> {
		self.decorations.get(&id).map(|anchored| Decoration {
			range: self.to_range(anchored),
			class: anchored.class.clone(),
		})
	}

	fn decorations_in_lines(&self, first: usize, last: usize) -> Vec<DecorationId> {
		self.decorations
			.iter()
			.filter(|(_, anchored)| self.to_range(anchored).intersects_lines(first, last))
			.map(|(id, _)| *id)
			.collect()
	}

	fn set_value(&mut self, text: &str) {
		self.text = Rope::from_str(text);
		self.decorations.clear();
	}

	fn eol(&self) -> &str {
		&self.eol
	}

	fn text(&self) -> String {
		self.text.to_string()
	}

	fn is_disposed(&self) -> bool {
		self.disposed
	}

	fn dispose(&mut self) {
		self.disposed = true;
	}
}

/// Creates empty [`RopeBuffer`]s, optionally after a delay that stands in for
/// a slow backing service.
#[derive(Debug, Clone)]
pub struct RopeBufferProvider {
	eol: String,
	delay: Option<Duration>,
}

impl Default for RopeBufferProvider {
	fn default() -> Self {
		Self {
			eol: "\n".to_string(),
			delay: None,
		}
	}
}

impl RopeBufferProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the line terminator of created buffers.
	#[must_use]
	pub fn eol(mut self, eol: impl Into<String>) -> Self {
		self.eol = eol.into();
		self
	}

	/// Delays every creation by `delay`.
	#[must_use]
	pub fn delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}
}

#[async_trait]
impl BufferProvider for RopeBufferProvider {
	async fn create(&self, channel: &str) -> Result<SharedBuffer, String> {
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
		tracing::trace!(channel, "output.buffer.created");
		Ok(RopeBuffer::with_eol(self.eol.clone()).shared())
	}
}
