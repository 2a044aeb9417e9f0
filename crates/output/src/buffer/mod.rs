//! Text buffer collaborator surface.
//!
//! Channels never own text directly. They edit a [`TextBuffer`] behind a
//! [`SharedBuffer`], which a [`BufferProvider`] creates asynchronously and a
//! [`BufferSlot`] hands out once it exists.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use spool_primitives::{DecorationId, TextRange};
use tokio::sync::Notify;

use crate::error::{OutputError, Result};

mod rope;

pub use rope::{RopeBuffer, RopeBufferProvider};

/// A styled range on a buffer's decoration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
	pub range: TextRange,
	/// Inline style class.
	pub class: String,
}

impl Decoration {
	pub fn new(range: TextRange, class: impl Into<String>) -> Self {
		Self {
			range,
			class: class.into(),
		}
	}
}

/// Line/column text store with a decoration layer.
///
/// Positions are 1-based. Implementations clamp out-of-range lines and
/// columns instead of failing, and keep decoration ranges attached to their
/// text across edits.
pub trait TextBuffer: Send {
	/// Number of lines, counting the empty line after a trailing terminator.
	fn line_count(&self) -> usize;

	/// Column just past the last character of `line`.
	fn line_max_column(&self, line: usize) -> usize;

	/// Column of the first non-whitespace character of `line`, 0 when blank.
	fn line_first_non_whitespace_column(&self, line: usize) -> usize;

	/// Column just past the last non-whitespace character of `line`, 0 when blank.
	fn line_last_non_whitespace_column(&self, line: usize) -> usize;

	/// Replaces `range` with `text` in one step, without undo history.
	///
	/// With `move_markers`, decorations starting exactly at a pure insertion
	/// point are pushed past the inserted text.
	fn apply_edit(&mut self, range: TextRange, text: &str, move_markers: bool);

	/// Adds decorations, returning their identifiers in input order.
	fn add_decorations(&mut self, decorations: Vec<Decoration>) -> Vec<DecorationId>;

	/// Removes decorations. Unknown identifiers are ignored.
	fn remove_decorations(&mut self, ids: &[DecorationId]);

	/// Returns the current state of one decoration.
	fn decoration(&self, id: DecorationId) -> Option<Decoration>;

	/// Identifiers of decorations touching any line in `first..=last`.
	fn decorations_in_lines(&self, first: usize, last: usize) -> Vec<DecorationId>;

	/// Replaces the whole content. Drops every decoration.
	fn set_value(&mut self, text: &str);

	/// Line terminator used for appended lines.
	fn eol(&self) -> &str;

	/// Full content as a string.
	fn text(&self) -> String;

	/// Returns true once the buffer was disposed by its owner.
	fn is_disposed(&self) -> bool;

	/// Marks the buffer disposed; later channel edits fail instead of applying.
	fn dispose(&mut self);
}

/// Buffer handle shared between a channel and its mutation tasks.
///
/// The lock is only taken for synchronous edit sections.
pub type SharedBuffer = Arc<Mutex<dyn TextBuffer>>;

/// Creates the backing buffer of a channel.
#[async_trait]
pub trait BufferProvider: Send + Sync + 'static {
	/// Creates the buffer for `channel`. The error string is reported to
	/// every mutation waiting on this buffer.
	async fn create(&self, channel: &str) -> std::result::Result<SharedBuffer, String>;
}

#[derive(Default)]
enum SlotState {
	#[default]
	Pending,
	Bound(SharedBuffer),
	Failed(String),
	Released,
}

/// Lazily bound buffer reference of one channel.
///
/// Bound at most once. [`Self::resolve`] suspends until the buffer is bound,
/// its creation failed, or the slot was released.
pub struct BufferSlot {
	channel: String,
	state: Mutex<SlotState>,
	notify: Notify,
}

impl std::fmt::Debug for BufferSlot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = match &*self.state.lock() {
			SlotState::Pending => "pending",
			SlotState::Bound(_) => "bound",
			SlotState::Failed(_) => "failed",
			SlotState::Released => "released",
		};
		f.debug_struct("BufferSlot").field("channel", &self.channel).field("state", &state).finish()
	}
}

impl BufferSlot {
	/// Creates an unbound slot for `channel`.
	pub fn new(channel: impl Into<String>) -> Self {
		Self {
			channel: channel.into(),
			state: Mutex::new(SlotState::Pending),
			notify: Notify::new(),
		}
	}

	/// Binds the creation outcome. Returns false if the slot was already bound or released.
	pub fn bind(&self, outcome: std::result::Result<SharedBuffer, String>) -> bool {
		let mut state = self.state.lock();
		if !matches!(*state, SlotState::Pending) {
			return false;
		}
		*state = match outcome {
			Ok(buffer) => SlotState::Bound(buffer),
			Err(reason) => {
				tracing::warn!(channel = %self.channel, %reason, "output.buffer.create_failed");
				SlotState::Failed(reason)
			}
		};
		drop(state);
		self.notify.notify_waiters();
		true
	}

	/// Drops the slot's buffer reference. Pending and later resolutions fail.
	pub fn release(&self) -> Option<SharedBuffer> {
		let previous = std::mem::replace(&mut *self.state.lock(), SlotState::Released);
		self.notify.notify_waiters();
		match previous {
			SlotState::Bound(buffer) => Some(buffer),
			_ => None,
		}
	}

	/// Returns the buffer if it is bound.
	pub fn get(&self) -> Option<SharedBuffer> {
		match &*self.state.lock() {
			SlotState::Bound(buffer) => Some(Arc::clone(buffer)),
			_ => None,
		}
	}

	/// Returns true once the slot left the pending state.
	pub fn is_settled(&self) -> bool {
		!matches!(*self.state.lock(), SlotState::Pending)
	}

	/// Waits for the buffer.
	pub async fn resolve(&self) -> Result<SharedBuffer> {
		loop {
			let notified = self.notify.notified();
			if let Some(outcome) = self.try_resolve() {
				return outcome;
			}
			notified.await;
		}
	}

	fn try_resolve(&self) -> Option<Result<SharedBuffer>> {
		match &*self.state.lock() {
			SlotState::Pending => None,
			SlotState::Bound(buffer) => Some(Ok(Arc::clone(buffer))),
			SlotState::Failed(reason) => Some(Err(OutputError::BufferUnavailable {
				channel: self.channel.clone(),
				reason: reason.clone(),
			})),
			SlotState::Released => Some(Err(OutputError::ChannelDisposed(self.channel.clone()))),
		}
	}
}

#[cfg(test)]
mod tests;
