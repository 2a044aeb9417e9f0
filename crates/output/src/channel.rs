use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use spool_primitives::{DecorationId, Position, Severity, TextRange};
use spool_worker::{CloseMode, QueueClosed, SerialQueue, TaskHandle, spawn};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::buffer::{BufferSlot, Decoration, TextBuffer};
use crate::config::OutputConfig;
use crate::decorations::DecorationSet;
use crate::error::{OutputError, Result};

const EVENT_BUFFER: usize = 64;

/// Completion handle of one queued channel mutation.
///
/// Resolves to `Err(TaskError)` when the task was discarded or panicked, and to
/// the mutation's own result otherwise.
pub type MutationHandle = TaskHandle<Result<()>>;

/// Buffer edit applied through a channel's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMutation {
	/// Inserts text at the end of the buffer.
	Append { text: String, severity: Severity },
	/// Inserts text followed by the buffer's line terminator.
	AppendLine { text: String, severity: Severity },
	/// Drops all content and decorations.
	Clear,
}

impl OutputMutation {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Append { .. } => "append",
			Self::AppendLine { .. } => "append_line",
			Self::Clear => "clear",
		}
	}
}

/// Notifications published by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
	/// A mutation finished and the buffer content changed.
	ContentChanged,
	/// [`OutputChannel::set_visibility`] was called.
	VisibilityChanged { visible: bool, preserve_focus: bool },
	/// The history limit changed.
	MaxHistoryChanged { max: usize },
	/// The channel was disposed. Always the last event.
	Disposed,
}

/// State shared between a channel handle and its queued tasks.
struct ChannelCore {
	name: String,
	slot: BufferSlot,
	decorations: Mutex<DecorationSet>,
	max_history: AtomicUsize,
	events: broadcast::Sender<ChannelEvent>,
}

impl ChannelCore {
	fn emit(&self, event: ChannelEvent) {
		let _ = self.events.send(event);
	}

	async fn run(self: Arc<Self>, mutation: OutputMutation) -> Result<()> {
		let buffer = self.slot.resolve().await?;
		{
			let mut buffer = buffer.lock();
			if buffer.is_disposed() {
				tracing::warn!(channel = %self.name, kind = mutation.kind(), "output.channel.buffer_disposed");
				return Err(OutputError::BufferUnavailable {
					channel: self.name.clone(),
					reason: "buffer was disposed".to_string(),
				});
			}
			let mut decorations = self.decorations.lock();
			match mutation {
				OutputMutation::Append { text, severity } => {
					self.append(&mut *buffer, &mut decorations, &text, severity);
				}
				OutputMutation::AppendLine { mut text, severity } => {
					text.push_str(buffer.eol());
					self.append(&mut *buffer, &mut decorations, &text, severity);
				}
				OutputMutation::Clear => {
					let removed = decorations.clear(&mut *buffer);
					buffer.set_value("");
					tracing::trace!(channel = %self.name, decorations = removed, "output.channel.cleared");
				}
			}
		}
		self.emit(ChannelEvent::ContentChanged);
		Ok(())
	}

	fn append(&self, buffer: &mut dyn TextBuffer, decorations: &mut DecorationSet, text: &str, severity: Severity) {
		let last = buffer.line_count();
		let start = Position::new(last, buffer.line_max_column(last));
		if !text.is_empty() {
			buffer.apply_edit(TextRange::point(start), text, true);
			if let Some(class) = severity.decoration_class() {
				let mut end_line = buffer.line_count();
				if buffer.line_first_non_whitespace_column(end_line) == 0 {
					end_line = end_line.saturating_sub(1).max(1);
				}
				let end = Position::new(end_line, buffer.line_last_non_whitespace_column(end_line).max(1));
				if end > start {
					decorations.add(buffer, vec![Decoration::new(TextRange::new(start, end), class)]);
				}
			}
		}
		self.ensure_max_history(buffer, decorations);
	}

	/// Deletes the oldest lines so at most `max_history + 1` remain.
	fn ensure_max_history(&self, buffer: &mut dyn TextBuffer, decorations: &mut DecorationSet) {
		let max = self.max_history.load(Ordering::Acquire);
		let excess = buffer.line_count().saturating_sub(max).saturating_sub(1);
		if excess == 0 {
			return;
		}
		decorations.remove_in_lines(buffer, 1, excess);
		let column = buffer.line_first_non_whitespace_column(excess + 1).max(1);
		buffer.apply_edit(TextRange::from_coords(1, 1, excess + 1, column), "", false);
		tracing::trace!(channel = %self.name, lines = excess, max, "output.channel.trimmed");
	}
}

struct ChannelInner {
	core: Arc<ChannelCore>,
	queue: SerialQueue,
	visible: AtomicBool,
	disposed: AtomicBool,
	shutdown: CancellationToken,
}

impl Drop for ChannelInner {
	fn drop(&mut self) {
		self.shutdown.cancel();
	}
}

/// A named output stream backed by a lazily created buffer.
///
/// Appends and clears are queued and applied one at a time in submission
/// order, even while the buffer does not exist yet. Cloning yields another
/// handle to the same channel.
#[derive(Clone)]
pub struct OutputChannel {
	inner: Arc<ChannelInner>,
}

impl std::fmt::Debug for OutputChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OutputChannel")
			.field("name", &self.inner.core.name)
			.field("visible", &self.is_visible())
			.field("disposed", &self.is_disposed())
			.field("max_history", &self.max_history())
			.finish()
	}
}

impl OutputChannel {
	/// Creates a visible channel whose buffer is bound later through [`Self::buffer_slot`].
	pub fn new(name: impl Into<String>, max_history: usize) -> Self {
		let name = name.into();
		let (events, _) = broadcast::channel(EVENT_BUFFER);
		let core = Arc::new(ChannelCore {
			slot: BufferSlot::new(name.clone()),
			decorations: Mutex::new(DecorationSet::new()),
			max_history: AtomicUsize::new(max_history),
			events,
			name: name.clone(),
		});
		tracing::debug!(channel = %name, max_history, "output.channel.created");
		Self {
			inner: Arc::new(ChannelInner {
				queue: SerialQueue::new(format!("output:{name}")),
				core,
				visible: AtomicBool::new(true),
				disposed: AtomicBool::new(false),
				shutdown: CancellationToken::new(),
			}),
		}
	}

	pub fn name(&self) -> &str {
		&self.inner.core.name
	}

	/// Slot the channel's buffer is bound into.
	pub fn buffer_slot(&self) -> &BufferSlot {
		&self.inner.core.slot
	}

	/// Queues `mutation` behind every mutation submitted before it.
	pub fn enqueue(&self, mutation: OutputMutation) -> Result<MutationHandle> {
		if self.is_disposed() {
			return Err(self.disposed_error());
		}
		let kind = mutation.kind();
		let core = Arc::clone(&self.inner.core);
		let handle = self
			.inner
			.queue
			.enqueue(core.run(mutation))
			.map_err(|QueueClosed| self.disposed_error())?;
		tracing::trace!(channel = %self.name(), kind, seq = handle.seq(), "output.channel.enqueued");
		Ok(handle)
	}

	pub fn append(&self, text: impl Into<String>, severity: Severity) -> Result<MutationHandle> {
		self.enqueue(OutputMutation::Append {
			text: text.into(),
			severity,
		})
	}

	pub fn append_line(&self, text: impl Into<String>, severity: Severity) -> Result<MutationHandle> {
		self.enqueue(OutputMutation::AppendLine {
			text: text.into(),
			severity,
		})
	}

	pub fn clear(&self) -> Result<MutationHandle> {
		self.enqueue(OutputMutation::Clear)
	}

	pub fn max_history(&self) -> usize {
		self.inner.core.max_history.load(Ordering::Acquire)
	}

	/// Changes the history limit and queues an empty append that trims to it.
	///
	/// Returns `None` when the limit did not change.
	pub fn set_max_history(&self, max: usize) -> Result<Option<MutationHandle>> {
		if self.is_disposed() {
			return Err(self.disposed_error());
		}
		let previous = self.inner.core.max_history.swap(max, Ordering::AcqRel);
		if previous == max {
			return Ok(None);
		}
		tracing::debug!(channel = %self.name(), previous, max, "output.channel.max_history");
		self.inner.core.emit(ChannelEvent::MaxHistoryChanged { max });
		self.append("", Severity::Info).map(Some)
	}

	pub fn is_visible(&self) -> bool {
		self.inner.visible.load(Ordering::Acquire)
	}

	pub fn show(&self, preserve_focus: bool) {
		self.set_visibility(true, preserve_focus);
	}

	pub fn hide(&self) {
		self.set_visibility(false, false);
	}

	/// Sets the visibility flag and publishes [`ChannelEvent::VisibilityChanged`].
	pub fn set_visibility(&self, visible: bool, preserve_focus: bool) {
		self.inner.visible.store(visible, Ordering::Release);
		self.inner.core.emit(ChannelEvent::VisibilityChanged { visible, preserve_focus });
	}

	/// Current buffer content, `None` while the buffer is not bound.
	pub fn content(&self) -> Option<String> {
		self.inner.core.slot.get().map(|buffer| buffer.lock().text())
	}

	/// Decorations this channel currently owns.
	pub fn decoration_ids(&self) -> Vec<DecorationId> {
		self.inner.core.decorations.lock().ids().collect()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
		self.inner.core.events.subscribe()
	}

	/// Waits until every mutation queued before this call has finished.
	pub async fn flush(&self) {
		self.inner.queue.flush().await;
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.load(Ordering::Acquire)
	}

	/// Stops the channel. Idempotent.
	///
	/// The running mutation finishes; queued ones are discarded. The buffer
	/// reference is released, not disposed.
	pub fn dispose(&self) {
		if self.inner.disposed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.inner.shutdown.cancel();
		let discarded = self.inner.queue.close(CloseMode::Discard);
		self.inner.core.slot.release();
		tracing::debug!(channel = %self.name(), discarded, "output.channel.disposed");
		self.inner.core.emit(ChannelEvent::Disposed);
	}

	/// Applies every history-limit change `rx` observes from now on, until disposal.
	///
	/// Values already seen by `rx` are not applied, so subscribe before reading
	/// the limit the channel was created with.
	pub fn follow_config(&self, mut rx: watch::Receiver<OutputConfig>) {
		let weak = Arc::downgrade(&self.inner);
		let token = self.inner.shutdown.clone();
		let name = self.name().to_string();
		spawn("output.channel.config", async move {
			loop {
				tokio::select! {
					biased;
					_ = token.cancelled() => break,
					changed = rx.changed() => {
						if changed.is_err() {
							break;
						}
						let max = rx.borrow_and_update().max_channel_history();
						let Some(channel) = Self::upgrade(&weak) else {
							break;
						};
						if let Err(err) = channel.set_max_history(max) {
							tracing::debug!(channel = %name, %err, "output.channel.config_rejected");
							break;
						}
					}
				}
			}
			tracing::trace!(channel = %name, "output.channel.config_stopped");
		});
	}

	fn upgrade(weak: &Weak<ChannelInner>) -> Option<Self> {
		weak.upgrade().map(|inner| Self { inner })
	}

	fn disposed_error(&self) -> OutputError {
		OutputError::ChannelDisposed(self.name().to_string())
	}
}
