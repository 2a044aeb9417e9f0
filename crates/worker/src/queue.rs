use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{Notify, oneshot};

use crate::panic::join_error_panic_message;
use crate::spawn::spawn;

/// Failure delivered to a [`TaskHandle`] instead of the task's output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
	/// The task was discarded before it started.
	#[error("task was discarded before it ran")]
	Cancelled,
	/// The task panicked while running.
	#[error("task panicked: {0}")]
	Panicked(String),
}

/// Enqueue was rejected because the queue no longer accepts tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("serial queue is closed")]
pub struct QueueClosed;

/// What happens to queued tasks that have not started when a queue closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
	/// Run every task already queued, then stop.
	Drain,
	/// Drop tasks that have not started; their handles report [`TaskError::Cancelled`].
	Discard,
}

/// Completion handle for one queued task.
///
/// Resolves to the task's output once it ran. Dropping the handle does not
/// cancel the task.
#[derive(Debug)]
pub struct TaskHandle<T> {
	seq: u64,
	rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
	/// Submission sequence number of the task, unique per queue.
	pub fn seq(&self) -> u64 {
		self.seq
	}
}

impl<T> Future for TaskHandle<T> {
	type Output = Result<T, TaskError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx)
			.poll(cx)
			.map(|res| res.unwrap_or(Err(TaskError::Cancelled)))
	}
}

struct QueuedTask {
	seq: u64,
	run: BoxFuture<'static, ()>,
}

#[derive(Default)]
struct QueueState {
	pending: VecDeque<QueuedTask>,
	in_flight: bool,
	closed: bool,
	next_seq: u64,
}

struct QueueInner {
	label: String,
	state: Mutex<QueueState>,
	notify_task: Notify,
	notify_idle: Notify,
}

/// FIFO task queue that runs at most one task at a time.
///
/// Tasks start in exactly the order they were enqueued; a task starts only
/// after the previous one finished, whether it returned, failed, or
/// panicked. A single worker loop spawned at construction drains the queue.
///
/// Dropping the queue closes it in [`CloseMode::Drain`] mode.
pub struct SerialQueue {
	inner: Arc<QueueInner>,
}

impl std::fmt::Debug for SerialQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("SerialQueue")
			.field("label", &self.inner.label)
			.field("pending", &state.pending.len())
			.field("in_flight", &state.in_flight)
			.field("closed", &state.closed)
			.finish()
	}
}

impl SerialQueue {
	/// Creates a queue and spawns its worker loop.
	pub fn new(label: impl Into<String>) -> Self {
		let inner = Arc::new(QueueInner {
			label: label.into(),
			state: Mutex::new(QueueState::default()),
			notify_task: Notify::new(),
			notify_idle: Notify::new(),
		});
		spawn("serial_queue", drain(Arc::clone(&inner)));
		Self { inner }
	}

	/// Returns the label given at construction.
	pub fn label(&self) -> &str {
		&self.inner.label
	}

	/// Appends a task without waiting for it to start.
	pub fn enqueue<F, T>(&self, task: F) -> Result<TaskHandle<T>, QueueClosed>
	where
		F: Future<Output = T> + Send + 'static,
		T: Send + 'static,
	{
		let (tx, rx) = oneshot::channel();
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(QueueClosed);
		}
		let seq = state.next_seq;
		state.next_seq = state.next_seq.wrapping_add(1);

		let label = self.inner.label.clone();
		let run = Box::pin(async move {
			// Running the task on its own tokio task isolates panics from the drain loop.
			let outcome = match spawn("serial_queue.task", task).await {
				Ok(value) => Ok(value),
				Err(err) => match join_error_panic_message(err) {
					Some(msg) => {
						tracing::warn!(queue = %label, seq, panic = %msg, "worker.queue.task_panicked");
						Err(TaskError::Panicked(msg))
					}
					None => Err(TaskError::Cancelled),
				},
			};
			let _ = tx.send(outcome);
		});
		state.pending.push_back(QueuedTask { seq, run });
		drop(state);

		self.inner.notify_task.notify_one();
		Ok(TaskHandle { seq, rx })
	}

	/// Stops accepting tasks. Returns the number of tasks discarded.
	///
	/// The task currently running always finishes.
	pub fn close(&self, mode: CloseMode) -> usize {
		let discarded = {
			let mut state = self.inner.state.lock();
			state.closed = true;
			match mode {
				CloseMode::Drain => VecDeque::new(),
				CloseMode::Discard => std::mem::take(&mut state.pending),
			}
		};
		let count = discarded.len();
		drop(discarded);

		if count > 0 {
			tracing::debug!(queue = %self.inner.label, discarded = count, "worker.queue.discarded");
		}
		self.inner.notify_task.notify_one();
		self.inner.notify_idle.notify_waiters();
		count
	}

	/// Returns true once the queue stopped accepting tasks.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Returns the number of tasks waiting to start.
	pub fn len(&self) -> usize {
		self.inner.state.lock().pending.len()
	}

	/// Returns true when no task is waiting to start.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Waits until every task enqueued before this call has finished.
	pub async fn flush(&self) {
		match self.enqueue(async {}) {
			Ok(marker) => {
				let _ = marker.await;
			}
			Err(QueueClosed) => self.idle().await,
		}
	}

	/// Waits until no task is queued or running.
	pub async fn idle(&self) {
		loop {
			let notified = self.inner.notify_idle.notified();
			{
				let state = self.inner.state.lock();
				if state.pending.is_empty() && !state.in_flight {
					return;
				}
			}
			notified.await;
		}
	}
}

impl Drop for SerialQueue {
	fn drop(&mut self) {
		self.close(CloseMode::Drain);
	}
}

async fn drain(inner: Arc<QueueInner>) {
	loop {
		let notified = inner.notify_task.notified();
		let next = {
			let mut state = inner.state.lock();
			let next = state.pending.pop_front();
			if next.is_none() && state.closed {
				break;
			}
			state.in_flight = next.is_some();
			next
		};

		match next {
			Some(task) => {
				tracing::trace!(queue = %inner.label, seq = task.seq, "worker.queue.dispatch");
				task.run.await;
				inner.state.lock().in_flight = false;
				inner.notify_idle.notify_waiters();
			}
			None => notified.await,
		}
	}
	inner.notify_idle.notify_waiters();
	tracing::debug!(queue = %inner.label, "worker.queue.stopped");
}
