use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::select_all;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::Notify;

/// One-shot signal for a single state key.
#[derive(Debug, Default)]
struct StateSignal {
	reached: AtomicBool,
	notify: Notify,
}

impl StateSignal {
	/// Resolves the signal. Returns true on the first resolution only.
	fn resolve(&self) -> bool {
		let first = !self.reached.swap(true, Ordering::SeqCst);
		if first {
			self.notify.notify_waiters();
		}
		first
	}

	fn is_resolved(&self) -> bool {
		self.reached.load(Ordering::SeqCst)
	}

	async fn resolved(&self) {
		loop {
			// Register interest before checking the flag to avoid a lost wakeup.
			let notified = self.notify.notified();
			if self.is_resolved() {
				return;
			}
			notified.await;
		}
	}
}

/// Synchronization point keyed by arbitrary state values.
///
/// Producers call [`Self::mark_reached`]; consumers wait for one, all, or any
/// set of states regardless of arrival order. A state's handle is created on
/// first reference, by either side, and is never removed.
///
/// Waits have no timeout and cannot be cancelled from inside; wrap them in
/// `tokio::time::timeout` when a state might never be reached.
#[derive(Debug)]
pub struct StateBarrier<S> {
	states: Mutex<FxHashMap<S, Arc<StateSignal>>>,
}

impl<S> Default for StateBarrier<S> {
	fn default() -> Self {
		Self {
			states: Mutex::new(FxHashMap::default()),
		}
	}
}

impl<S> StateBarrier<S>
where
	S: Eq + Hash + Clone + std::fmt::Debug,
{
	/// Creates an empty barrier.
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks `state` as reached, waking every waiter blocked on it.
	///
	/// Marking the same state again has no further effect.
	pub fn mark_reached(&self, state: S) {
		let signal = self.signal(&state);
		if signal.resolve() {
			tracing::debug!(?state, "worker.barrier.reached");
		}
	}

	/// Returns true if `state` has been marked.
	pub fn is_reached(&self, state: &S) -> bool {
		self.states.lock().get(state).is_some_and(|signal| signal.is_resolved())
	}

	/// Returns every state marked so far, in no particular order.
	pub fn reached(&self) -> Vec<S> {
		self.states
			.lock()
			.iter()
			.filter(|(_, signal)| signal.is_resolved())
			.map(|(state, _)| state.clone())
			.collect()
	}

	/// Returns the number of states referenced so far, reached or pending.
	pub fn len(&self) -> usize {
		self.states.lock().len()
	}

	/// Returns true if no state has been referenced yet.
	pub fn is_empty(&self) -> bool {
		self.states.lock().is_empty()
	}

	/// Waits until `state` is marked.
	pub async fn wait_for(&self, state: S) {
		let signal = self.signal(&state);
		signal.resolved().await;
	}

	/// Waits until every listed state is marked. An empty list is satisfied immediately.
	pub async fn wait_all(&self, states: &[S]) {
		let signals = self.signals(states);
		for signal in &signals {
			signal.resolved().await;
		}
	}

	/// Waits until at least one listed state is marked. An empty list is satisfied immediately.
	///
	/// The remaining handles are left pending for future waits.
	pub async fn wait_any(&self, states: &[S]) {
		let signals = self.signals(states);
		if signals.is_empty() || signals.iter().any(|signal| signal.is_resolved()) {
			return;
		}
		select_all(signals.iter().map(|signal| Box::pin(signal.resolved()))).await;
	}

	fn signal(&self, state: &S) -> Arc<StateSignal> {
		let mut states = self.states.lock();
		Arc::clone(states.entry(state.clone()).or_default())
	}

	fn signals(&self, states: &[S]) -> Vec<Arc<StateSignal>> {
		let mut map = self.states.lock();
		states.iter().map(|state| Arc::clone(map.entry(state.clone()).or_default())).collect()
	}
}
