use std::hash::Hash;

use spool_primitives::Severity;
use spool_worker::StateBarrier;

use crate::channel::MutationHandle;
use crate::commands::{CommandOutcome, OutputCommand};
use crate::error::Result;
use crate::registry::ChannelRegistry;

/// Entry point for code that writes output or sequences on application states.
///
/// `S` is the caller's state key, e.g. an application lifecycle enum.
#[derive(Debug)]
pub struct OutputService<S> {
	registry: ChannelRegistry,
	states: StateBarrier<S>,
}

impl<S> OutputService<S>
where
	S: Eq + Hash + Clone + std::fmt::Debug,
{
	pub fn new(registry: ChannelRegistry) -> Self {
		Self {
			registry,
			states: StateBarrier::new(),
		}
	}

	pub fn registry(&self) -> &ChannelRegistry {
		&self.registry
	}

	pub fn states(&self) -> &StateBarrier<S> {
		&self.states
	}

	pub fn append(&self, channel: &str, text: impl Into<String>, severity: Severity) -> Result<MutationHandle> {
		self.registry.channel(channel).append(text, severity)
	}

	pub fn append_line(&self, channel: &str, text: impl Into<String>, severity: Severity) -> Result<MutationHandle> {
		self.registry.channel(channel).append_line(text, severity)
	}

	pub fn clear(&self, channel: &str) -> Result<MutationHandle> {
		self.registry.channel(channel).clear()
	}

	pub fn set_max_history(&self, channel: &str, max: usize) -> Result<Option<MutationHandle>> {
		self.registry.set_max_history(channel, max)
	}

	pub fn mark_state_reached(&self, state: S) {
		self.states.mark_reached(state);
	}

	pub async fn wait_all(&self, states: &[S]) {
		self.states.wait_all(states).await;
	}

	pub async fn wait_any(&self, states: &[S]) {
		self.states.wait_any(states).await;
	}

	pub fn execute(&self, command: OutputCommand) -> Result<CommandOutcome> {
		command.execute(&self.registry)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use super::*;
	use crate::buffer::RopeBufferProvider;
	use crate::config::ConfigHandle;

	#[derive(Debug, Clone, PartialEq, Eq, Hash)]
	enum Phase {
		Init,
		Ready,
		Closing,
	}

	fn service() -> Arc<OutputService<Phase>> {
		Arc::new(OutputService::new(ChannelRegistry::new(
			RopeBufferProvider::new(),
			ConfigHandle::default(),
		)))
	}

	#[tokio::test]
	async fn output_after_ready_waits_for_state() {
		let service = service();
		let writer = {
			let service = Arc::clone(&service);
			tokio::spawn(async move {
				service.wait_all(&[Phase::Init, Phase::Ready]).await;
				service.append_line("log", "ready", Severity::Info).unwrap().await.unwrap()
			})
		};

		service.mark_state_reached(Phase::Init);
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!writer.is_finished());

		service.mark_state_reached(Phase::Ready);
		writer.await.unwrap().unwrap();
		assert_eq!(service.registry().get("log").unwrap().content().unwrap(), "ready\n");
	}

	#[tokio::test]
	async fn wait_any_returns_on_first_state() {
		let service = service();
		service.mark_state_reached(Phase::Closing);
		tokio::time::timeout(Duration::from_secs(1), service.wait_any(&[Phase::Ready, Phase::Closing]))
			.await
			.unwrap();
		assert!(!service.states().is_reached(&Phase::Ready));
	}

	#[tokio::test]
	async fn facade_routes_to_channels() {
		let service = service();
		service.append("a", "1", Severity::Info).unwrap();
		service.clear("a").unwrap();
		service.append("a", "2", Severity::Error).unwrap().await.unwrap().unwrap();
		assert_eq!(service.registry().get("a").unwrap().content().unwrap(), "2");
		assert!(service.set_max_history("a", 1).unwrap().is_some());
	}
}
