use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use spool_worker::spawn;
use tokio::sync::broadcast;

use crate::buffer::BufferProvider;
use crate::channel::{MutationHandle, OutputChannel};
use crate::config::ConfigHandle;
use crate::error::{OutputError, Result};

const EVENT_BUFFER: usize = 64;

/// Notifications published by a [`ChannelRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
	ChannelAdded { name: String },
	ChannelDeleted { name: String },
	ChannelShown { name: String, preserve_focus: bool },
	ChannelHidden { name: String },
	/// Fired only when the selection actually changes.
	SelectedChannelChanged { name: Option<String> },
}

#[derive(Default)]
struct RegistryState {
	channels: FxHashMap<String, OutputChannel>,
	selected: Option<String>,
}

impl RegistryState {
	fn sorted(&self) -> Vec<OutputChannel> {
		let mut channels: Vec<_> = self.channels.values().cloned().collect();
		channels.sort_by_cached_key(|channel| (!channel.is_visible(), channel.name().to_lowercase()));
		channels
	}

	fn first_visible(&self) -> Option<String> {
		self.sorted()
			.into_iter()
			.find(OutputChannel::is_visible)
			.map(|channel| channel.name().to_string())
	}

	/// Returns the new selection if it differs from the old one.
	fn select(&mut self, name: Option<String>) -> Option<Option<String>> {
		if self.selected == name {
			return None;
		}
		self.selected = name.clone();
		Some(name)
	}
}

struct RegistryInner {
	provider: Arc<dyn BufferProvider>,
	config: ConfigHandle,
	state: Mutex<RegistryState>,
	events: broadcast::Sender<RegistryEvent>,
}

/// Name-keyed set of output channels.
///
/// Channels are created on first reference. Each new channel gets its buffer
/// from the registry's [`BufferProvider`] in the background and follows the
/// registry's [`ConfigHandle`] for its history limit.
#[derive(Clone)]
pub struct ChannelRegistry {
	inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for ChannelRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("ChannelRegistry")
			.field("channels", &state.channels.len())
			.field("selected", &state.selected)
			.finish()
	}
}

impl ChannelRegistry {
	pub fn new(provider: impl BufferProvider, config: ConfigHandle) -> Self {
		Self::with_provider(Arc::new(provider), config)
	}

	pub fn with_provider(provider: Arc<dyn BufferProvider>, config: ConfigHandle) -> Self {
		let (events, _) = broadcast::channel(EVENT_BUFFER);
		Self {
			inner: Arc::new(RegistryInner {
				provider,
				config,
				state: Mutex::new(RegistryState::default()),
				events,
			}),
		}
	}

	pub fn config(&self) -> &ConfigHandle {
		&self.inner.config
	}

	pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
		self.inner.events.subscribe()
	}

	/// Returns the channel named `name`, creating it if needed.
	pub fn channel(&self, name: &str) -> OutputChannel {
		let (channel, selection) = {
			let mut state = self.inner.state.lock();
			if let Some(channel) = state.channels.get(name) {
				return channel.clone();
			}
			let config = self.inner.config.subscribe();
			let max_history = config.borrow().max_channel_history();
			let channel = OutputChannel::new(name, max_history);
			channel.follow_config(config);
			state.channels.insert(name.to_string(), channel.clone());
			let selection = if state.selected.is_none() {
				state.select(Some(name.to_string()))
			} else {
				None
			};
			(channel, selection)
		};

		self.create_buffer(&channel);
		self.emit(RegistryEvent::ChannelAdded { name: name.to_string() });
		if let Some(name) = selection {
			self.emit(RegistryEvent::SelectedChannelChanged { name });
		}
		channel
	}

	/// Returns an existing channel.
	pub fn get(&self, name: &str) -> Result<OutputChannel> {
		self.inner
			.state
			.lock()
			.channels
			.get(name)
			.cloned()
			.ok_or_else(|| OutputError::UnknownChannel(name.to_string()))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.inner.state.lock().channels.contains_key(name)
	}

	/// Disposes and forgets a channel. A later reference creates a fresh one.
	pub fn delete_channel(&self, name: &str) -> Result<()> {
		let (channel, selection) = {
			let mut state = self.inner.state.lock();
			let channel = state
				.channels
				.remove(name)
				.ok_or_else(|| OutputError::UnknownChannel(name.to_string()))?;
			let selection = if state.selected.as_deref() == Some(name) {
				let next = state.first_visible();
				state.select(next)
			} else {
				None
			};
			(channel, selection)
		};

		channel.dispose();
		self.emit(RegistryEvent::ChannelDeleted { name: name.to_string() });
		if let Some(name) = selection {
			self.emit(RegistryEvent::SelectedChannelChanged { name });
		}
		Ok(())
	}

	/// All channels, visible ones first, each group ordered by case-insensitive name.
	pub fn channels(&self) -> Vec<OutputChannel> {
		self.inner.state.lock().sorted()
	}

	pub fn visible_channels(&self) -> Vec<OutputChannel> {
		self.channels().into_iter().filter(OutputChannel::is_visible).collect()
	}

	pub fn selected_channel(&self) -> Option<OutputChannel> {
		let state = self.inner.state.lock();
		state.selected.as_ref().and_then(|name| state.channels.get(name)).cloned()
	}

	/// Makes a channel visible and selects it.
	pub fn show(&self, name: &str, preserve_focus: bool) -> Result<()> {
		let channel = self.get(name)?;
		channel.show(preserve_focus);
		let selection = self.inner.state.lock().select(Some(name.to_string()));
		self.emit(RegistryEvent::ChannelShown {
			name: name.to_string(),
			preserve_focus,
		});
		if let Some(name) = selection {
			self.emit(RegistryEvent::SelectedChannelChanged { name });
		}
		Ok(())
	}

	/// Hides a channel. A hidden selected channel hands the selection to the first visible one.
	pub fn hide(&self, name: &str) -> Result<()> {
		let channel = self.get(name)?;
		channel.hide();
		let selection = {
			let mut state = self.inner.state.lock();
			if state.selected.as_deref() == Some(name) {
				let next = state.first_visible();
				state.select(next)
			} else {
				None
			}
		};
		self.emit(RegistryEvent::ChannelHidden { name: name.to_string() });
		if let Some(name) = selection {
			self.emit(RegistryEvent::SelectedChannelChanged { name });
		}
		Ok(())
	}

	/// Sets one channel's history limit, overriding the configured value until the next config change.
	pub fn set_max_history(&self, name: &str, max: usize) -> Result<Option<MutationHandle>> {
		self.get(name)?.set_max_history(max)
	}

	/// Disposes every channel and clears the selection.
	pub fn dispose(&self) {
		let (channels, selection) = {
			let mut state = self.inner.state.lock();
			let channels: Vec<_> = state.channels.drain().map(|(_, channel)| channel).collect();
			(channels, state.select(None))
		};
		tracing::debug!(channels = channels.len(), "output.registry.disposed");
		for channel in channels {
			channel.dispose();
		}
		if let Some(name) = selection {
			self.emit(RegistryEvent::SelectedChannelChanged { name });
		}
	}

	fn create_buffer(&self, channel: &OutputChannel) {
		let provider = Arc::clone(&self.inner.provider);
		let channel = channel.clone();
		spawn("output.buffer.create", async move {
			let outcome = provider.create(channel.name()).await;
			if !channel.buffer_slot().bind(outcome) {
				tracing::debug!(channel = %channel.name(), "output.buffer.discarded");
			}
		});
	}

	fn emit(&self, event: RegistryEvent) {
		tracing::trace!(?event, "output.registry.event");
		let _ = self.inner.events.send(event);
	}
}
