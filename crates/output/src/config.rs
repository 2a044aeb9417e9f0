//! Output configuration.
//!
//! Read from the `[output]` table of a TOML document:
//!
//! ```toml
//! [output]
//! max-channel-history = 1000
//! ```
//!
//! Live changes are published through a [`ConfigHandle`]; every channel
//! created by a registry follows it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::Result;

/// Lines a channel keeps when nothing is configured.
pub const DEFAULT_MAX_CHANNEL_HISTORY: usize = 1000;

/// Output channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
	/// Maximum retained lines per channel. Negative values behave as 0.
	pub max_channel_history: i64,
}

impl Default for OutputConfig {
	fn default() -> Self {
		Self {
			max_channel_history: DEFAULT_MAX_CHANNEL_HISTORY as i64,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
	output: OutputConfig,
}

impl OutputConfig {
	/// Creates a config with the given history limit.
	pub fn with_max_channel_history(max: i64) -> Self {
		Self { max_channel_history: max }
	}

	/// Parses the `[output]` table of a TOML document. Missing keys keep their defaults.
	pub fn from_toml(src: &str) -> Result<Self> {
		let file: ConfigFile = toml::from_str(src)?;
		Ok(file.output)
	}

	/// Effective history limit, clamped to zero.
	pub fn max_channel_history(&self) -> usize {
		usize::try_from(self.max_channel_history).unwrap_or(0)
	}
}

/// Shared, observable output configuration.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
	tx: Arc<watch::Sender<OutputConfig>>,
}

impl Default for ConfigHandle {
	fn default() -> Self {
		Self::new(OutputConfig::default())
	}
}

impl ConfigHandle {
	pub fn new(config: OutputConfig) -> Self {
		let (tx, _) = watch::channel(config);
		Self { tx: Arc::new(tx) }
	}

	/// Returns the current configuration.
	pub fn current(&self) -> OutputConfig {
		self.tx.borrow().clone()
	}

	/// Publishes `config`. Returns false if it equals the current one.
	pub fn update(&self, config: OutputConfig) -> bool {
		let changed = self.tx.send_if_modified(|current| {
			if *current == config {
				return false;
			}
			*current = config;
			true
		});
		if changed {
			tracing::debug!(max_channel_history = self.tx.borrow().max_channel_history, "output.config.updated");
		}
		changed
	}

	/// Parses `src` and publishes the result.
	pub fn reload(&self, src: &str) -> Result<bool> {
		Ok(self.update(OutputConfig::from_toml(src)?))
	}

	/// Subscribes to configuration changes.
	pub fn subscribe(&self) -> watch::Receiver<OutputConfig> {
		self.tx.subscribe()
	}
}
