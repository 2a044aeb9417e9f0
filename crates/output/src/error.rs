//! Error types for output channels.

use spool_worker::TaskError;
use thiserror::Error;

/// Errors surfaced by channel, registry, and command operations.
#[derive(Debug, Error)]
pub enum OutputError {
	/// No channel with this name is registered.
	#[error("no output channel named '{0}'")]
	UnknownChannel(String),

	/// The channel was disposed and accepts no further mutations.
	#[error("output channel '{0}' is disposed")]
	ChannelDisposed(String),

	/// The channel's buffer could not be created or was disposed underneath it.
	#[error("buffer for output channel '{channel}' is unavailable: {reason}")]
	BufferUnavailable {
		/// Channel the buffer belongs to.
		channel: String,
		/// Why the buffer cannot be used.
		reason: String,
	},

	/// The mutation task was discarded or panicked.
	#[error("mutation task failed: {0}")]
	TaskFailed(#[from] TaskError),

	/// A command was missing a required argument.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// Configuration could not be parsed.
	#[error("config parse error: {0}")]
	Config(#[from] toml::de::Error),
}

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;
