//! Named output channels.
//!
//! Each [`OutputChannel`] owns a lazily created text buffer and a
//! [`SerialQueue`](spool_worker::SerialQueue) through which every append and
//! clear is applied in submission order, one at a time. After each append the
//! channel trims its oldest lines down to the configured history limit.
//!
//! [`ChannelRegistry`] creates channels on first reference, tracks visibility
//! and the selected channel, and [`OutputService`] is the surface command and
//! configuration layers call into.

pub mod buffer;
pub mod channel;
pub mod commands;
pub mod config;
pub mod decorations;
pub mod error;
pub mod registry;
pub mod service;

pub use buffer::{BufferProvider, BufferSlot, Decoration, RopeBuffer, RopeBufferProvider, SharedBuffer, TextBuffer};
pub use channel::{ChannelEvent, MutationHandle, OutputChannel, OutputMutation};
pub use commands::{CommandOutcome, OutputCommand};
pub use config::{ConfigHandle, DEFAULT_MAX_CHANNEL_HISTORY, OutputConfig};
pub use decorations::DecorationSet;
pub use error::{OutputError, Result};
pub use registry::{ChannelRegistry, RegistryEvent};
pub use service::OutputService;
pub use spool_primitives::Severity;
