//! Output commands as dispatched by a command layer.
//!
//! Commands arrive as JSON-like objects tagged by their identifier:
//!
//! ```json
//! { "command": "output:appendLine", "args": { "channel": "Tasks", "text": "done", "severity": "warning" } }
//! ```

use serde::{Deserialize, Serialize};
use spool_primitives::Severity;

use crate::channel::MutationHandle;
use crate::error::{OutputError, Result};
use crate::registry::ChannelRegistry;

/// A command targeting one output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args")]
pub enum OutputCommand {
	#[serde(rename = "output:append")]
	Append {
		channel: String,
		text: String,
		#[serde(default)]
		severity: Severity,
	},
	#[serde(rename = "output:appendLine")]
	AppendLine {
		channel: String,
		text: String,
		#[serde(default)]
		severity: Severity,
	},
	#[serde(rename = "output:clear")]
	Clear { channel: String },
	/// Disposes the channel and removes it from the registry.
	#[serde(rename = "output:dispose")]
	Dispose { channel: String },
	#[serde(rename = "output:show")]
	Show {
		channel: String,
		#[serde(default, rename = "preserveFocus")]
		preserve_focus: bool,
	},
	#[serde(rename = "output:hide")]
	Hide { channel: String },
	#[serde(rename = "output:setMaxHistory")]
	SetMaxHistory { channel: String, max: usize },
}

/// Result of a successfully dispatched command.
#[derive(Debug)]
pub enum CommandOutcome {
	/// A buffer mutation was queued; the handle resolves once it ran.
	Queued(MutationHandle),
	/// The command took effect immediately.
	Done,
	/// The command had nothing to do.
	Skipped,
}

impl OutputCommand {
	/// Identifier the command is registered under.
	pub fn id(&self) -> &'static str {
		match self {
			Self::Append { .. } => "output:append",
			Self::AppendLine { .. } => "output:appendLine",
			Self::Clear { .. } => "output:clear",
			Self::Dispose { .. } => "output:dispose",
			Self::Show { .. } => "output:show",
			Self::Hide { .. } => "output:hide",
			Self::SetMaxHistory { .. } => "output:setMaxHistory",
		}
	}

	pub fn channel(&self) -> &str {
		match self {
			Self::Append { channel, .. }
			| Self::AppendLine { channel, .. }
			| Self::Clear { channel }
			| Self::Dispose { channel }
			| Self::Show { channel, .. }
			| Self::Hide { channel }
			| Self::SetMaxHistory { channel, .. } => channel,
		}
	}

	/// Runs the command against `registry`.
	///
	/// Append, clear and show create the channel on first reference; the
	/// others require it to exist.
	pub fn execute(self, registry: &ChannelRegistry) -> Result<CommandOutcome> {
		if self.channel().is_empty() {
			return Err(OutputError::InvalidArgument(format!("{} requires a channel name", self.id())));
		}
		tracing::trace!(command = self.id(), channel = self.channel(), "output.command.execute");

		match self {
			Self::Append { text, .. } | Self::AppendLine { text, .. } if text.is_empty() => Ok(CommandOutcome::Skipped),
			Self::Append {
				channel,
				text,
				severity,
			} => registry.channel(&channel).append(text, severity).map(CommandOutcome::Queued),
			Self::AppendLine {
				channel,
				text,
				severity,
			} => registry
				.channel(&channel)
				.append_line(text, severity)
				.map(CommandOutcome::Queued),
			Self::Clear { channel } => registry.channel(&channel).clear().map(CommandOutcome::Queued),
			Self::Dispose { channel } => registry.delete_channel(&channel).map(|()| CommandOutcome::Done),
			Self::Show {
				channel,
				preserve_focus,
			} => {
				registry.channel(&channel);
				registry.show(&channel, preserve_focus).map(|()| CommandOutcome::Done)
			}
			Self::Hide { channel } => registry.hide(&channel).map(|()| CommandOutcome::Done),
			Self::SetMaxHistory { channel, max } => Ok(match registry.set_max_history(&channel, max)? {
				Some(handle) => CommandOutcome::Queued(handle),
				None => CommandOutcome::Skipped,
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::buffer::RopeBufferProvider;
	use crate::config::ConfigHandle;

	fn registry() -> ChannelRegistry {
		ChannelRegistry::new(RopeBufferProvider::new(), ConfigHandle::default())
	}

	#[test]
	fn parses_tagged_json() {
		let cmd: OutputCommand = serde_json::from_str(
			r#"{"command":"output:appendLine","args":{"channel":"Tasks","text":"done","severity":"warning"}}"#,
		)
		.unwrap();
		assert_eq!(
			cmd,
			OutputCommand::AppendLine {
				channel: "Tasks".into(),
				text: "done".into(),
				severity: Severity::Warning,
			}
		);

		let cmd: OutputCommand =
			serde_json::from_str(r#"{"command":"output:show","args":{"channel":"Tasks","preserveFocus":true}}"#).unwrap();
		assert_eq!(cmd.id(), "output:show");
		assert!(matches!(cmd, OutputCommand::Show { preserve_focus: true, .. }));
	}

	#[test]
	fn severity_defaults_to_info() {
		let cmd: OutputCommand =
			serde_json::from_str(r#"{"command":"output:append","args":{"channel":"c","text":"t"}}"#).unwrap();
		assert!(matches!(cmd, OutputCommand::Append { severity: Severity::Info, .. }));
	}

	#[test]
	fn unknown_command_is_rejected() {
		assert!(serde_json::from_str::<OutputCommand>(r#"{"command":"output:open","args":{"channel":"c"}}"#).is_err());
	}

	#[tokio::test]
	async fn empty_channel_name_is_invalid() {
		let registry = registry();
		let err = OutputCommand::Clear { channel: String::new() }
			.execute(&registry)
			.unwrap_err();
		assert!(matches!(err, OutputError::InvalidArgument(_)));
		assert!(registry.channels().is_empty());
	}

	#[tokio::test]
	async fn empty_text_is_skipped_without_creating_channel() {
		let registry = registry();
		let outcome = OutputCommand::Append {
			channel: "c".into(),
			text: String::new(),
			severity: Severity::Error,
		}
		.execute(&registry)
		.unwrap();
		assert!(matches!(outcome, CommandOutcome::Skipped));
		assert!(!registry.contains("c"));
	}

	#[tokio::test]
	async fn append_and_dispose_round_trip_through_registry() {
		let registry = registry();
		let outcome = OutputCommand::AppendLine {
			channel: "c".into(),
			text: "hello".into(),
			severity: Severity::Info,
		}
		.execute(&registry)
		.unwrap();
		let CommandOutcome::Queued(handle) = outcome else {
			panic!("expected a queued mutation");
		};
		handle.await.unwrap().unwrap();
		assert_eq!(registry.get("c").unwrap().content().unwrap(), "hello\n");

		let outcome = OutputCommand::Dispose { channel: "c".into() }.execute(&registry).unwrap();
		assert!(matches!(outcome, CommandOutcome::Done));
		assert!(matches!(
			OutputCommand::Hide { channel: "c".into() }.execute(&registry),
			Err(OutputError::UnknownChannel(_))
		));
	}
}
