use serde::{Deserialize, Serialize};

/// Severity of a piece of channel output.
///
/// `Info` output is plain text; `Warning` and `Error` output is decorated with
/// a severity-specific inline class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Error,
	Warning,
	#[default]
	Info,
}

impl Severity {
	/// Inline decoration class for this severity, `None` for plain output.
	pub const fn decoration_class(self) -> Option<&'static str> {
		match self {
			Self::Error => Some("spool-output-error"),
			Self::Warning => Some("spool-output-warning"),
			Self::Info => None,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Error => "error",
			Self::Warning => "warning",
			Self::Info => "info",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn info_is_undecorated() {
		assert_eq!(Severity::default(), Severity::Info);
		assert_eq!(Severity::Info.decoration_class(), None);
		assert_eq!(Severity::Warning.decoration_class(), Some("spool-output-warning"));
		assert_eq!(Severity::Error.decoration_class(), Some("spool-output-error"));
	}

	#[test]
	fn deserializes_lowercase_names() {
		let sev: Severity = serde_json::from_str("\"warning\"").unwrap();
		assert_eq!(sev, Severity::Warning);
		assert!(serde_json::from_str::<Severity>("\"Fatal\"").is_err());
	}
}
