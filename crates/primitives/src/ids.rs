use std::fmt;

/// Identifier assigned by a buffer to one decoration.
///
/// Identifiers are unique per buffer and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationId(pub u64);

impl fmt::Display for DecorationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "decoration#{}", self.0)
	}
}
