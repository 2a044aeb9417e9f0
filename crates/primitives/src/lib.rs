//! Core types for output buffers: 1-based positions and ranges, severities,
//! decoration identifiers and rope line helpers.

/// Identifier types for buffer entities.
pub mod ids;
/// 1-based line/column positions and ranges.
pub mod position;
/// Rope line metrics in 1-based coordinates.
pub mod rope;
/// Output severity levels.
pub mod severity;

pub use ids::DecorationId;
pub use position::{Position, TextRange};
pub use rope::{
	char_to_position, line_count, line_first_non_whitespace_column, line_last_non_whitespace_column, line_max_column,
	position_to_char,
};
pub use ropey::{Rope, RopeSlice};
pub use severity::Severity;
