//! Rope line metrics in 1-based line/column coordinates.
//!
//! Line numbers outside `1..=line_count` are clamped to the nearest valid
//! line, so callers never index past the rope.

use ropey::RopeSlice;

use crate::position::Position;

/// Returns the number of lines, including the empty line after a trailing terminator.
#[inline]
pub fn line_count(text: RopeSlice) -> usize {
	text.len_lines()
}

fn clamp_line(text: RopeSlice, line: usize) -> usize {
	line.clamp(1, text.len_lines())
}

fn is_line_break(c: char) -> bool {
	matches!(c, '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

/// Returns the line's content without its terminator.
fn line_content(text: RopeSlice<'_>, line: usize) -> RopeSlice<'_> {
	let slice = text.line(clamp_line(text, line) - 1);
	let mut len = slice.len_chars();
	if len > 0 && is_line_break(slice.char(len - 1)) {
		let last = slice.char(len - 1);
		len -= 1;
		if last == '\n' && len > 0 && slice.char(len - 1) == '\r' {
			len -= 1;
		}
	}
	slice.slice(..len)
}

/// Returns the column just past the last character of `line`.
pub fn line_max_column(text: RopeSlice, line: usize) -> usize {
	line_content(text, line).len_chars() + 1
}

/// Returns the column of the first non-whitespace character of `line`, or 0 for a blank line.
pub fn line_first_non_whitespace_column(text: RopeSlice, line: usize) -> usize {
	line_content(text, line)
		.chars()
		.position(|c| !c.is_whitespace())
		.map_or(0, |idx| idx + 1)
}

/// Returns the column just past the last non-whitespace character of `line`, or 0 for a blank line.
pub fn line_last_non_whitespace_column(text: RopeSlice, line: usize) -> usize {
	let content = line_content(text, line);
	let len = content.len_chars();
	(0..len)
		.rev()
		.find(|&idx| !content.char(idx).is_whitespace())
		.map_or(0, |idx| idx + 2)
}

/// Converts a position into a char index, clamping it into the rope.
pub fn position_to_char(text: RopeSlice, pos: Position) -> usize {
	let line = clamp_line(text, pos.line);
	let column = pos.column.clamp(1, line_max_column(text, line));
	text.line_to_char(line - 1) + column - 1
}

/// Converts a char index into a position, clamping it into the rope.
pub fn char_to_position(text: RopeSlice, char_idx: usize) -> Position {
	let char_idx = char_idx.min(text.len_chars());
	let line_idx = text.char_to_line(char_idx);
	Position::new(line_idx + 1, char_idx - text.line_to_char(line_idx) + 1)
}
