/// A position in a buffer in 1-based line/column coordinates.
///
/// Column `n` sits before the `n`-th character of the line, so the column
/// after the last character of a line of length `len` is `len + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
	/// One-based line number.
	pub line: usize,
	/// One-based column.
	pub column: usize,
}

impl Position {
	/// Creates a new position.
	pub const fn new(line: usize, column: usize) -> Self {
		Self { line, column }
	}

	/// The first position of any buffer.
	pub const fn start() -> Self {
		Self::new(1, 1)
	}
}

impl Default for Position {
	fn default() -> Self {
		Self::start()
	}
}

/// A text range between two positions.
///
/// `start` is inclusive and `end` is exclusive. Constructors normalize the
/// order so `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange {
	/// Start position (inclusive).
	pub start: Position,
	/// End position (exclusive).
	pub end: Position,
}

impl TextRange {
	/// Creates a range from two positions in either order.
	pub fn new(a: Position, b: Position) -> Self {
		if a <= b { Self { start: a, end: b } } else { Self { start: b, end: a } }
	}

	/// Creates a range from raw line/column pairs.
	pub fn from_coords(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
		Self::new(Position::new(start_line, start_column), Position::new(end_line, end_column))
	}

	/// Creates a zero-length range at a position.
	pub const fn point(pos: Position) -> Self {
		Self { start: pos, end: pos }
	}

	/// Returns true if the range covers no text.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Returns true if the range touches any line in `first..=last`.
	pub fn intersects_lines(&self, first: usize, last: usize) -> bool {
		self.start.line <= last && self.end.line >= first
	}
}
