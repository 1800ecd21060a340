//! Source positions: parser locations and byte offset lookups for maps.

use std::fmt;

/// A 1-based line/column position, columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Line 1, column 1.
    pub const fn start() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Move past `text`.
    pub fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Precomputed line starts for random-access offset lookups.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// Zero-based line containing `offset` and the byte offset that line starts at.
    fn line_of(&self, offset: usize) -> (usize, usize) {
        let offset = self.clamp(offset);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        (line, self.line_starts[line])
    }

    /// Clamp into the source and back onto a char boundary.
    fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// 0-based line and UTF-16 column, the convention source maps use.
    pub fn utf16_position(&self, offset: usize) -> (u32, u32) {
        let (line, start) = self.line_of(offset);
        let column = self.source[start..self.clamp(offset)].encode_utf16().count();
        (line as u32, column as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_newlines() {
        let mut loc = Location::start();
        loc.advance("ab\ncd");
        assert_eq!(loc, Location { line: 2, column: 3 });
    }

    #[test]
    fn display() {
        assert_eq!(Location { line: 3, column: 7 }.to_string(), "3:7");
    }

    #[test]
    fn position_lookup() {
        let index = LineIndex::new("div {\n  color: red;\n}");
        assert_eq!(index.utf16_position(0), (0, 0));
        assert_eq!(index.utf16_position(4), (0, 4));
        assert_eq!(index.utf16_position(8), (1, 2));
        assert_eq!(index.utf16_position(20), (2, 0));
    }

    #[test]
    fn offset_past_end_is_clamped() {
        let index = LineIndex::new("ab");
        assert_eq!(index.utf16_position(100), (0, 2));
    }

    #[test]
    fn advance_counts_characters_not_bytes() {
        let mut loc = Location::start();
        loc.advance("é");
        assert_eq!(loc, Location { line: 1, column: 2 });
    }

    #[test]
    fn utf16_columns() {
        let index = LineIndex::new("a\n😀b");
        // The emoji is one char but two UTF-16 units.
        assert_eq!(index.utf16_position(6), (1, 2));
        assert_eq!(index.utf16_position(0), (0, 0));
    }

    #[test]
    fn mid_character_offset_rounds_down() {
        let index = LineIndex::new("é");
        assert_eq!(index.utf16_position(1), (0, 0));
    }
}
