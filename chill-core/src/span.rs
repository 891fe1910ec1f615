//! Source code span utilities.
//!
//! This module defines file identifiers and byte-range spans used
//! for diagnostics, editor queries and the reference index. Every
//! token and AST node carries a `Span`; `LineIndex` converts between
//! byte offsets and 0-based line/column positions.

/// Identifier for a source file.
///
/// The mapping from `FileId` to a path or document URI is kept by the
/// caller (the CLI or the editor workspace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A half-open byte range `[start, end)` within a given file.
///
/// Positions are expressed in bytes relative to the file content,
/// not in character indices or line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file_id: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Construct a new span for the given file and byte range.
    pub fn new(file_id: FileId, start: u32, end: u32) -> Span {
        Span { file_id, start, end }
    }

    /// Construct an empty span at the given position.
    pub fn empty(file_id: FileId, pos: u32) -> Span {
        Span {
            file_id,
            start: pos,
            end: pos,
        }
    }

    /// Returns the length in bytes of this span.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if this span has zero length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns a span that covers both `self` and `other`. Spans from
    /// different files cannot be joined; `self` is returned unchanged.
    pub fn to(self, other: Span) -> Span {
        if self.file_id != other.file_id {
            return self;
        }
        Span::new(self.file_id, self.start.min(other.start), self.end.max(other.end))
    }

    /// True if `offset` lies inside the span. The end offset counts as
    /// inside so that a cursor placed just after an identifier still
    /// hits it.
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// A placeholder span for synthesized nodes.
    pub fn dummy() -> Span {
        Span {
            file_id: FileId(0),
            start: 0,
            end: 0,
        }
    }
}

/// A 0-based line/character position.
///
/// `character` counts Unicode scalar values from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Position {
        Position { line, character }
    }
}

/// Byte-offset to line/column conversion for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> LineIndex {
        let mut line_starts = vec![0u32];
        for (idx, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(idx as u32 + 1);
            }
        }
        LineIndex {
            text: text.to_string(),
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of a byte offset. Offsets past the end clamp to the end.
    pub fn position(&self, offset: u32) -> Position {
        let offset = offset.min(self.text.len() as u32);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line] as usize;
        let character = self
            .text
            .get(start..offset as usize)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        Position::new(line as u32, character as u32)
    }

    /// Byte offset of a position. Characters past the end of the line
    /// clamp to the line end; lines past the end clamp to the text end.
    pub fn offset(&self, pos: Position) -> u32 {
        let Some(&start) = self.line_starts.get(pos.line as usize) else {
            return self.text.len() as u32;
        };
        let line_text = &self.text[start as usize..];
        let line_text = line_text.split('\n').next().unwrap_or("");
        let mut offset = start;
        for (n, ch) in line_text.chars().enumerate() {
            if n as u32 >= pos.character {
                break;
            }
            offset += ch.len_utf8() as u32;
        }
        offset
    }

    /// The text of a 0-based line without its line terminator.
    pub fn line_text(&self, line: u32) -> &str {
        let Some(&start) = self.line_starts.get(line as usize) else {
            return "";
        };
        let rest = &self.text[start as usize..];
        let end = rest.find('\n').unwrap_or(rest.len());
        rest[..end].trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_round_trip() {
        let idx = LineIndex::new("ab\ncdé\n\nx");
        assert_eq!(idx.position(0), Position::new(0, 0));
        assert_eq!(idx.position(4), Position::new(1, 1));
        assert_eq!(idx.position(7), Position::new(1, 3));
        assert_eq!(idx.position(9), Position::new(3, 0));
        assert_eq!(idx.offset(Position::new(1, 3)), 7);
        assert_eq!(idx.offset(Position::new(3, 0)), 9);
        assert_eq!(idx.line_text(1), "cdé");
    }

    #[test]
    fn join_covers_both() {
        let a = Span::new(FileId(0), 4, 6);
        let b = Span::new(FileId(0), 1, 3);
        assert_eq!(a.to(b), Span::new(FileId(0), 1, 6));
        assert!(a.contains(6));
        assert!(!a.contains(7));
    }
}
