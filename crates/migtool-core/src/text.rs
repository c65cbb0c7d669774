//! Text position utilities.
//!
//! Lines are **1-indexed**, byte offsets **0-indexed**. Line boundaries
//! are `\n`; a preceding `\r` belongs to the line it terminates.

/// 1-indexed line containing byte `offset`.
///
/// Offsets past the end report the last line.
pub fn line_of_offset(source: &str, offset: usize) -> u32 {
    let offset = offset.min(source.len());
    1 + source.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u32
}

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |p| p + 1)
}

/// Byte offset just past the newline ending the line containing `offset`,
/// or the source length on the last line.
pub fn next_line_start(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(source.len(), |p| offset + p + 1)
}

/// Leading spaces and tabs of the line containing `offset`.
pub fn indentation_at(source: &str, offset: usize) -> &str {
    let start = line_start(source, offset);
    let rest = &source[start..];
    let width = rest
        .bytes()
        .take_while(|&b| b == b' ' || b == b'\t')
        .count();
    &rest[..width]
}

/// True when only spaces and tabs precede `offset` on its line.
pub fn only_whitespace_before(source: &str, offset: usize) -> bool {
    indentation_at(source, offset).len() == offset - line_start(source, offset)
}

/// Newline sequence used by the source (`\r\n` if it appears first).
pub fn detect_newline(source: &str) -> &'static str {
    match source.find('\n') {
        Some(i) if i > 0 && source.as_bytes()[i - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers_are_one_indexed() {
        let source = "a\nbc\n\nd";
        assert_eq!(line_of_offset(source, 0), 1);
        assert_eq!(line_of_offset(source, 2), 2);
        assert_eq!(line_of_offset(source, 6), 4);
        assert_eq!(line_of_offset(source, 100), 4);
    }

    #[test]
    fn line_bounds() {
        let source = "ab\n  cd\nef";
        assert_eq!(line_start(source, 5), 3);
        assert_eq!(next_line_start(source, 5), 8);
        assert_eq!(next_line_start(source, 9), 10);
        assert_eq!(line_start(source, 0), 0);
    }

    #[test]
    fn indentation() {
        let source = "x\n\t  using A;\n";
        assert_eq!(indentation_at(source, 6), "\t  ");
        assert!(only_whitespace_before(source, 5));
        assert!(!only_whitespace_before(source, 8));
    }

    #[test]
    fn newline_style() {
        assert_eq!(detect_newline("a\r\nb"), "\r\n");
        assert_eq!(detect_newline("a\nb\r\n"), "\n");
        assert_eq!(detect_newline("single"), "\n");
    }
}
