//! Source positions of tokens and diagnostics.

use std::fmt;

use serde::Serialize;

/// Where a token starts. `line` is 1-based, `col` is 0-based and counts
/// characters, `bpos` and `pos` are byte and character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub bpos: usize,
    pub pos: usize,
    pub line: usize,
    pub col: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            bpos: 0,
            pos: 0,
            line: 1,
            col: 0,
        }
    }
}

impl Position {
    /// Moves past `c`. A `\r` immediately followed by `\n` is accounted
    /// for by the `\n`, so `\r\n` counts as a single line break.
    pub(crate) fn advance(&mut self, c: char, next: Option<char>) {
        self.bpos += c.len_utf8();
        self.pos += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.col = 0;
            }
            '\r' if next != Some('\n') => {
                self.line += 1;
                self.col = 0;
            }
            '\r' => {}
            _ => self.col += 1,
        }
    }

    /// Position of the character following an ASCII delimiter at `self`.
    pub(crate) fn after_ascii(self) -> Position {
        Position {
            bpos: self.bpos + 1,
            pos: self.pos + 1,
            line: self.line,
            col: self.col + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{} (pos {})", self.line, self.col, self.bpos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(src: &str) -> Position {
        let chars: Vec<char> = src.chars().collect();
        let mut p = Position::default();
        for (i, c) in chars.iter().enumerate() {
            p.advance(*c, chars.get(i + 1).copied());
        }
        p
    }

    #[test]
    fn line_breaks() {
        assert_eq!(walk("ab\ncd").line, 2);
        assert_eq!(walk("ab\ncd").col, 2);
        assert_eq!(walk("a\r\nb").line, 2);
        assert_eq!(walk("a\r\nb").col, 1);
        assert_eq!(walk("a\rb").line, 2);
        assert_eq!(walk("a\n\r\nb").line, 3);
    }

    #[test]
    fn bytes_and_chars_diverge() {
        let p = walk("é€x");
        assert_eq!(p.pos, 3);
        assert_eq!(p.bpos, 6);
        assert_eq!(p.to_string(), "line 1:3 (pos 6)");
    }
}
