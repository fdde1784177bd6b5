//! Tokenizer for the extended JSON syntax.
//!
//! Recoverable problems (bad escapes, bad numbers, bad placeholders) are
//! recorded and lexing goes on; an unterminated string, raw string or
//! comment, or an unexpected character, ends it.

use crate::error::PosError;
use crate::number::parse_number;
use crate::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Null,
    Bool(bool),
    Number(f64),
    /// Double-quoted string, escapes resolved
    Str(String),
    /// Raw string, content kept verbatim
    RawStr(String),
    /// `$1`, 1-based
    Index(usize),
    /// `$name`
    Name(String),
    /// `$^Name` or a bare capitalized identifier
    OpName(String),
    /// Any other bare identifier
    Ident(String),
    /// A token already reported as an error
    Bad,
    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    // End of input
    Eof,
}

impl Token {
    /// How the token reads in a syntax error.
    pub fn describe(&self) -> String {
        match self {
            Token::Null => "null".to_string(),
            Token::Bool(b) => b.to_string(),
            Token::Number(_) => "number".to_string(),
            Token::Str(_) | Token::RawStr(_) => "string".to_string(),
            Token::Index(i) => format!("placeholder \"${}\"", i),
            Token::Name(n) => format!("placeholder \"${}\"", n),
            Token::OpName(n) => format!("operator {}", n),
            Token::Ident(n) => format!("identifier \"{}\"", n),
            Token::Bad => "invalid token".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub pos: Position,
}

/// Output of a lexing run that did not hit a fatal error.
#[derive(Debug)]
pub struct Lexed {
    pub tokens: Vec<Spanned>,
    pub errors: Vec<PosError>,
}

/// Tokenizes `src`, positions starting at `start`.
///
/// On a fatal error, returns every error found so far, the fatal one last.
pub fn lex(src: &str, start: Position) -> Result<Lexed, Vec<PosError>> {
    let mut lexer = Lexer {
        chars: src.chars().collect(),
        idx: 0,
        at: start,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    match lexer.run() {
        Ok(()) => Ok(Lexed {
            tokens: lexer.tokens,
            errors: lexer.errors,
        }),
        Err(fatal) => {
            lexer.errors.push(fatal);
            Err(lexer.errors)
        }
    }
}

struct Lexer {
    chars: Vec<char>,
    idx: usize,
    at: Position,
    tokens: Vec<Spanned>,
    errors: Vec<PosError>,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.at.advance(c, self.peek_at(1));
        self.idx += 1;
        Some(c)
    }

    fn push(&mut self, token: Token, pos: Position) {
        self.tokens.push(Spanned { token, pos });
    }

    fn run(&mut self) -> Result<(), PosError> {
        loop {
            self.skip_trivia()?;
            let pos = self.at;
            let Some(c) = self.peek() else {
                self.push(Token::Eof, pos);
                return Ok(());
            };

            let punct = match c {
                '{' => Some(Token::LBrace),
                '}' => Some(Token::RBrace),
                '[' => Some(Token::LBracket),
                ']' => Some(Token::RBracket),
                '(' => Some(Token::LParen),
                ')' => Some(Token::RParen),
                ':' => Some(Token::Colon),
                ',' => Some(Token::Comma),
                _ => None,
            };
            if let Some(token) = punct {
                self.bump();
                self.push(token, pos);
                continue;
            }

            let token = match c {
                '"' => self.string()?,
                '$' => self.placeholder(),
                '0'..='9' | '-' | '+' | '.' => self.number(),
                c if c.is_alphabetic() || c == '_' => self.word()?,
                _ => return Err(PosError::new(format!("invalid character '{}'", c), pos)),
            };
            self.push(token, pos);
        }
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), PosError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c != '/' {
                break;
            }
            let start = self.at;
            match self.peek_at(1) {
                // Line comment
                Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n' && c != '\r') {
                        self.bump();
                    }
                }
                // Block comment
                Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            None => {
                                return Err(PosError::new("unterminated comment", start));
                            }
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => return Err(PosError::new("invalid character '/'", start)),
            }
        }
        Ok(())
    }

    fn string(&mut self) -> Result<Token, PosError> {
        let start = self.at;
        self.bump();
        let mut s = String::new();
        loop {
            let esc_pos = self.at;
            match self.bump() {
                None => return Err(PosError::new("unterminated string", start)),
                Some('"') => return Ok(Token::Str(s)),
                Some('\\') => match self.bump() {
                    None => return Err(PosError::new("unterminated string", start)),
                    Some(e) => match e {
                        '"' => s.push('"'),
                        '\\' => s.push('\\'),
                        '/' => s.push('/'),
                        'b' => s.push('\u{8}'),
                        'f' => s.push('\u{c}'),
                        'n' => s.push('\n'),
                        'r' => s.push('\r'),
                        't' => s.push('\t'),
                        'u' => s.push(self.unicode_escape(esc_pos)),
                        other => {
                            self.errors.push(PosError::new(
                                format!("invalid escape sequence \"\\{}\"", other),
                                esc_pos,
                            ));
                            s.push(other);
                        }
                    },
                },
                Some(c) => s.push(c),
            }
        }
    }

    /// The part of a `\u` escape after the `u`; surrogate pairs are joined,
    /// lone surrogates become U+FFFD.
    fn unicode_escape(&mut self, esc_pos: Position) -> char {
        let Some(hi) = self.hex4(esc_pos) else {
            return char::REPLACEMENT_CHARACTER;
        };
        if !(0xD800..0xDC00).contains(&hi) {
            return char::from_u32(hi).unwrap_or(char::REPLACEMENT_CHARACTER);
        }
        if self.peek() != Some('\\') || self.peek_at(1) != Some('u') {
            return char::REPLACEMENT_CHARACTER;
        }
        let low_pos = self.at;
        self.bump();
        self.bump();
        match self.hex4(low_pos) {
            Some(lo) if (0xDC00..0xE000).contains(&lo) => {
                char::from_u32(0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00))
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            _ => char::REPLACEMENT_CHARACTER,
        }
    }

    fn hex4(&mut self, esc_pos: Position) -> Option<u32> {
        let mut n = 0;
        for _ in 0..4 {
            let Some(d) = self.peek().and_then(|c| c.to_digit(16)) else {
                self.errors
                    .push(PosError::new("invalid \\u escape sequence", esc_pos));
                return None;
            };
            self.bump();
            n = n * 16 + d;
        }
        Some(n)
    }

    /// Raw string after its `r`, starting at the delimiter.
    fn raw_string(&mut self, start: Position, open: char) -> Result<Token, PosError> {
        let close = match open {
            '(' => ')',
            '{' => '}',
            '[' => ']',
            '<' => '>',
            c => c,
        };
        self.bump();
        let mut depth = 0usize;
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(PosError::new("unterminated raw string", start)),
                Some(c) if c == close && depth == 0 => return Ok(Token::RawStr(s)),
                Some(c) => {
                    if open != close {
                        if c == open {
                            depth += 1;
                        } else if c == close {
                            depth -= 1;
                        }
                    }
                    s.push(c);
                }
            }
        }
    }

    fn number(&mut self) -> Token {
        let pos = self.at;
        let mut lit = String::new();
        while let Some(c) = self.peek() {
            let sign = c == '+' || c == '-';
            let accepted = if sign {
                lit.is_empty() || sign_allowed(&lit)
            } else {
                c.is_ascii_alphanumeric() || c == '_' || c == '.'
            };
            if !accepted {
                break;
            }
            lit.push(c);
            self.bump();
        }
        match parse_number(&lit) {
            Ok(n) => Token::Number(n),
            Err(msg) => {
                self.errors.push(PosError::new(msg, pos));
                Token::Bad
            }
        }
    }

    fn ident(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_alphanumeric() || *c == '_') {
            word.push(c);
            self.bump();
        }
        word
    }

    fn word(&mut self) -> Result<Token, PosError> {
        let start = self.at;
        let word = self.ident();
        Ok(match word.as_str() {
            "null" => Token::Null,
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            "r" => {
                self.skip_trivia()?;
                match self.peek().filter(|c| is_raw_delimiter(*c)) {
                    Some(open) => self.raw_string(start, open)?,
                    None => Token::Ident(word),
                }
            }
            _ if word.starts_with(char::is_uppercase) => Token::OpName(word),
            _ => Token::Ident(word),
        })
    }

    fn placeholder(&mut self) -> Token {
        let pos = self.at;
        self.bump();
        if self.peek() == Some('^') {
            self.bump();
            let name = self.ident();
            if name.starts_with(char::is_uppercase) {
                return Token::OpName(name);
            }
            self.errors.push(PosError::new(
                format!("invalid operator name \"^{}\"", name),
                pos,
            ));
            return Token::Bad;
        }

        let tag = self.ident();
        if tag.starts_with(|c: char| c.is_ascii_digit()) {
            return match tag.parse::<usize>() {
                Ok(n) if tag.bytes().all(|b| b.is_ascii_digit()) => Token::Index(n),
                _ => {
                    self.errors.push(PosError::new(
                        format!("invalid numeric placeholder \"${}\"", tag),
                        pos,
                    ));
                    Token::Bad
                }
            };
        }
        if tag.is_empty() {
            self.errors.push(PosError::new("invalid placeholder \"$\"", pos));
            return Token::Bad;
        }
        Token::Name(tag)
    }
}

/// Signs are part of a number at its start or right after an exponent
/// marker: `e` for decimal literals, `p` for hexadecimal ones.
fn sign_allowed(lit: &str) -> bool {
    let digits = lit.trim_start_matches(['+', '-']);
    let hex = digits.starts_with("0x") || digits.starts_with("0X");
    match lit.chars().last() {
        Some('p' | 'P') => hex,
        Some('e' | 'E') => !hex,
        _ => false,
    }
}

/// Any punctuation or symbol except `_` and closing brackets can open a
/// raw string.
fn is_raw_delimiter(c: char) -> bool {
    !(c.is_alphanumeric()
        || c.is_whitespace()
        || c.is_control()
        || matches!(c, '_' | ')' | '}' | ']' | '>'))
}
