//! Recursive-descent grammar over the token stream, building the generic
//! tree: `nil`, `bool`, `float64`, `string`, `[]interface {}` and
//! `map[string]interface {}`, plus whatever placeholders and operator
//! callbacks substitute.

use tdeep_core::{Type, Value};
use tracing::trace;

use crate::error::PosError;
use crate::lexer::{lex, Spanned, Token};
use crate::position::Position;
use crate::{OpCall, ParseOpts};

/// Parses `src` whose first character sits at `start`.
///
/// Errors are sorted by position; a fatal one, if any, ends the list.
pub(crate) fn parse_at(src: &str, opts: &ParseOpts, start: Position) -> Result<Value, Vec<PosError>> {
    let lexed = lex(src, start)?;
    let mut parser = Parser {
        tokens: &lexed.tokens,
        pos: 0,
        opts,
        errors: lexed.errors,
    };
    let result = parser.document();
    let mut errors = parser.errors;
    errors.sort_by_key(|e| e.pos.pos);
    match result {
        Ok(v) if errors.is_empty() => Ok(v),
        Ok(_) => Err(errors),
        Err(fatal) => {
            errors.push(fatal);
            Err(errors)
        }
    }
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    opts: &'a ParseOpts,
    /// Recoverable errors; the fatal one travels through `Err`.
    errors: Vec<PosError>,
}

impl<'a> Parser<'a> {
    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn advance(&mut self) -> Spanned {
        let t = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn unexpected(&self, expecting: &str) -> PosError {
        PosError::new(
            format!(
                "syntax error: unexpected {}, expecting {}",
                self.peek().describe(),
                expecting
            ),
            self.cur().pos,
        )
    }

    fn expect(&mut self, token: Token, expecting: &str) -> Result<(), PosError> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expecting))
        }
    }

    fn document(&mut self) -> Result<Value, PosError> {
        let value = self.value()?;
        if *self.peek() != Token::Eof {
            return Err(self.unexpected("end of input"));
        }
        Ok(value)
    }

    fn value(&mut self) -> Result<Value, PosError> {
        let Spanned { token, pos } = self.advance();
        match token {
            Token::Null | Token::Bad => Ok(Value::Invalid),
            Token::Bool(b) => Ok(b.into()),
            Token::Number(n) => Ok(n.into()),
            Token::Str(s) => Ok(self.string(s, pos)),
            Token::RawStr(s) => Ok(s.into()),
            Token::Index(n) => Ok(self.index(n, pos)),
            Token::Name(name) => Ok(self.named(&name, pos)),
            Token::OpName(name) => self.operator(name, pos),
            Token::Ident(word) => {
                self.errors
                    .push(PosError::new(format!("unknown identifier \"{}\"", word), pos));
                if *self.peek() == Token::LParen {
                    self.advance();
                    self.params()?;
                }
                Ok(Value::Invalid)
            }
            Token::LBrace => self.object(),
            Token::LBracket => self.array(),
            other => Err(PosError::new(
                format!("syntax error: unexpected {}", other.describe()),
                pos,
            )),
        }
    }

    // -- Composites -------------------------------------------

    /// After `{`. Trailing commas are accepted, a repeated key keeps its
    /// last value.
    fn object(&mut self) -> Result<Value, PosError> {
        let mut entries: Vec<(Value, Value)> = Vec::new();
        loop {
            if *self.peek() == Token::RBrace {
                self.advance();
                break;
            }
            let key = match self.peek() {
                Token::Str(s) | Token::RawStr(s) => Value::from(s.as_str()),
                _ => return Err(self.unexpected("a string key or '}'")),
            };
            self.advance();
            self.expect(Token::Colon, "':'")?;
            let value = Value::any(self.value()?);
            match entries.iter_mut().find(|(k, _)| k.as_str() == key.as_str()) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RBrace => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
        Ok(Value::map(&Type::string(), &Type::any(), entries))
    }

    /// After `[`.
    fn array(&mut self) -> Result<Value, PosError> {
        let mut items = Vec::new();
        loop {
            if *self.peek() == Token::RBracket {
                self.advance();
                break;
            }
            items.push(Value::any(self.value()?));
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RBracket => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
        Ok(Value::slice(&Type::any(), items))
    }

    // -- Substitutions ----------------------------------------

    /// A string consisting of a placeholder or an operator call is parsed
    /// again and replaced by its value. `$$` escapes a leading `$`.
    ///
    /// The content is lexed once unescaped, starting just after the opening
    /// quote, so error columns are exact only up to the first escape
    /// sequence of the string.
    fn string(&mut self, s: String, pos: Position) -> Value {
        if let Some(rest) = s.strip_prefix("$$") {
            return Value::from(format!("${}", rest));
        }
        if s.len() < 2 || !s.starts_with('$') {
            return s.into();
        }
        trace!(at = %pos, "parsing string content");
        match parse_at(&s, self.opts, pos.after_ascii()) {
            Ok(v) => v,
            Err(errors) => {
                self.errors.extend(errors);
                Value::Invalid
            }
        }
    }

    fn index(&mut self, n: usize, pos: Position) -> Value {
        let given = self.opts.placeholders.len();
        if n == 0 {
            self.errors.push(PosError::new(
                "invalid numeric placeholder \"$0\", it should start at \"$1\"",
                pos,
            ));
            return Value::Invalid;
        }
        if n > given {
            let given = match given {
                0 => "no params given".to_string(),
                1 => "only 1 param given".to_string(),
                g => format!("only {} params given", g),
            };
            self.errors.push(PosError::new(
                format!("invalid numeric placeholder \"${}\", {}", n, given),
                pos,
            ));
            return Value::Invalid;
        }
        self.opts.placeholders[n - 1].clone()
    }

    fn named(&mut self, name: &str, pos: Position) -> Value {
        match self.opts.placeholders_by_name.get(name) {
            Some(v) => v.clone(),
            None => {
                self.errors
                    .push(PosError::new(format!("unknown placeholder \"${}\"", name), pos));
                Value::Invalid
            }
        }
    }

    /// An operator name, optionally followed by its parenthesized params.
    fn operator(&mut self, name: String, pos: Position) -> Result<Value, PosError> {
        let params = if *self.peek() == Token::LParen {
            self.advance();
            self.params()?
        } else {
            Vec::new()
        };
        let opts = self.opts;
        let Some(op_fn) = &opts.op_fn else {
            self.errors
                .push(PosError::new(format!("unknown operator \"{}\"", name), pos));
            return Ok(Value::Invalid);
        };
        trace!(operator = %name, params = params.len(), "building operator");
        match op_fn(OpCall { name, params }, pos) {
            Ok(v) => Ok(v),
            Err(e) => {
                self.errors.push(PosError::new(e.to_string(), pos));
                Ok(Value::Invalid)
            }
        }
    }

    /// After `(`, up to and including `)`.
    fn params(&mut self) -> Result<Vec<Value>, PosError> {
        let mut params = Vec::new();
        loop {
            if *self.peek() == Token::RParen {
                self.advance();
                return Ok(params);
            }
            params.push(self.value()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    return Ok(params);
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
    }
}
