//! Minimal S-expression reader for KiCad library files.
//!
//! KiCad files are a single nested list of atoms and quoted strings. The
//! reader keeps the distinction between bare atoms and quoted strings,
//! since a bare `1` and a quoted `"1"` mean different things for pad labels.

use std::fmt;

use thiserror::Error;

/// Deepest list nesting accepted in one document.
///
/// Real KiCad files stay well under twenty levels. The limit keeps parsing,
/// record building and drop glue within the stack of a default thread.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected token at position {0}: {1}")]
    UnexpectedToken(usize, String),
    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),
    #[error("trailing input at position {0}")]
    TrailingInput(usize),
    #[error("lists nested deeper than {MAX_DEPTH} levels at position {0}")]
    TooDeep(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExp {
    /// Bare token such as `passive` or `1.27`.
    Atom(String),
    /// Double-quoted string with escapes resolved.
    Quoted(String),
    List(Vec<SExp>),
}

impl SExp {
    /// Returns the text of an atom or quoted string.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) | SExp::Quoted(s) => Some(s),
            SExp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, SExp::Quoted(_))
    }

    /// Returns the leading atom of a list, e.g. `pin` for `(pin ...)`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    /// Returns the item at `index` of a list (index 0 is the head).
    pub fn item(&self, index: usize) -> Option<&SExp> {
        self.as_list()?.get(index)
    }

    /// Returns the text of the item at `index` of a list.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.item(index)?.as_atom()
    }

    /// Returns the first child list whose head is `key`.
    pub fn find(&self, key: &str) -> Option<&SExp> {
        self.find_all(key).next()
    }

    /// Returns every child list whose head is `key`, in order.
    pub fn find_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a SExp> {
        self.as_list()
            .unwrap_or(&[])
            .iter()
            .filter(move |item| item.head() == Some(key))
    }

    /// Returns the first argument of the child list `key`, e.g. `"Foo"` for
    /// `(descr "Foo")`.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.find(key)?.arg(1)
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => write!(f, "{s}"),
            SExp::Quoted(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
    depth: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    /// Parses exactly one expression, rejecting anything but whitespace
    /// after it.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        let expr = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::TrailingInput(self.pos));
        }
        Ok(expr)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnexpectedToken(self.pos, ")".to_string())),
            Some('"') => self.parse_string(),
            Some(_) => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep(self.pos));
        }
        self.advance(); // (
        self.depth += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof),
                Some(')') => {
                    self.advance();
                    self.depth -= 1;
                    return Ok(SExp::List(items));
                }
                Some(_) => items.push(self.parse_sexp()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        let start = self.pos;
        self.advance(); // "
        let mut s = String::new();

        while let Some(ch) = self.peek() {
            self.advance();
            match ch {
                '"' => return Ok(SExp::Quoted(s)),
                '\\' => {
                    let escaped = self.peek().ok_or(ParseError::UnterminatedString(start))?;
                    self.advance();
                    match escaped {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        other => s.push(other),
                    }
                }
                other => s.push(other),
            }
        }

        Err(ParseError::UnterminatedString(start))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        Ok(SExp::Atom(s))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}

/// Parses a complete document into one expression.
pub fn parse_sexp(input: &str) -> Result<SExp, ParseError> {
    SExpParser::new(input).parse()
}
