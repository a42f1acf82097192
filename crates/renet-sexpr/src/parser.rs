use crate::{Sexpr, SexprKind, Span};
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// Why a document failed to parse. Offsets are byte positions in the input.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedEof,
    UnexpectedChar { found: char, offset: usize },
    UnclosedList { start: usize },
    UnterminatedString { start: usize },
    TrailingInput { offset: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEof => write!(f, "Unexpected end of input"),
            ParseError::UnexpectedChar { found, offset } => {
                write!(f, "Unexpected '{found}' at byte {offset}")
            }
            ParseError::UnclosedList { start } => {
                write!(f, "List opened at byte {start} is never closed")
            }
            ParseError::UnterminatedString { start } => {
                write!(f, "String starting at byte {start} is never terminated")
            }
            ParseError::TrailingInput { offset } => {
                write!(f, "Unexpected content after the root expression at byte {offset}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent parser over a borrowed source string.
pub struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Start a parser at the beginning of `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Parse exactly one expression; anything but whitespace and comments
    /// after it is an error.
    pub fn parse_document(&mut self) -> Result<Sexpr, ParseError> {
        let root = self.parse_expr()?;
        self.skip_trivia();
        if self.peek().is_some() {
            return Err(ParseError::TrailingInput { offset: self.pos });
        }
        Ok(root)
    }

    /// Parse the next expression, skipping leading whitespace and comments.
    pub fn parse_expr(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnexpectedChar {
                found: ')',
                offset: self.pos,
            }),
            Some('"') => self.parse_string(),
            Some(_) => Ok(self.parse_bare_atom()),
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        self.bump();
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(ParseError::UnclosedList { start }),
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }

        if items.len() >= 1000 {
            log::trace!("Parsed list of {} items at byte {start}", items.len());
        }

        Ok(Sexpr::new(SexprKind::List(items), Span::new(start, self.pos)))
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();

        loop {
            let Some(ch) = self.bump() else {
                return Err(ParseError::UnterminatedString { start });
            };
            match ch {
                '"' => break,
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(ParseError::UnterminatedString { start });
                    };
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                }
                other => value.push(other),
            }
        }

        Ok(Sexpr::new(SexprKind::String(value), Span::new(start, self.pos)))
    }

    fn parse_bare_atom(&mut self) -> Sexpr {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.bump();
        }

        let text = &self.input[start..self.pos];
        let kind = if let Ok(n) = text.parse::<i64>() {
            SexprKind::Int(n)
        } else if let Ok(f) = text.parse::<f64>()
            && !text.chars().any(char::is_alphabetic)
        {
            SexprKind::F64(f)
        } else {
            SexprKind::Symbol(text.to_string())
        };

        Sexpr::new(kind, Span::new(start, self.pos))
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn bump(&mut self) -> Option<char> {
        let (offset, ch) = self.chars.next()?;
        self.pos = offset + ch.len_utf8();
        Some(ch)
    }
}

/// Parse a complete document such as the contents of a `.kicad_pcb` file.
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing {} bytes of S-expression input", input.len());
    Parser::new(input).parse_document()
}
