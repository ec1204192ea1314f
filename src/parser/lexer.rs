use std::{char, iter::Peekable, str::CharIndices};

use derive_more::{Display, Error};

use crate::parser::{SourcePosition, Spanning};

/// A single token in the input source.
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Debug, Display, PartialEq)]
pub enum Token<'a> {
    Name(&'a str),
    Int(i64),
    Float(f64),
    #[display("\"{_0}\"")]
    String(String),
    #[display("!")]
    ExclamationMark,
    #[display("$")]
    Dollar,
    #[display("(")]
    ParenOpen,
    #[display(")")]
    ParenClose,
    #[display("[")]
    BracketOpen,
    #[display("]")]
    BracketClose,
    #[display("{{")]
    CurlyOpen,
    #[display("}}")]
    CurlyClose,
    #[display("...")]
    Ellipsis,
    #[display(":")]
    Colon,
    #[display("=")]
    Equals,
    #[display("@")]
    At,
    #[display("|")]
    Pipe,
    #[display("End of file")]
    EndOfFile,
}

/// Error when tokenizing the input source.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum LexerError {
    /// An unknown character was found.
    #[display("Unknown character \"{_0}\"")]
    UnknownCharacter(#[error(not(source))] char),

    /// A character that exists in the GraphQL language was found where it is
    /// not expected.
    #[display("Unexpected character \"{_0}\"")]
    UnexpectedCharacter(#[error(not(source))] char),

    /// An unterminated string literal was found.
    #[display("Unterminated string literal")]
    UnterminatedString,

    /// An invalid escape sequence occurred inside a string literal.
    #[display("Unknown escape sequence \"{_0}\"")]
    UnknownEscapeSequence(#[error(not(source))] String),

    /// An int or float literal could not be scanned.
    #[display("Invalid number literal")]
    InvalidNumber,
}

#[doc(hidden)]
pub type LexerResult<'a> = Result<Spanning<Token<'a>>, Spanning<LexerError>>;

/// Tokenizer over a query source string.
#[derive(Debug)]
pub struct Lexer<'a> {
    iterator: Peekable<CharIndices<'a>>,
    source: &'a str,
    position: SourcePosition,
    has_reached_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the given source.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            iterator: source.char_indices().peekable(),
            source,
            position: SourcePosition::start_of_query(),
            has_reached_eof: false,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.iterator.peek().map(|&(_, ch)| ch)
    }

    fn next_char(&mut self) -> Option<char> {
        let (_, ch) = self.iterator.next()?;
        if ch == '\n' {
            self.position.advance_line();
        } else {
            self.position.advance_col();
        }
        Some(ch)
    }

    fn byte_offset(&mut self) -> usize {
        self.iterator
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len())
    }

    fn emit(&self, start: SourcePosition, token: Token<'a>) -> LexerResult<'a> {
        Ok(Spanning::new(start, token))
    }

    fn error(&self, start: SourcePosition, err: LexerError) -> LexerResult<'a> {
        Err(Spanning::new(start, err))
    }

    fn scan_over_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' | ',' | '\u{feff}' => {
                    self.next_char();
                }
                '#' => {
                    self.next_char();
                    while let Some(ch) = self.peek_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.next_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_ellipsis(&mut self) -> LexerResult<'a> {
        let start = self.position;
        for _ in 0..3 {
            match self.next_char() {
                Some('.') => {}
                Some(ch) => return self.error(start, LexerError::UnexpectedCharacter(ch)),
                None => return self.error(start, LexerError::UnexpectedCharacter('.')),
            }
        }
        self.emit(start, Token::Ellipsis)
    }

    fn scan_name(&mut self) -> LexerResult<'a> {
        let start = self.position;
        let from = self.byte_offset();
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.next_char();
            } else {
                break;
            }
        }
        let to = self.byte_offset();
        self.emit(start, Token::Name(&self.source[from..to]))
    }

    fn scan_string(&mut self) -> LexerResult<'a> {
        let start = self.position;
        self.next_char();

        if self.peek_char() == Some('"') {
            self.next_char();
            if self.peek_char() == Some('"') {
                self.next_char();
                return self.scan_block_string(start);
            }
            // An immediately closed quoted literal.
            return self.emit(start, Token::String(String::new()));
        }

        let mut value = String::new();
        loop {
            match self.next_char() {
                Some('"') => return self.emit(start, Token::String(value)),
                Some('\\') => match self.next_char() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('/') => value.push('/'),
                    Some('b') => value.push('\u{0008}'),
                    Some('f') => value.push('\u{000c}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('u') => match self.scan_escaped_unicode() {
                        Ok(ch) => value.push(ch),
                        Err(e) => return self.error(start, e),
                    },
                    Some(ch) => {
                        return self.error(
                            start,
                            LexerError::UnknownEscapeSequence(format!("\\{ch}")),
                        );
                    }
                    None => return self.error(start, LexerError::UnterminatedString),
                },
                Some('\n') | None => return self.error(start, LexerError::UnterminatedString),
                Some(ch) => value.push(ch),
            }
        }
    }

    fn scan_block_string(&mut self, start: SourcePosition) -> LexerResult<'a> {
        let mut raw = String::new();
        loop {
            match self.next_char() {
                Some('"') if self.peek_char() == Some('"') => {
                    self.next_char();
                    if self.peek_char() == Some('"') {
                        self.next_char();
                        return self.emit(start, Token::String(trim_block_string(&raw)));
                    }
                    raw.push_str("\"\"");
                }
                Some('\\') if self.peek_char() == Some('"') => {
                    // Only the `\"""` sequence is an escape inside a block
                    // string; a lone backslash is literal.
                    self.next_char();
                    if self.peek_char() == Some('"') {
                        self.next_char();
                        if self.peek_char() == Some('"') {
                            self.next_char();
                            raw.push_str("\"\"\"");
                            continue;
                        }
                        raw.push_str("\"\"");
                        continue;
                    }
                    raw.push('"');
                }
                Some(ch) => raw.push(ch),
                None => return self.error(start, LexerError::UnterminatedString),
            }
        }
    }

    fn scan_escaped_unicode(&mut self) -> Result<char, LexerError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let ch = self
                .next_char()
                .ok_or(LexerError::UnterminatedString)?;
            let digit = ch
                .to_digit(16)
                .ok_or_else(|| LexerError::UnknownEscapeSequence(format!("\\u..{ch}")))?;
            code = code * 16 + digit;
        }
        char::from_u32(code)
            .ok_or_else(|| LexerError::UnknownEscapeSequence(format!("\\u{code:04x}")))
    }

    fn scan_number(&mut self) -> LexerResult<'a> {
        let start = self.position;
        let from = self.byte_offset();
        let mut is_float = false;

        if self.peek_char() == Some('-') {
            self.next_char();
        }
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' => {
                    self.next_char();
                }
                '.' | 'e' | 'E' => {
                    is_float = true;
                    self.next_char();
                }
                '+' | '-' if is_float => {
                    self.next_char();
                }
                _ => break,
            }
        }

        let to = self.byte_offset();
        let literal = &self.source[from..to];
        if is_float {
            match literal.parse::<f64>() {
                Ok(f) => self.emit(start, Token::Float(f)),
                Err(_) => self.error(start, LexerError::InvalidNumber),
            }
        } else {
            match literal.parse::<i64>() {
                Ok(i) => self.emit(start, Token::Int(i)),
                Err(_) => self.error(start, LexerError::InvalidNumber),
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexerResult<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_reached_eof {
            return None;
        }

        self.scan_over_whitespace();

        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => {
                self.has_reached_eof = true;
                return Some(Ok(Spanning::new(self.position, Token::EndOfFile)));
            }
        };

        let mut punctuator = |token| {
            let start = self.position;
            self.next_char();
            Some(self.emit(start, token))
        };

        match ch {
            '!' => punctuator(Token::ExclamationMark),
            '$' => punctuator(Token::Dollar),
            '(' => punctuator(Token::ParenOpen),
            ')' => punctuator(Token::ParenClose),
            '[' => punctuator(Token::BracketOpen),
            ']' => punctuator(Token::BracketClose),
            '{' => punctuator(Token::CurlyOpen),
            '}' => punctuator(Token::CurlyClose),
            ':' => punctuator(Token::Colon),
            '=' => punctuator(Token::Equals),
            '@' => punctuator(Token::At),
            '|' => punctuator(Token::Pipe),
            '.' => Some(self.scan_ellipsis()),
            '"' => Some(self.scan_string()),
            '-' | '0'..='9' => Some(self.scan_number()),
            ch if ch.is_ascii_alphabetic() || ch == '_' => Some(self.scan_name()),
            ch => {
                let start = self.position;
                self.next_char();
                Some(self.error(start, LexerError::UnknownCharacter(ch)))
            }
        }
    }
}

// Strips the common indentation and the leading and trailing blank lines, per
// the block string value algorithm of the October 2021 spec.
fn trim_block_string(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').collect();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            out.push((*line).into());
        } else {
            out.push(line.chars().skip(common_indent).collect());
        }
    }

    while out.first().is_some_and(|l| l.trim().is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }

    out.join("\n")
}
