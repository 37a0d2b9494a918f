//! Lexical analyzer.
//!
//! Turns a byte stream into a token stream, synthesizing `Indent`/`Dedent`/
//! `Newline` tokens from leading whitespace.  The scan is driven one byte at
//! a time through a deterministic state machine; tokens are produced lazily
//! into a small FIFO, so a lexer error on a later line is only raised once
//! the parser actually advances that far.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::io::{self, Read};
use std::mem;

use crate::byte_reader::ByteReader;
use crate::token::Token;

/// Mython blocks are indented by exactly two spaces per level.
const INDENT_WIDTH: usize = 2;

const KEYWORDS: [(&str, Token); 12] = [
    ("and", Token::And),
    ("class", Token::Class),
    ("def", Token::Def),
    ("else", Token::Else),
    ("False", Token::False),
    ("if", Token::If),
    ("None", Token::None),
    ("not", Token::Not),
    ("or", Token::Or),
    ("print", Token::Print),
    ("return", Token::Return),
    ("True", Token::True),
];

fn keyword(word: &str) -> Option<Token> {
    KEYWORDS
        .iter()
        .find(|(lexeme, _)| *lexeme == word)
        .map(|(_, token)| token.clone())
}

/// States of the scanning automaton.
///
/// The end of input is fed to the automaton as a `None` byte.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// At the start of a line, counting leading spaces.
    LineStart,
    /// Mid-line, between tokens.
    Neutral,
    /// Accumulating an identifier or keyword.
    Word,
    /// Saw one of `= ! < >`; the payload is that first character.
    Compare(u8),
    /// Accumulating a digit run.
    Number,
    /// Inside a string literal delimited by `quote`.
    Quoted { quote: u8, escaped: bool },
    /// A `#` comment after at least one token on the line.
    TrailingComment,
    /// A `#` comment on a line of its own.
    LineComment,
    Eof,
}

/// Turn a sequence of bytes into a sequence of tokens.
///
/// `current` returns the head of the stream; `next_token` advances and
/// returns the new head.  Both yield `Eof` indefinitely after the end of
/// input.
#[derive(Debug)]
pub struct Lexer<R: Read> {
    input: ByteReader<R>,
    state: State,
    tokens: VecDeque<Token>,

    // Buffer used when scanning longer tokens.  Allocated here to reuse memory.
    buf: String,

    /// Spaces counted so far at the start of the current line.
    line_indent: usize,
    /// Spaces that opened the block the previous logical line belongs to.
    block_indent: usize,
}

const EOF_TOKEN: Token = Token::Eof;

impl<R: Read> Lexer<R> {
    /// Creates a lexer and scans up to the first token.
    pub fn new(input: R) -> Result<Lexer<R>, LexerError> {
        let mut lexer = Lexer {
            input: ByteReader::new(input),
            state: State::LineStart,
            tokens: VecDeque::new(),
            buf: String::new(),
            line_indent: 0,
            block_indent: 0,
        };
        lexer.fill()?;
        Ok(lexer)
    }

    /// The head token of the stream.
    pub fn current(&self) -> &Token {
        self.tokens.front().unwrap_or(&EOF_TOKEN)
    }

    /// Advances the stream and returns the new head token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        if self.tokens.len() < 2 {
            self.fill()?;
        }
        self.tokens.pop_front();
        Ok(self.current().clone())
    }

    /// Checks that the head token equals `expected`, payload included.
    pub fn expect(&self, expected: &Token) -> Result<&Token, LexerError> {
        let current = self.current();
        if current == expected {
            Ok(current)
        } else {
            Err(LexerError::UnexpectedToken {
                found: current.to_string(),
                expected: expected.to_string(),
            })
        }
    }

    /// Advances, then checks that the new head equals `expected`.
    #[allow(dead_code)]
    pub fn expect_next(&mut self, expected: &Token) -> Result<&Token, LexerError> {
        self.next_token()?;
        self.expect(expected)
    }

    /// Checks that the head token is an identifier and returns its name.
    pub fn expect_id(&self) -> Result<&str, LexerError> {
        match self.current() {
            Token::Id(name) => Ok(name),
            other => Err(LexerError::UnexpectedToken {
                found: other.to_string(),
                expected: "identifier".to_string(),
            }),
        }
    }

    /// Checks that the head token is a number and returns its value.
    #[allow(dead_code)]
    pub fn expect_number(&self) -> Result<i32, LexerError> {
        match self.current() {
            Token::Number(n) => Ok(*n),
            other => Err(LexerError::UnexpectedToken {
                found: other.to_string(),
                expected: "number".to_string(),
            }),
        }
    }

    /// Consumes input until at least one token has been appended to the FIFO.
    fn fill(&mut self) -> Result<(), LexerError> {
        if self.state == State::Eof {
            self.tokens.push_back(Token::Eof);
            return Ok(());
        }
        loop {
            let before = self.tokens.len();
            match self.input.next() {
                Some(Ok(b)) => self.feed(Some(b))?,
                Some(Err(e)) => return Err(LexerError::Io(e)),
                None => self.feed(None)?,
            }
            if self.tokens.len() > before {
                return Ok(());
            }
        }
    }

    /// Feeds one byte (or the end-of-input sentinel) to the automaton.
    fn feed(&mut self, c: Option<u8>) -> Result<(), LexerError> {
        match self.state {
            State::LineStart => self.feed_line_start(c),
            State::Neutral => self.feed_neutral(c),
            State::Word => self.feed_word(c),
            State::Compare(first) => self.feed_compare(first, c),
            State::Number => self.feed_number(c),
            State::Quoted { quote, escaped } => self.feed_quoted(quote, escaped, c),
            State::TrailingComment => self.feed_trailing_comment(c),
            State::LineComment => self.feed_line_comment(c),
            State::Eof => {
                self.tokens.push_back(Token::Eof);
                Ok(())
            }
        }
    }

    fn feed_line_start(&mut self, c: Option<u8>) -> Result<(), LexerError> {
        match c {
            None => {
                self.line_indent = 0;
                self.flush_indentation()?;
                self.enter_eof();
            }
            Some(b' ') => self.line_indent += 1,
            Some(b'\n') => self.line_indent = 0,
            Some(b'#') => {
                self.line_indent = 0;
                self.state = State::LineComment;
            }
            Some(c) => {
                self.flush_indentation()?;
                self.dispatch(c);
            }
        }
        Ok(())
    }

    fn feed_neutral(&mut self, c: Option<u8>) -> Result<(), LexerError> {
        match c {
            None => {
                self.tokens.push_back(Token::Newline);
                self.flush_indentation()?;
                self.enter_eof();
            }
            Some(b' ') => (),
            Some(b'\n') => {
                self.tokens.push_back(Token::Newline);
                self.state = State::LineStart;
            }
            Some(b'#') => self.state = State::TrailingComment,
            Some(c) => self.dispatch(c),
        }
        Ok(())
    }

    fn feed_word(&mut self, c: Option<u8>) -> Result<(), LexerError> {
        match c {
            Some(c) if is_word(c) => self.buf.push(c as char),
            None => {
                self.push_word_token();
                self.tokens.push_back(Token::Newline);
                self.flush_indentation()?;
                self.enter_eof();
            }
            Some(b' ') => {
                self.push_word_token();
                self.state = State::Neutral;
            }
            Some(b'\n') => {
                self.push_word_token();
                self.tokens.push_back(Token::Newline);
                self.state = State::LineStart;
            }
            Some(b'#') => {
                self.push_word_token();
                self.state = State::TrailingComment;
            }
            Some(c) => {
                self.push_word_token();
                self.dispatch(c);
            }
        }
        Ok(())
    }

    fn feed_compare(&mut self, first: u8, c: Option<u8>) -> Result<(), LexerError> {
        match c {
            Some(b'=') => {
                let token = match first {
                    b'=' => Token::Eq,
                    b'!' => Token::NotEq,
                    b'<' => Token::LessOrEq,
                    _ => Token::GreaterOrEq,
                };
                self.tokens.push_back(token);
                self.state = State::Neutral;
            }
            None => {
                self.tokens.push_back(Token::Char(first as char));
                self.tokens.push_back(Token::Newline);
                self.flush_indentation()?;
                self.enter_eof();
            }
            Some(b' ') => {
                self.tokens.push_back(Token::Char(first as char));
                self.state = State::Neutral;
            }
            Some(b'\n') => {
                self.tokens.push_back(Token::Char(first as char));
                self.tokens.push_back(Token::Newline);
                self.state = State::LineStart;
            }
            Some(b'#') => {
                self.tokens.push_back(Token::Char(first as char));
                self.state = State::TrailingComment;
            }
            Some(c) => {
                self.tokens.push_back(Token::Char(first as char));
                self.dispatch(c);
            }
        }
        Ok(())
    }

    fn feed_number(&mut self, c: Option<u8>) -> Result<(), LexerError> {
        match c {
            Some(c) if c.is_ascii_digit() => self.buf.push(c as char),
            None => {
                self.push_number_token()?;
                self.tokens.push_back(Token::Newline);
                self.flush_indentation()?;
                self.enter_eof();
            }
            Some(b' ') => {
                self.push_number_token()?;
                self.state = State::Neutral;
            }
            Some(b'\n') => {
                self.push_number_token()?;
                self.tokens.push_back(Token::Newline);
                self.state = State::LineStart;
            }
            Some(b'#') => {
                self.push_number_token()?;
                self.state = State::TrailingComment;
            }
            Some(c) => {
                self.push_number_token()?;
                self.dispatch(c);
            }
        }
        Ok(())
    }

    fn feed_quoted(&mut self, quote: u8, escaped: bool, c: Option<u8>) -> Result<(), LexerError> {
        if escaped {
            match c {
                None => return Err(LexerError::UnterminatedString),
                Some(c) => {
                    let c = match c {
                        b'n' => b'\n',
                        b't' => b'\t',
                        other => other,
                    };
                    self.buf.push(c as char);
                    self.state = State::Quoted {
                        quote,
                        escaped: false,
                    };
                }
            }
            return Ok(());
        }
        match c {
            None | Some(b'\n') => return Err(LexerError::UnterminatedString),
            Some(b'\\') => {
                self.state = State::Quoted {
                    quote,
                    escaped: true,
                }
            }
            Some(c) if c == quote => {
                let value = mem::take(&mut self.buf);
                self.tokens.push_back(Token::String(value));
                self.state = State::Neutral;
            }
            Some(c) => self.buf.push(c as char),
        }
        Ok(())
    }

    fn feed_trailing_comment(&mut self, c: Option<u8>) -> Result<(), LexerError> {
        match c {
            Some(b'\n') => {
                self.tokens.push_back(Token::Newline);
                self.state = State::LineStart;
            }
            None => {
                self.tokens.push_back(Token::Newline);
                self.flush_indentation()?;
                self.enter_eof();
            }
            Some(_) => (),
        }
        Ok(())
    }

    fn feed_line_comment(&mut self, c: Option<u8>) -> Result<(), LexerError> {
        match c {
            Some(b'\n') => self.state = State::LineStart,
            None => {
                self.flush_indentation()?;
                self.enter_eof();
            }
            Some(_) => (),
        }
        Ok(())
    }

    /// Handles the first byte of a new token, as the mid-line state would.
    fn dispatch(&mut self, c: u8) {
        if is_word_start(c) {
            self.buf.clear();
            self.buf.push(c as char);
            self.state = State::Word;
        } else if c.is_ascii_digit() {
            self.buf.clear();
            self.buf.push(c as char);
            self.state = State::Number;
        } else if matches!(c, b'=' | b'!' | b'<' | b'>') {
            self.state = State::Compare(c);
        } else if c == b'\'' || c == b'"' {
            self.buf.clear();
            self.state = State::Quoted {
                quote: c,
                escaped: false,
            };
        } else {
            self.tokens.push_back(Token::Char(c as char));
            self.state = State::Neutral;
        }
    }

    /// Emits the `Indent`/`Dedent` run for the line that just started.
    fn flush_indentation(&mut self) -> Result<(), LexerError> {
        if self.line_indent % INDENT_WIDTH != 0 {
            return Err(LexerError::InvalidIndent);
        }
        while self.line_indent > self.block_indent {
            self.tokens.push_back(Token::Indent);
            self.block_indent += INDENT_WIDTH;
        }
        while self.line_indent < self.block_indent {
            self.tokens.push_back(Token::Dedent);
            self.block_indent -= INDENT_WIDTH;
        }
        self.line_indent = 0;
        Ok(())
    }

    fn enter_eof(&mut self) {
        self.tokens.push_back(Token::Eof);
        self.state = State::Eof;
    }

    fn push_word_token(&mut self) {
        let word = mem::take(&mut self.buf);
        match keyword(&word) {
            Some(token) => self.tokens.push_back(token),
            None => self.tokens.push_back(Token::Id(word)),
        }
    }

    fn push_number_token(&mut self) -> Result<(), LexerError> {
        let digits = mem::take(&mut self.buf);
        let n = digits
            .parse::<i32>()
            .map_err(|_| LexerError::BadNumberLiteral(digits))?;
        self.tokens.push_back(Token::Number(n));
        Ok(())
    }
}

fn is_word_start(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic()
}

fn is_word(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphanumeric()
}

/// Errors raised while tokenizing.
#[derive(Debug)]
pub enum LexerError {
    Io(io::Error),
    InvalidIndent,
    UnterminatedString,
    BadNumberLiteral(String),
    UnexpectedToken { found: String, expected: String },
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::Io(e) => write!(f, "read error: {}", e),
            LexerError::InvalidIndent => write!(f, "Invalid Indentation"),
            LexerError::UnterminatedString => write!(f, "unterminated string literal"),
            LexerError::BadNumberLiteral(lit) => {
                write!(f, "cannot parse number literal: {}", lit)
            }
            LexerError::UnexpectedToken { found, expected } => {
                write!(f, "unexpected token '{}', expected '{}'", found, expected)
            }
        }
    }
}

impl Error for LexerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LexerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LexerError {
    fn from(e: io::Error) -> LexerError {
        LexerError::Io(e)
    }
}
