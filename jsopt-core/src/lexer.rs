//! Lexer for `.jsp` sources.

use crate::error::CoreError;

/// Kind of a token produced by the lexer.
///
/// The lexer does not attach meaning to identifiers: operator names and
/// keywords such as `let` or `true` are resolved by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),

    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Semi,     // ;
}

/// A single token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Lex a source string into tokens. Fails on the first malformed token.
pub fn lex(source: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }
            // line comment
            if ch == b'/' && self.peek_next() == Some(b'/') {
                while let Some(ch) = self.peek_char() {
                    if ch == b'\n' {
                        break;
                    }
                    self.consume_char();
                }
                continue;
            }

            let start = self.index;
            let kind = match ch {
                b'(' => self.simple(TokenKind::LParen),
                b')' => self.simple(TokenKind::RParen),
                b'[' => self.simple(TokenKind::LBracket),
                b']' => self.simple(TokenKind::RBracket),
                b'{' => self.simple(TokenKind::LBrace),
                b'}' => self.simple(TokenKind::RBrace),
                b';' => self.simple(TokenKind::Semi),
                b'"' | b'\'' => self.lex_string(start, ch)?,
                b'0'..=b'9' => self.lex_number(start)?,
                _ if is_ident_start(ch) => self.lex_ident(start),
                _ => {
                    let found = self.source[start..].chars().next().unwrap_or('?');
                    return Err(CoreError::LexError {
                        position: start,
                        message: format!("unexpected character '{found}'"),
                    });
                }
            };
            tokens.push(Token {
                kind,
                position: start,
            });
        }

        Ok(tokens)
    }

    fn simple(&mut self, kind: TokenKind) -> TokenKind {
        self.consume_char();
        kind
    }

    fn lex_string(&mut self, start: usize, quote: u8) -> Result<TokenKind, CoreError> {
        // opening quote
        self.consume_char();

        let mut value = String::new();
        let mut segment_start = self.index;
        while let Some(ch) = self.peek_char() {
            match ch {
                _ if ch == quote => {
                    value.push_str(&self.source[segment_start..self.index]);
                    self.consume_char();
                    return Ok(TokenKind::Str(value));
                }
                b'\\' => {
                    value.push_str(&self.source[segment_start..self.index]);
                    self.consume_char();
                    let escaped = match self.peek_char() {
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'r') => '\r',
                        Some(b'0') => '\0',
                        Some(b'\\') => '\\',
                        Some(b'"') => '"',
                        Some(b'\'') => '\'',
                        Some(_) => {
                            return Err(CoreError::LexError {
                                position: self.index - 1,
                                message: "unknown escape sequence".to_string(),
                            });
                        }
                        None => break,
                    };
                    value.push(escaped);
                    self.consume_char();
                    segment_start = self.index;
                }
                b'\n' => break,
                _ => self.consume_char(),
            }
        }

        Err(CoreError::LexError {
            position: start,
            message: "unterminated string literal".to_string(),
        })
    }

    fn lex_number(&mut self, start: usize) -> Result<TokenKind, CoreError> {
        // digits [ '.' digits ]? [ ('e' | 'E') [+-]? digits ]?
        self.consume_digits();

        if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.consume_char();
            self.consume_digits();
        }

        if matches!(self.peek_char(), Some(b'e' | b'E')) {
            let mark = self.index;
            self.consume_char();
            if matches!(self.peek_char(), Some(b'+' | b'-')) {
                self.consume_char();
            }
            if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.consume_digits();
            } else {
                self.index = mark;
            }
        }

        if self.peek_char().is_some_and(is_ident_start) {
            return Err(CoreError::LexError {
                position: start,
                message: "identifier starts immediately after number".to_string(),
            });
        }

        let text: String = self.source[start..self.index]
            .chars()
            .filter(|&c| c != '_')
            .collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|err| CoreError::LexError {
                position: start,
                message: format!("invalid number literal: {err}"),
            })
    }

    fn lex_ident(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }
        TokenKind::Ident(self.source[start..self.index].to_string())
    }

    fn consume_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if matches!(ch, b'0'..=b'9' | b'_') {
                self.consume_char();
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
