//! Tokenizer for one line of annotation comment text.
//!
//! An identity is either a quoted span (`'...'`, `"..."` or `` `...` ``) or a
//! bare run of characters other than `;`, `=` and whitespace. Each identity
//! comes back with the byte that terminated it so the section parser can tell
//! keys (`=` follows) from bare values and flags.

/// What ended an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// Space or tab.
    Space,
    /// Closing quote of a quoted span.
    Quote,
    /// End of input.
    End,
}

/// One identity read from the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text; quotes are stripped and escaped delimiters unescaped.
    pub text: String,
    /// `true` when the token was a quoted span.
    pub quoted: bool,
    pub terminator: Terminator,
    /// Byte offset of the first byte of the token (the opening quote for
    /// quoted spans).
    pub start: usize,
}

impl Token {
    /// Returns `true` for an unquoted `@keyword` section marker.
    pub fn is_section_marker(&self) -> bool {
        !self.quoted && self.text.starts_with('@')
    }
}

/// Byte-level scanner over one comment line.
///
/// Every delimiter is ASCII, so byte offsets handed out always fall on UTF-8
/// character boundaries.
#[derive(Debug)]
pub struct Lexer<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Skips leading comment noise: `#`, `;` and whitespace.
    pub fn skip_separators(&mut self) {
        while let Some(&b) = self.line.as_bytes().get(self.pos) {
            if !matches!(b, b'#' | b';' | b' ' | b'\t') {
                break;
            }
            self.pos += 1;
        }
    }

    /// Reads the next non-empty identity, skipping empty ones produced by
    /// runs of separators. Returns `None` once the line is exhausted.
    pub fn next_identity(&mut self) -> Option<Token> {
        loop {
            let token = self.next_raw()?;
            if !token.text.is_empty() {
                return Some(token);
            }
            if token.terminator == Terminator::End {
                return None;
            }
        }
    }

    /// Reads the next identity, which may be empty (`key=` or `key=""`).
    ///
    /// Returns `None` only when the scanner already sits at the end of the
    /// line.
    pub fn next_raw(&mut self) -> Option<Token> {
        let bytes = self.line.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let mut start = self.pos;
        let mut token_start = self.pos;
        let mut started = false;
        let mut quote: Option<u8> = None;

        while let Some(&b) = bytes.get(self.pos) {
            self.pos += 1;
            match b {
                b'\'' | b'"' | b'`' if !started => {
                    started = true;
                    quote = Some(b);
                    token_start = self.pos - 1;
                    start = self.pos;
                }
                b'\'' | b'"' | b'`' if quote == Some(b) => {
                    let escaped = self.pos >= 2 + start && bytes[self.pos - 2] == b'\\';
                    if escaped {
                        continue;
                    }
                    return Some(Token {
                        text: unescape(&self.line[start..self.pos - 1], b),
                        quoted: true,
                        terminator: Terminator::Quote,
                        start: token_start,
                    });
                }
                b';' | b'=' if quote.is_none() => {
                    return Some(Token {
                        text: self.line[start..self.pos - 1].to_string(),
                        quoted: false,
                        terminator: if b == b';' {
                            Terminator::Semicolon
                        } else {
                            Terminator::Equals
                        },
                        start: token_start,
                    });
                }
                b' ' | b'\t' if quote.is_none() => {
                    if started {
                        return Some(Token {
                            text: self.line[start..self.pos - 1].to_string(),
                            quoted: false,
                            terminator: Terminator::Space,
                            start: token_start,
                        });
                    }
                    start = self.pos;
                    token_start = self.pos;
                }
                _ => {
                    if !started {
                        started = true;
                        start = self.pos - 1;
                        token_start = start;
                    }
                }
            }
        }

        // Unterminated quote: everything after the opening quote.
        let text = match quote {
            Some(q) => unescape(&self.line[start..], q),
            None if started => self.line[start..].to_string(),
            None => String::new(),
        };
        Some(Token {
            text,
            quoted: quote.is_some(),
            terminator: Terminator::End,
            start: token_start,
        })
    }
}

/// Only the delimiter of the enclosing span is unescaped; other backslashes
/// are kept as written.
fn unescape(text: &str, quote: u8) -> String {
    let quote = char::from(quote);
    text.replace(&format!("\\{quote}"), &quote.to_string())
}
