// Tokenizer shared by the query languages
// Author: Gabriel Demetrios Lafis

use thiserror::Error;

const SYMBOLS: &[&str] = &[
    "...", "..", "==", "!=", "<=", ">=", "&&", "||", "->", "|", ",", "(", ")", "[", "]", "{", "}",
    ".", ":", "=", "<", ">", "+", "-", "*", "/", "%", "&", "!", "@", "^", "?", ";",
];

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Double-quoted text
    Quoted(String),
    /// Single-quoted text
    SingleQuoted(String),
    /// Backtick-quoted text
    Backtick(String),
    Number(f64),
    /// `$name`; `$` alone is the empty name and `$$` is `$`
    Variable(String),
    Symbol(&'static str),
}

impl Token {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Quoted(text) => format!("\"{}\"", text),
            Token::SingleQuoted(text) => format!("'{}'", text),
            Token::Backtick(text) => format!("`{}`", text),
            Token::Number(n) => n.to_string(),
            Token::Variable(name) => format!("${}", name),
            Token::Symbol(symbol) => format!("'{}'", symbol),
        }
    }
}

/// Token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Represents an error raised while tokenizing
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct LexError {
    pub position: usize,
    pub message: String,
}

/// Split source text into tokens.
///
/// With `hyphenated_idents` set, identifiers may contain inner hyphens
/// (`parse-json`, `mv-expand`).
pub fn tokenize(source: &str, hyphenated_idents: bool) -> Result<Vec<Spanned>, LexError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let token = if c.is_ascii_digit() {
            let (number, next) = read_number(source, &chars, i)?;
            i = next;
            Token::Number(number)
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() {
                let c = chars[i].1;
                let hyphen = hyphenated_idents
                    && c == '-'
                    && chars.get(i + 1).map_or(false, |(_, n)| n.is_alphanumeric());
                if c.is_alphanumeric() || c == '_' || hyphen {
                    i += 1;
                } else {
                    break;
                }
            }
            Token::Ident(slice(source, &chars, start, i).to_string())
        } else if c == '"' || c == '\'' || c == '`' {
            let (text, next) = read_string(&chars, i)?;
            i = next;
            match c {
                '"' => Token::Quoted(text),
                '\'' => Token::SingleQuoted(text),
                _ => Token::Backtick(text),
            }
        } else if c == '$' {
            i += 1;
            if chars.get(i).map(|(_, c)| *c) == Some('$') {
                i += 1;
                Token::Variable("$".to_string())
            } else {
                let start = i;
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                Token::Variable(slice(source, &chars, start, i).to_string())
            }
        } else {
            let rest = &source[position..];
            match SYMBOLS.iter().find(|symbol| rest.starts_with(**symbol)) {
                Some(symbol) => {
                    i += symbol.chars().count();
                    Token::Symbol(*symbol)
                }
                None => {
                    return Err(LexError {
                        position,
                        message: format!("unexpected character '{}'", c),
                    })
                }
            }
        };

        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

fn slice<'a>(source: &'a str, chars: &[(usize, char)], start: usize, end: usize) -> &'a str {
    let from = chars.get(start).map_or(source.len(), |(p, _)| *p);
    let to = chars.get(end).map_or(source.len(), |(p, _)| *p);
    &source[from..to]
}

fn read_number(source: &str, chars: &[(usize, char)], start: usize) -> Result<(f64, usize), LexError> {
    let digit_at = |i: usize| chars.get(i).map_or(false, |(_, c)| c.is_ascii_digit());
    let mut i = start;

    while digit_at(i) {
        i += 1;
    }
    // `1..3` is a range, not a fraction
    if chars.get(i).map(|(_, c)| *c) == Some('.') && digit_at(i + 1) {
        i += 1;
        while digit_at(i) {
            i += 1;
        }
    }
    if matches!(chars.get(i).map(|(_, c)| *c), Some('e') | Some('E')) {
        let mut j = i + 1;
        if matches!(chars.get(j).map(|(_, c)| *c), Some('+') | Some('-')) {
            j += 1;
        }
        if digit_at(j) {
            i = j;
            while digit_at(i) {
                i += 1;
            }
        }
    }

    let text = slice(source, chars, start, i);
    text.parse::<f64>()
        .map(|n| (n, i))
        .map_err(|_| LexError {
            position: chars[start].0,
            message: format!("invalid number '{}'", text),
        })
}

fn read_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), LexError> {
    let (position, quote) = chars[start];
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((text, i + 1));
        }
        if c == '\\' {
            i += 1;
            match chars.get(i).map(|(_, c)| *c) {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('r') => text.push('\r'),
                Some(other) => text.push(other),
                None => break,
            }
        } else {
            text.push(c);
        }
        i += 1;
    }

    Err(LexError {
        position,
        message: "unterminated string".to_string(),
    })
}

/// Cursor over a token list
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Spanned>,
    index: usize,
    end: usize,
}

impl TokenStream {
    /// Create a stream; `end` is the source length reported at end of input
    pub fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        TokenStream {
            tokens,
            index: 0,
            end,
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset).map(|s| &s.token)
    }

    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|s| s.token.clone());
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Byte offset of the current token, or the end of the source
    pub fn position(&self) -> usize {
        self.tokens.get(self.index).map_or(self.end, |s| s.position)
    }

    pub fn is_at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol)
    }

    pub fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.is_symbol(symbol) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Case-insensitive keyword check
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name.eq_ignore_ascii_case(keyword))
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Description of the current token for error messages
    pub fn describe_current(&self) -> String {
        self.peek()
            .map_or_else(|| "end of input".to_string(), Token::describe)
    }
}
