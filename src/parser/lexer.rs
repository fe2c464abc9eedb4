//! Lexer for shlang scripts
//!
//! The lexer turns source text into a lazy stream of positioned tokens that
//! the parser pulls one at a time. It handles:
//! - Commands and their bare-word arguments
//! - Expressions (assignments, conditions, invocation arguments, lists)
//! - Quoted strings with escape sequences
//! - Redirection operators and their `[fd]` groups
//! - Comments and line continuations
//!
//! Lexing is context sensitive. The same text `a` is a command name in
//! `a -l`, an assignment target in `a = 1` and a function name in `a()`, so
//! the lexer keeps a small mode that decides how the next word is scanned.
//! Lexical problems never abort the scan: they become `Illegal` tokens and
//! the parser decides when they are fatal.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::ast::types::Pos;

/// Token types for the shlang lexer.
///
/// Variants are declared category by category: specials, literals,
/// operators, delimiters, keywords. [`TokenType::category`] is the source of
/// truth for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    // Specials
    Illegal,
    Eof,
    Comment,

    // Literals
    Ident,
    String,
    Number,
    Arg,
    Variable,

    // Operators
    Assign,    // =
    AssignCmd, // <=
    Equal,     // ==
    NotEqual,  // !=
    Plus,      // +
    Minus,     // -
    Gt,        // >
    Lt,        // <
    Colon,     // ,
    Semicolon, // ;
    Amp,       // &

    // Delimiters
    LBrace, // {
    RBrace, // }
    LParen, // (
    RParen, // )
    LBrack, // [
    RBrack, // ]
    Pipe,   // |
    Comma,  // ,

    // Keywords
    Builtin,
    Import,
    SetEnv,
    ShowEnv,
    BindFn,
    Dump,
    Return,
    If,
    Else,
    For,
    Rfork,
    Fn,
}

/// Broad classification of a [`TokenType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    Special,
    Literal,
    Operator,
    Delimiter,
    Keyword,
}

impl TokenType {
    /// Every token type, in declaration order.
    pub const ALL: &'static [TokenType] = &[
        TokenType::Illegal,
        TokenType::Eof,
        TokenType::Comment,
        TokenType::Ident,
        TokenType::String,
        TokenType::Number,
        TokenType::Arg,
        TokenType::Variable,
        TokenType::Assign,
        TokenType::AssignCmd,
        TokenType::Equal,
        TokenType::NotEqual,
        TokenType::Plus,
        TokenType::Minus,
        TokenType::Gt,
        TokenType::Lt,
        TokenType::Colon,
        TokenType::Semicolon,
        TokenType::Amp,
        TokenType::LBrace,
        TokenType::RBrace,
        TokenType::LParen,
        TokenType::RParen,
        TokenType::LBrack,
        TokenType::RBrack,
        TokenType::Pipe,
        TokenType::Comma,
        TokenType::Builtin,
        TokenType::Import,
        TokenType::SetEnv,
        TokenType::ShowEnv,
        TokenType::BindFn,
        TokenType::Dump,
        TokenType::Return,
        TokenType::If,
        TokenType::Else,
        TokenType::For,
        TokenType::Rfork,
        TokenType::Fn,
    ];

    pub fn category(self) -> TokenCategory {
        use TokenType::*;
        match self {
            Illegal | Eof | Comment => TokenCategory::Special,
            Ident | String | Number | Arg | Variable => TokenCategory::Literal,
            Assign | AssignCmd | Equal | NotEqual | Plus | Minus | Gt | Lt | Colon | Semicolon
            | Amp => TokenCategory::Operator,
            LBrace | RBrace | LParen | RParen | LBrack | RBrack | Pipe | Comma => {
                TokenCategory::Delimiter
            }
            Builtin | Import | SetEnv | ShowEnv | BindFn | Dump | Return | If | Else | For
            | Rfork | Fn => TokenCategory::Keyword,
        }
    }

    pub fn is_literal(self) -> bool {
        self.category() == TokenCategory::Literal
    }

    pub fn is_operator(self) -> bool {
        self.category() == TokenCategory::Operator
    }

    pub fn is_delimiter(self) -> bool {
        self.category() == TokenCategory::Delimiter
    }

    pub fn is_keyword(self) -> bool {
        self.category() == TokenCategory::Keyword
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Illegal => "ILLEGAL",
            Self::Eof => "EOF",
            Self::Comment => "COMMENT",
            Self::Ident => "IDENT",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Arg => "ARG",
            Self::Variable => "VARIABLE",
            Self::Assign => "=",
            Self::AssignCmd => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Colon => ",",
            Self::Semicolon => ";",
            Self::Amp => "&",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrack => "[",
            Self::RBrack => "]",
            Self::Pipe => "|",
            Self::Comma => ",",
            Self::Builtin => "builtin",
            Self::Import => "import",
            Self::SetEnv => "setenv",
            Self::ShowEnv => "showenv",
            Self::BindFn => "bindfn",
            Self::Dump => "dump",
            Self::Return => "return",
            Self::If => "if",
            Self::Else => "else",
            Self::For => "for",
            Self::Rfork => "rfork",
            Self::Fn => "fn",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static::lazy_static! {
    /// Keyword text to token type, built from the keyword category.
    static ref KEYWORDS: HashMap<&'static str, TokenType> = TokenType::ALL
        .iter()
        .filter(|t| t.is_keyword())
        .map(|t| (t.as_str(), *t))
        .collect();
}

/// Classify an identifier: its keyword type if it is one, `Ident` otherwise.
pub fn lookup(ident: &str) -> TokenType {
    KEYWORDS.get(ident).copied().unwrap_or(TokenType::Ident)
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub token_type: TokenType,
    /// Literal text. For `String` tokens this is the unescaped content; for
    /// `Illegal` tokens it describes the offending input.
    pub value: String,
    /// Byte offset of the first character of the lexeme
    pub pos: Pos,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, pos: Pos) -> Self {
        Self {
            token_type,
            value: value.into(),
            pos,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_type {
            TokenType::Eof => write!(f, "EOF"),
            TokenType::Semicolon if self.value == "\n" => write!(f, "newline"),
            TokenType::String => write!(f, "{:?}", self.value),
            t if t.is_literal() || t == TokenType::Illegal => write!(f, "{}", self.value),
            t => write!(f, "'{}'", t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// At the beginning of a statement
    Statement,
    /// Reading the arguments of a command
    Argument,
    /// Reading an expression: assignment value, condition, invocation args
    Expression,
}

/// Check if a string has the shape of an identifier
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Whitespace other than the newline, which separates statements
fn is_blank(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters that end a statement-leading word
fn is_statement_boundary(c: char) -> bool {
    matches!(
        c,
        '"' | '$' | '{' | '}' | '(' | ')' | ';' | '|' | '&' | '<' | '>' | '=' | '+' | ','
    )
}

/// Characters that end a command argument
fn is_argument_boundary(c: char) -> bool {
    matches!(
        c,
        '"' | '$' | '+' | '|' | '&' | ';' | '{' | '}' | '(' | ')' | '<' | '>'
    )
}

/// Characters that end a bare word inside an expression
fn is_expression_boundary(c: char) -> bool {
    matches!(
        c,
        '"' | '$' | '+' | ',' | '(' | ')' | '{' | '}' | ';' | '|' | '&' | '=' | '<' | '>'
    )
}

/// Lazy, context-sensitive tokenizer.
///
/// `Lexer` is an iterator that ends with exactly one `Eof` token. Creating a
/// new lexer over the same input restarts the scan from the beginning.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    mode: Mode,
    paren_depth: usize,
    pending: VecDeque<Token>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            mode: Mode::Statement,
            paren_depth: 0,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(self) -> Vec<Token> {
        self.collect()
    }

    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn token(&self, token_type: TokenType, value: impl Into<String>, start: usize) -> Token {
        Token::new(token_type, value, Pos(start))
    }

    /// Consume `len` bytes and produce a token for them
    fn emit(&mut self, token_type: TokenType, start: usize, len: usize) -> Token {
        self.pos = start + len;
        let value = &self.input[start..self.pos];
        self.token(token_type, value, start)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            match c {
                c if is_blank(c) => {
                    self.advance();
                }
                '\\' if self.peek(1) == Some('\n') => {
                    // Line continuation
                    self.pos += 2;
                }
                '\n' if self.mode == Mode::Expression && self.paren_depth > 0 => {
                    self.advance();
                }
                '#' => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;
        let c = match self.current() {
            Some(c) => c,
            None => return self.token(TokenType::Eof, "", start),
        };

        if c == '\n' {
            self.advance();
            self.mode = Mode::Statement;
            self.paren_depth = 0;
            return self.token(TokenType::Semicolon, "\n", start);
        }

        let token = match self.mode {
            Mode::Statement => self.scan_statement(c, start),
            Mode::Argument => self.scan_argument(c, start),
            Mode::Expression => self.scan_expression(c, start),
        };

        // Every token other than Eof must consume input
        if self.pos == start {
            self.advance();
            return self.token(
                TokenType::Illegal,
                format!("unexpected character {:?}", c),
                start,
            );
        }
        token
    }

    fn scan_statement(&mut self, c: char, start: usize) -> Token {
        match c {
            '"' => {
                self.mode = Mode::Argument;
                self.scan_string(start)
            }
            '$' => {
                self.mode = Mode::Argument;
                self.scan_variable(start)
            }
            '{' => self.emit(TokenType::LBrace, start, 1),
            '}' => self.emit(TokenType::RBrace, start, 1),
            '(' => self.emit(TokenType::LParen, start, 1),
            ')' => self.emit(TokenType::RParen, start, 1),
            ';' => self.emit(TokenType::Semicolon, start, 1),
            '|' => self.emit(TokenType::Pipe, start, 1),
            '&' => self.emit(TokenType::Amp, start, 1),
            '+' => self.emit(TokenType::Plus, start, 1),
            ',' => self.emit(TokenType::Comma, start, 1),
            '<' | '>' | '=' | '!' => self.scan_operator(c, start),
            _ => {
                let word = self.scan_word(is_statement_boundary);
                if !is_identifier(word) {
                    self.mode = Mode::Argument;
                    return self.token(TokenType::Arg, word, start);
                }

                let token_type = lookup(word);
                self.mode = match token_type {
                    TokenType::Builtin => Mode::Statement,
                    t if t.is_keyword() => Mode::Expression,
                    _ => self.classify_statement_ident(),
                };
                self.token(token_type, word, start)
            }
        }
    }

    /// Decide what a statement-leading identifier begins by peeking past it.
    fn classify_statement_ident(&self) -> Mode {
        let rest = &self.input[self.pos..];
        if rest.starts_with('(') {
            // Invocation: `name(` with no space before the paren
            return Mode::Expression;
        }

        let rest = rest.trim_start_matches(is_blank);
        if rest.starts_with("<=") {
            // `<=` is lexed in statement mode, the command follows
            return Mode::Statement;
        }
        if rest.starts_with('=') && !rest.starts_with("==") {
            return Mode::Expression;
        }
        Mode::Argument
    }

    fn scan_argument(&mut self, c: char, start: usize) -> Token {
        match c {
            '"' => self.scan_string(start),
            '$' => self.scan_variable(start),
            '+' => self.emit(TokenType::Plus, start, 1),
            '&' => self.emit(TokenType::Amp, start, 1),
            '(' => self.emit(TokenType::LParen, start, 1),
            ')' => self.emit(TokenType::RParen, start, 1),
            '|' => {
                self.mode = Mode::Statement;
                self.emit(TokenType::Pipe, start, 1)
            }
            ';' => {
                self.mode = Mode::Statement;
                self.emit(TokenType::Semicolon, start, 1)
            }
            '{' => {
                self.mode = Mode::Statement;
                self.emit(TokenType::LBrace, start, 1)
            }
            '}' => {
                self.mode = Mode::Statement;
                self.emit(TokenType::RBrace, start, 1)
            }
            '>' | '<' => {
                let token_type = if c == '>' { TokenType::Gt } else { TokenType::Lt };
                let token = self.emit(token_type, start, 1);
                if self.current() == Some('[') {
                    self.scan_redirect_group();
                }
                token
            }
            _ => {
                let word = self.scan_word(is_argument_boundary);
                self.token(TokenType::Arg, word, start)
            }
        }
    }

    fn scan_expression(&mut self, c: char, start: usize) -> Token {
        match c {
            '"' => self.scan_string(start),
            '$' => self.scan_variable(start),
            '+' => self.emit(TokenType::Plus, start, 1),
            ',' => self.emit(TokenType::Comma, start, 1),
            '&' => self.emit(TokenType::Amp, start, 1),
            '(' => {
                self.paren_depth += 1;
                self.emit(TokenType::LParen, start, 1)
            }
            ')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                self.emit(TokenType::RParen, start, 1)
            }
            '{' | '}' | ';' | '|' => {
                let token_type = match c {
                    '{' => TokenType::LBrace,
                    '}' => TokenType::RBrace,
                    ';' => TokenType::Semicolon,
                    _ => TokenType::Pipe,
                };
                self.mode = Mode::Statement;
                self.paren_depth = 0;
                self.emit(token_type, start, 1)
            }
            '<' | '>' | '=' => self.scan_operator(c, start),
            '!' if self.peek(1) == Some('=') => self.scan_operator(c, start),
            _ => {
                let word = self.scan_word(is_expression_boundary);
                let token_type = if word.bytes().all(|b| b.is_ascii_digit()) {
                    TokenType::Number
                } else if is_identifier(word) {
                    lookup(word)
                } else {
                    TokenType::Arg
                };
                self.token(token_type, word, start)
            }
        }
    }

    /// Greedy comparison/assignment operators: `<=` before `<`, `==` before `=`.
    fn scan_operator(&mut self, c: char, start: usize) -> Token {
        let next = self.peek(1);
        match (c, next) {
            ('<', Some('=')) => self.emit(TokenType::AssignCmd, start, 2),
            ('=', Some('=')) => self.emit(TokenType::Equal, start, 2),
            ('!', Some('=')) => self.emit(TokenType::NotEqual, start, 2),
            ('<', _) => self.emit(TokenType::Lt, start, 1),
            ('>', _) => self.emit(TokenType::Gt, start, 1),
            ('=', _) => self.emit(TokenType::Assign, start, 1),
            _ => {
                self.advance();
                self.token(TokenType::Illegal, format!("unexpected character '{}'", c), start)
            }
        }
    }

    /// Read a bare word up to whitespace or a boundary character.
    fn scan_word(&mut self, is_boundary: fn(char) -> bool) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while let Some(c) = self.current() {
            if c.is_whitespace() || is_boundary(c) {
                break;
            }
            self.advance();
        }
        &input[start..self.pos]
    }

    fn scan_variable(&mut self, start: usize) -> Token {
        self.advance(); // $
        let name_start = self.pos;
        while let Some(c) = self.current() {
            if !is_name_char(c) {
                break;
            }
            self.advance();
        }
        if self.pos == name_start {
            return self.token(TokenType::Illegal, "invalid variable name after '$'", start);
        }
        let value = &self.input[start..self.pos];
        self.token(TokenType::Variable, value, start)
    }

    fn scan_string(&mut self, start: usize) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return self.token(
                        TokenType::Illegal,
                        format!("unterminated string: {}", &self.input[start..]),
                        start,
                    );
                }
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => {
                        return self.token(
                            TokenType::Illegal,
                            format!("unterminated string: {}", &self.input[start..]),
                            start,
                        );
                    }
                },
                Some(c) => value.push(c),
            }
        }

        self.token(TokenType::String, value, start)
    }

    /// Scan a redirect file-descriptor group: `[2]`, `[2=1]` or `[2=]`.
    fn scan_redirect_group(&mut self) {
        let start = self.pos;
        let bracket = self.emit(TokenType::LBrack, start, 1);
        self.pending.push_back(bracket);

        loop {
            let start = self.pos;
            match self.current() {
                Some(c) if c.is_ascii_digit() => {
                    let digits = self.scan_word(|c| !c.is_ascii_digit());
                    let token = self.token(TokenType::Number, digits, start);
                    self.pending.push_back(token);
                }
                Some('=') => {
                    let token = self.emit(TokenType::Assign, start, 1);
                    self.pending.push_back(token);
                }
                Some(']') => {
                    let token = self.emit(TokenType::RBrack, start, 1);
                    self.pending.push_back(token);
                    break;
                }
                _ => {
                    self.advance();
                    let token =
                        self.token(TokenType::Illegal, "unterminated redirect group", start);
                    self.pending.push_back(token);
                    break;
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = match self.pending.pop_front() {
            Some(token) => token,
            None if self.done => return None,
            None => self.next_token(),
        };
        if token.token_type == TokenType::Eof {
            self.done = true;
            self.pending.clear();
        }
        Some(token)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}
