//! logos-based CSS tokenizer that never drops a byte.
//!
//! Unlike a tokenizer that feeds a value-level parser, this one keeps
//! whitespace and comments as tokens of their own so the printer can replay
//! the source exactly. Concatenating the text of every token returned by
//! [`tokenize`] yields the input unchanged.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `400px` as [`TokenKind::Dimension`] beats
//!    `Number` + `Ident`)
//! 2. For equal length matches, the more specific pattern wins
//!
//! Anything logos cannot match becomes a one-character [`TokenKind::Delim`].

use std::ops::Range;

use logos::Logos;

/// Lexical category of a [`Token`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(subpattern escape = r"(?:\\[0-9a-fA-F]{1,6}(?:\r\n|[ \t\n\r\f])?|\\[^\n\r\f0-9a-fA-F])")]
#[logos(subpattern name_start = r"(?:[a-zA-Z_\x{80}-\x{10FFFF}]|(?&escape))")]
#[logos(subpattern name_char = r"(?:[a-zA-Z0-9_\x{80}-\x{10FFFF}-]|(?&escape))")]
pub enum TokenKind {
    // ── Trivia ───────────────────────────────────────────────────────

    /// A run of spaces, tabs, newlines, carriage returns or form feeds.
    #[regex(r"[ \t\n\r\f]+")]
    Whitespace,

    /// `/* ... */`. An unterminated comment extends to end of input.
    #[token("/*", block_comment)]
    Comment,

    // ── Compound tokens ──────────────────────────────────────────────

    /// Double- or single-quoted string, quotes included.
    #[regex(r#""([^"\\\n]|\\.|\\\n)*""#)]
    #[regex(r"'([^'\\\n]|\\.|\\\n)*'")]
    String,

    /// At-rule keyword including the `@`: `@media`, `@-webkit-media`.
    #[regex(r"@-?-?(?&name_start)(?&name_char)*")]
    AtKeyword,

    /// `#` followed by name characters: ids and hex colors.
    #[regex(r"#(?&name_char)+")]
    Hash,

    /// Number with a unit or percent sign: `400px`, `50%`, `2n`.
    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)([a-zA-Z_][a-zA-Z0-9_-]*|%)")]
    Dimension,

    /// Bare number: `0`, `-5`, `1.5`, `.5`.
    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)")]
    Number,

    /// Identifier: `div`, `min-width`, `-webkit-box`, `--custom`. Escapes such
    /// as `sm\:flex` or `\31 0` are part of the name.
    #[regex(r"-?-?(?&name_start)(?&name_char)*")]
    Ident,

    // ── Punctuation ──────────────────────────────────────────────────

    /// `{`
    #[token("{")]
    BraceOpen,

    /// `}`
    #[token("}")]
    BraceClose,

    /// `(`
    #[token("(")]
    ParenOpen,

    /// `)`
    #[token(")")]
    ParenClose,

    /// `[`
    #[token("[")]
    BracketOpen,

    /// `]`
    #[token("]")]
    BracketClose,

    /// `:`
    #[token(":")]
    Colon,

    /// `;`
    #[token(";")]
    Semicolon,

    /// `,`
    #[token(",")]
    Comma,

    /// Any other single character: `.`, `>`, `+`, `~`, `*`, `&`, `!`, ...
    #[regex(r##"[!"#$%&'*+\-./<=>?@\\^`|~]"##)]
    Delim,
}

/// Consume everything up to and including the closing `*/`.
fn block_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    let rest = lex.remainder();
    let len = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
    lex.bump(len);
    true
}

/// Byte range of a token in the source it was lexed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

/// A lexed token: its kind, its exact source text and where it came from.
///
/// Tokens created by the scoper have no span; see [`Token::synthetic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Option<Span>,
}

impl Token {
    /// Build a token that does not originate from the source.
    pub fn synthetic(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            span: None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.span.is_none()
    }

    /// Whitespace or comment.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }

    /// Returns `true` for a [`TokenKind::Delim`] whose text is `ch`.
    pub fn is_delim(&self, ch: char) -> bool {
        self.kind == TokenKind::Delim && self.text.len() == ch.len_utf8() && self.text.starts_with(ch)
    }
}

/// Tokenize a CSS string. Total: every byte of `input` ends up in exactly one
/// token, in order.
pub fn tokenize(input: &str) -> Vec<Token> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, span)| Token {
            // Control characters are the only thing the patterns above miss;
            // keep them as delimiters rather than losing them.
            kind: result.unwrap_or(TokenKind::Delim),
            text: input[span.clone()].to_string(),
            span: Some(span.into()),
        })
        .collect()
}
