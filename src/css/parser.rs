//! Recursive descent CSS parser.
//!
//! Builds a [`Stylesheet`] concrete syntax tree from the token stream produced
//! by [`crate::css::tokenizer`]. The parser never discards a token: every
//! whitespace run, comment and stray semicolon lands somewhere in the tree.
//!
//! Only two inputs are rejected, both as
//! [`ParseError::MalformedStylesheet`]: a `}` with no open block, and a block
//! still open at end of input. Everything else, including at-rules the parser
//! knows nothing about, parses generically.

use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use crate::css::location::Location;
use crate::css::model::*;
use crate::css::tokenizer::{tokenize, Token, TokenKind};

/// Errors from CSS parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed stylesheet at {location}: {reason}")]
    MalformedStylesheet {
        location: Location,
        reason: MalformedReason,
    },
}

impl ParseError {
    pub fn location(&self) -> Location {
        match self {
            ParseError::MalformedStylesheet { location, .. } => *location,
        }
    }
}

/// Why a stylesheet could not be given a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// `}` at the top level.
    UnmatchedCloseBrace,
    /// `{` never closed; the location points at the `{`.
    UnclosedBlock,
    /// Blocks nested deeper than [`MAX_NESTING_DEPTH`]; the location points
    /// at the first `{` past the limit.
    NestingTooDeep,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::UnmatchedCloseBrace => write!(f, "unexpected '}}' with no open block"),
            MalformedReason::UnclosedBlock => write!(f, "block is never closed"),
            MalformedReason::NestingTooDeep => {
                write!(f, "blocks nested deeper than {MAX_NESTING_DEPTH} levels")
            }
        }
    }
}

/// Deepest block nesting the parser accepts. Every tree walk recurses once
/// per level, so this bounds stack use for parsing, scoping and printing.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Parse a CSS string into a [`Stylesheet`].
pub fn parse_css(input: &str) -> Result<Stylesheet, ParseError> {
    parse(tokenize(input))
}

/// Parse a token stream into a [`Stylesheet`].
pub fn parse(tokens: Vec<Token>) -> Result<Stylesheet, ParseError> {
    let mut parser = Parser {
        tokens: tokens.into(),
        location: Location::start(),
        depth: 0,
    };

    // At the top level a `}` is an error, so this only returns at end of input.
    let body = parser.parse_statements(false)?;
    Ok(Stylesheet {
        children: body.children,
        trailing: body.trailing,
    })
}

fn malformed(location: Location, reason: MalformedReason) -> ParseError {
    ParseError::MalformedStylesheet { location, reason }
}

/// Statements read up to a `}` or end of input.
struct Statements {
    children: Vec<Node>,
    trailing: Vec<Token>,
    close: Option<Located>,
}

/// A consumed token and where it started.
struct Located {
    token: Token,
    location: Location,
}

/// Recursive descent parser state.
struct Parser {
    tokens: VecDeque<Token>,
    /// Position of the next unconsumed token.
    location: Location,
    /// Blocks currently open.
    depth: usize,
}

impl Parser {
    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.front().map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.pop_front()?;
        self.location.advance(&token.text);
        Some(token)
    }

    fn bump_located(&mut self) -> Option<Located> {
        let location = self.location;
        self.bump().map(|token| Located { token, location })
    }

    /// Whitespace and stray `;` before a statement.
    fn take_trivia(&mut self) -> Vec<Token> {
        let mut trivia = Vec::new();
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Whitespace | TokenKind::Semicolon)
        ) {
            trivia.extend(self.bump());
        }
        trivia
    }

    /// Parse statements until end of input or a `}`.
    ///
    /// Inside a block (`nested`), the `}` is consumed and returned. At the top
    /// level it is reported as an error.
    fn parse_statements(&mut self, nested: bool) -> Result<Statements, ParseError> {
        let mut children = Vec::new();

        loop {
            let leading = self.take_trivia();

            let Some(first) = self.bump_located() else {
                return Ok(Statements {
                    children,
                    trailing: leading,
                    close: None,
                });
            };

            match first.token.kind {
                TokenKind::BraceClose if nested => {
                    return Ok(Statements {
                        children,
                        trailing: leading,
                        close: Some(first),
                    });
                }
                TokenKind::BraceClose => {
                    return Err(malformed(first.location, MalformedReason::UnmatchedCloseBrace));
                }
                TokenKind::Comment => children.push(Node::Comment(Comment {
                    leading,
                    text: first.token,
                })),
                TokenKind::AtKeyword => {
                    children.push(Node::AtRule(self.parse_at_rule(leading, first.token)?));
                }
                _ if self.starts_rule(&first.token) => {
                    children.push(Node::Rule(self.parse_rule(leading, first)?));
                }
                _ => children.push(Node::Declaration(self.parse_declaration(leading, first.token))),
            }
        }
    }

    /// A statement is a rule when `{` comes before `;` or `}` at depth zero.
    fn starts_rule(&self, first: &Token) -> bool {
        let mut depth = 0usize;
        for token in std::iter::once(first).chain(self.tokens.iter()) {
            match token.kind {
                TokenKind::ParenOpen | TokenKind::BracketOpen => depth += 1,
                TokenKind::ParenClose | TokenKind::BracketClose => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::BraceOpen if depth == 0 => return true,
                TokenKind::Semicolon | TokenKind::BraceClose if depth == 0 => return false,
                _ => {}
            }
        }
        false
    }

    /// Parse `selector, selector { ... }`. `first` is the first selector token,
    /// or the `{` itself for an empty selector.
    fn parse_rule(&mut self, leading: Vec<Token>, first: Located) -> Result<Rule, ParseError> {
        let mut selectors = Vec::new();
        let mut current = Vec::new();
        let mut depth = 0usize;
        let mut next = Some(first);

        // `starts_rule` guarantees a depth-zero `{` ahead.
        while let Some(located) = next.take() {
            let token = located.token;
            match token.kind {
                TokenKind::BraceOpen if depth == 0 => {
                    selectors.push(Selector {
                        tokens: std::mem::take(&mut current),
                        comma: None,
                    });
                    let block = self.parse_block(token, located.location)?;
                    return Ok(Rule {
                        leading,
                        selectors,
                        block,
                    });
                }
                TokenKind::Comma if depth == 0 => {
                    selectors.push(Selector {
                        tokens: std::mem::take(&mut current),
                        comma: Some(token),
                    });
                }
                TokenKind::ParenOpen | TokenKind::BracketOpen => {
                    depth += 1;
                    current.push(token);
                }
                TokenKind::ParenClose | TokenKind::BracketClose => {
                    depth = depth.saturating_sub(1);
                    current.push(token);
                }
                _ => current.push(token),
            }
            next = self.bump_located();
        }

        // Unreachable in practice; treat a missing `{` like an unclosed block.
        Err(malformed(self.location, MalformedReason::UnclosedBlock))
    }

    /// Parse the body after `open` up to and including its `}`.
    fn parse_block(&mut self, open: Token, opened_at: Location) -> Result<Block, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(malformed(opened_at, MalformedReason::NestingTooDeep));
        }
        self.depth += 1;
        let body = self.parse_statements(true);
        self.depth -= 1;
        let body = body?;
        let Some(close) = body.close else {
            return Err(malformed(opened_at, MalformedReason::UnclosedBlock));
        };
        Ok(Block {
            open,
            children: body.children,
            trailing: body.trailing,
            close: close.token,
        })
    }

    /// Parse an at-rule after its keyword.
    ///
    /// The prelude is every token up to a `{` or `;` at nesting depth zero, or
    /// a `}` that closes the enclosing block, or end of input.
    fn parse_at_rule(&mut self, leading: Vec<Token>, name: Token) -> Result<AtRule, ParseError> {
        let mut prelude = Vec::new();
        let mut depth = 0usize;

        loop {
            match self.peek_kind() {
                None => break,
                Some(TokenKind::BraceOpen) if depth == 0 => {
                    let opened_at = self.location;
                    let Some(open) = self.bump() else { break };
                    let block = self.parse_block(open, opened_at)?;
                    return Ok(AtRule {
                        leading,
                        name,
                        prelude,
                        block: Some(block),
                        semicolon: None,
                    });
                }
                Some(TokenKind::Semicolon) if depth == 0 => {
                    let semicolon = self.bump();
                    return Ok(AtRule {
                        leading,
                        name,
                        prelude,
                        block: None,
                        semicolon,
                    });
                }
                Some(TokenKind::BraceClose) if depth == 0 => break,
                Some(TokenKind::ParenOpen | TokenKind::BracketOpen) => depth += 1,
                Some(TokenKind::ParenClose | TokenKind::BracketClose) => {
                    depth = depth.saturating_sub(1)
                }
                Some(_) => {}
            }
            prelude.extend(self.bump());
        }

        trace!(name = %name.text, "at-rule prelude ends without block or semicolon");
        Ok(AtRule {
            leading,
            name,
            prelude,
            block: None,
            semicolon: None,
        })
    }

    /// Parse a declaration after its property token. Total.
    fn parse_declaration(&mut self, leading: Vec<Token>, property: Token) -> Declaration {
        let mut before_colon = Vec::new();
        while self.tokens.front().is_some_and(Token::is_trivia) {
            before_colon.extend(self.bump());
        }

        let colon = if self.peek_kind() == Some(TokenKind::Colon) {
            self.bump()
        } else {
            trace!(property = %property.text, "declaration without colon");
            None
        };

        let mut value = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                None => break,
                Some(TokenKind::Semicolon | TokenKind::BraceClose) if depth == 0 => break,
                Some(TokenKind::ParenOpen | TokenKind::BracketOpen) => depth += 1,
                Some(TokenKind::ParenClose | TokenKind::BracketClose) => {
                    depth = depth.saturating_sub(1)
                }
                Some(_) => {}
            }
            value.extend(self.bump());
        }

        let semicolon = if self.peek_kind() == Some(TokenKind::Semicolon) {
            self.bump()
        } else {
            None
        };

        Declaration {
            leading,
            property,
            before_colon,
            colon,
            value,
            semicolon,
        }
    }
}
