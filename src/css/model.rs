//! Concrete syntax tree: Stylesheet, Rule, AtRule, Declaration, Comment.
//!
//! Every node keeps the exact tokens it was parsed from, including the
//! whitespace around it (`leading`) and inside it. Walking the tree with
//! [`Stylesheet::tokens`] yields the original token stream.

use crate::css::tokenizer::{Token, TokenKind};

/// One statement in a stylesheet or block.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Declaration(Declaration),
    Comment(Comment),
}

impl Node {
    /// Trivia that precedes the node.
    pub fn leading(&self) -> &[Token] {
        match self {
            Node::Rule(rule) => &rule.leading,
            Node::AtRule(at_rule) => &at_rule.leading,
            Node::Declaration(decl) => &decl.leading,
            Node::Comment(comment) => &comment.leading,
        }
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            Node::Rule(rule) => {
                out.extend(&rule.leading);
                for selector in &rule.selectors {
                    out.extend(&selector.tokens);
                    out.extend(&selector.comma);
                }
                rule.block.collect_tokens(out);
            }
            Node::AtRule(at_rule) => {
                out.extend(&at_rule.leading);
                out.push(&at_rule.name);
                out.extend(&at_rule.prelude);
                if let Some(block) = &at_rule.block {
                    block.collect_tokens(out);
                }
                out.extend(&at_rule.semicolon);
            }
            Node::Declaration(decl) => {
                out.extend(&decl.leading);
                out.push(&decl.property);
                out.extend(&decl.before_colon);
                out.extend(&decl.colon);
                out.extend(&decl.value);
                out.extend(&decl.semicolon);
            }
            Node::Comment(comment) => {
                out.extend(&comment.leading);
                out.push(&comment.text);
            }
        }
    }
}

/// A `{ ... }` body.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub open: Token,
    pub children: Vec<Node>,
    /// Trivia between the last child and `}`.
    pub trailing: Vec<Token>,
    pub close: Token,
}

impl Block {
    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        out.push(&self.open);
        for child in &self.children {
            child.collect_tokens(out);
        }
        out.extend(&self.trailing);
        out.push(&self.close);
    }
}

/// One entry of a selector list, e.g. ` p > a` in `div, p > a {`.
///
/// `tokens` holds everything between the previous comma (or the start of the
/// rule) and the next comma (or `{`), whitespace included.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub tokens: Vec<Token>,
    pub comma: Option<Token>,
}

impl Selector {
    /// Selector text without surrounding whitespace.
    pub fn text(&self) -> String {
        join(&self.tokens).trim().to_string()
    }
}

/// A qualified rule: `selectors { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub leading: Vec<Token>,
    pub selectors: Vec<Selector>,
    pub block: Block,
}

/// An at-rule: keyword, opaque prelude, then a block, a `;`, or nothing.
///
/// The prelude is the verbatim token list between the keyword and the
/// block or semicolon. It usually begins with whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub leading: Vec<Token>,
    /// The [`TokenKind::AtKeyword`] token, `@` included.
    pub name: Token,
    pub prelude: Vec<Token>,
    pub block: Option<Block>,
    pub semicolon: Option<Token>,
}

const VENDOR_PREFIXES: [&str; 4] = ["-webkit-", "-moz-", "-ms-", "-o-"];

impl AtRule {
    /// Keyword without the `@`: `media`, `-webkit-media`.
    pub fn name(&self) -> &str {
        self.name.text.strip_prefix('@').unwrap_or(&self.name.text)
    }

    /// Keyword without `@` or vendor prefix: `-webkit-keyframes` -> `keyframes`.
    pub fn vendorless_name(&self) -> &str {
        let name = self.name();
        VENDOR_PREFIXES
            .iter()
            .find_map(|prefix| strip_prefix_ignore_case(name, prefix))
            .unwrap_or(name)
    }

    /// Prelude text exactly as written, leading whitespace included.
    pub fn prelude_text(&self) -> String {
        join(&self.prelude)
    }

    /// Statement-level at-rule with neither block nor `;` (cut off by `}` or
    /// end of input).
    pub fn is_prelude_only(&self) -> bool {
        self.block.is_none() && self.semicolon.is_none()
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// `property: value;`
///
/// A declaration without a colon keeps everything after the property in
/// `value` and leaves `colon` empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub leading: Vec<Token>,
    pub property: Token,
    /// Trivia between the property and the colon.
    pub before_colon: Vec<Token>,
    pub colon: Option<Token>,
    /// Everything up to `;` or `}`, whitespace included.
    pub value: Vec<Token>,
    pub semicolon: Option<Token>,
}

impl Declaration {
    pub fn property_name(&self) -> &str {
        &self.property.text
    }

    /// Value text without surrounding whitespace.
    pub fn value_text(&self) -> String {
        join(&self.value).trim().to_string()
    }

    /// `!important` at the end of the value (any case, whitespace allowed
    /// after the `!`).
    pub fn is_important(&self) -> bool {
        let mut meaningful = self.value.iter().rev().filter(|t| !t.is_trivia());
        let last = meaningful.next();
        let bang = meaningful.next();
        matches!(
            (bang, last),
            (Some(b), Some(l)) if b.is_delim('!')
                && l.kind == TokenKind::Ident
                && l.text.eq_ignore_ascii_case("important")
        )
    }
}

/// A comment in statement position.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub leading: Vec<Token>,
    pub text: Token,
}

/// A parsed style block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
    pub children: Vec<Node>,
    /// Trivia after the last statement.
    pub trailing: Vec<Token>,
}

impl Stylesheet {
    /// Create an empty stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every token in document order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        for child in &self.children {
            child.collect_tokens(&mut out);
        }
        out.extend(&self.trailing);
        out
    }

    /// All rules at any depth, in document order.
    pub fn rules(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        collect_rules(&self.children, &mut out);
        out
    }

    /// All at-rules at any depth, in document order.
    pub fn at_rules(&self) -> Vec<&AtRule> {
        let mut out = Vec::new();
        collect_at_rules(&self.children, &mut out);
        out
    }

    /// All declarations at any depth, in document order.
    pub fn declarations(&self) -> Vec<&Declaration> {
        let mut out = Vec::new();
        collect_declarations(&self.children, &mut out);
        out
    }
}

fn children_of(node: &Node) -> &[Node] {
    match node {
        Node::Rule(rule) => &rule.block.children,
        Node::AtRule(AtRule {
            block: Some(block), ..
        }) => &block.children,
        _ => &[],
    }
}

fn collect_rules<'a>(nodes: &'a [Node], out: &mut Vec<&'a Rule>) {
    for node in nodes {
        if let Node::Rule(rule) = node {
            out.push(rule);
        }
        collect_rules(children_of(node), out);
    }
}

fn collect_at_rules<'a>(nodes: &'a [Node], out: &mut Vec<&'a AtRule>) {
    for node in nodes {
        if let Node::AtRule(at_rule) = node {
            out.push(at_rule);
        }
        collect_at_rules(children_of(node), out);
    }
}

fn collect_declarations<'a>(nodes: &'a [Node], out: &mut Vec<&'a Declaration>) {
    for node in nodes {
        if let Node::Declaration(decl) = node {
            out.push(decl);
        }
        collect_declarations(children_of(node), out);
    }
}

/// Concatenate token texts.
pub fn join<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> String {
    tokens.into_iter().map(|t| t.text.as_str()).collect()
}
