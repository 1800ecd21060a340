//! Stylesheet printer.
//!
//! Writes every token of a [`Stylesheet`] back out in document order, exactly
//! as it was lexed. The only text the printer ever adds is a single space at a
//! junction where two name characters would otherwise run together: around
//! synthetic tokens inserted by the scoper, and between an at-rule keyword and
//! its prelude. An unmodified tree therefore prints back to its source.

use crate::css::location::LineIndex;
use crate::css::model::{Block, Node, Stylesheet};
use crate::css::sourcemap::{Mapping, SourceMap};
use crate::css::tokenizer::Token;

/// Print a stylesheet.
pub fn print(sheet: &Stylesheet) -> String {
    let mut printer = Printer::new(None);
    printer.stylesheet(sheet);
    printer.out
}

/// Print a stylesheet and build a source map against `source`, the text the
/// sheet was parsed from.
pub fn print_with_map(sheet: &Stylesheet, source: &str, map: SourceMap) -> (String, SourceMap) {
    let index = LineIndex::new(source);
    let mut printer = Printer::new(Some(MapBuilder {
        index,
        map,
        line: 0,
        column: 0,
    }));
    printer.stylesheet(sheet);
    let map = printer.map.map(|builder| builder.map).unwrap_or_default();
    (printer.out, map)
}

/// Characters that continue an identifier, number or at-keyword.
fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

struct MapBuilder<'a> {
    index: LineIndex<'a>,
    map: SourceMap,
    /// Generated position, UTF-16 columns.
    line: u32,
    column: u32,
}

impl MapBuilder<'_> {
    fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += ch.len_utf16() as u32;
            }
        }
    }
}

struct Printer<'a> {
    out: String,
    map: Option<MapBuilder<'a>>,
    /// The last write was synthetic; check the next junction.
    guard_next: bool,
}

impl<'a> Printer<'a> {
    fn new(map: Option<MapBuilder<'a>>) -> Self {
        Self {
            out: String::new(),
            map,
            guard_next: false,
        }
    }

    fn push_str(&mut self, text: &str) {
        if let Some(builder) = &mut self.map {
            builder.advance(text);
        }
        self.out.push_str(text);
    }

    /// Insert a space if `next` would fuse with what is already written.
    fn separate(&mut self, next: &str) {
        let joins = self.out.chars().next_back().is_some_and(is_name_char)
            && next.chars().next().is_some_and(is_name_char);
        if joins {
            self.push_str(" ");
        }
    }

    fn token(&mut self, token: &Token) {
        if token.is_synthetic() {
            self.separate(&token.text);
            self.push_str(&token.text);
            self.guard_next = true;
            return;
        }

        if std::mem::take(&mut self.guard_next) {
            self.separate(&token.text);
        }
        if let (Some(builder), Some(span), false) = (&mut self.map, token.span, token.is_trivia()) {
            let (original_line, original_column) = builder.index.utf16_position(span.start);
            builder.map.push(Mapping {
                generated_line: builder.line,
                generated_column: builder.column,
                original_line,
                original_column,
            });
        }
        self.push_str(&token.text);
    }

    fn tokens<'t>(&mut self, tokens: impl IntoIterator<Item = &'t Token>) {
        for token in tokens {
            self.token(token);
        }
    }

    fn stylesheet(&mut self, sheet: &Stylesheet) {
        for child in &sheet.children {
            self.node(child);
        }
        self.tokens(&sheet.trailing);
    }

    fn block(&mut self, block: &Block) {
        self.token(&block.open);
        for child in &block.children {
            self.node(child);
        }
        self.tokens(&block.trailing);
        self.token(&block.close);
    }

    fn node(&mut self, node: &Node) {
        self.tokens(node.leading());
        match node {
            Node::Rule(rule) => {
                for selector in &rule.selectors {
                    self.tokens(&selector.tokens);
                    self.tokens(&selector.comma);
                }
                self.block(&rule.block);
            }
            Node::AtRule(at_rule) => {
                self.token(&at_rule.name);
                if let Some(first) = at_rule.prelude.first() {
                    // `@media` + `only` must never print as `@mediaonly`.
                    self.separate(&first.text);
                }
                self.tokens(&at_rule.prelude);
                if let Some(block) = &at_rule.block {
                    self.block(block);
                }
                self.tokens(&at_rule.semicolon);
            }
            Node::Declaration(decl) => {
                self.token(&decl.property);
                self.tokens(&decl.before_colon);
                self.tokens(&decl.colon);
                self.tokens(&decl.value);
                self.tokens(&decl.semicolon);
            }
            Node::Comment(comment) => self.token(&comment.text),
        }
    }
}
