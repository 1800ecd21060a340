//! Selector scoping.
//!
//! Appends a scope selector (`.svelte-xyz` by default) to every compound
//! selector in a stylesheet so its rules only match inside one component.
//! Only [`Selector`](crate::css::model::Selector) token lists are rewritten:
//! declarations and at-rule preludes are never touched, and no whitespace is
//! added or removed.
//!
//! Placement within a compound:
//!
//! ```text
//! div            -> div.svelte-xyz
//! a:hover        -> a.svelte-xyz:hover
//! p::before      -> p.svelte-xyz::before
//! :focus         -> .svelte-xyz:focus
//! :global(.x) y  -> .x y.svelte-xyz
//! ```

use std::ops::Range;

use tracing::trace;

use crate::css::model::{AtRule, Node, Rule, Stylesheet};
use crate::css::tokenizer::{Token, TokenKind};

/// How the scope token is written into a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeStrategy {
    /// `.token`
    #[default]
    Class,
    /// `[token]`
    Attribute,
    /// `:where(.token)`, adding no specificity.
    Where,
}

/// A scope token plus the way it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    token: String,
    strategy: ScopeStrategy,
}

impl Scope {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            strategy: ScopeStrategy::default(),
        }
    }

    /// Set the strategy (builder).
    pub fn with_strategy(mut self, strategy: ScopeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn strategy(&self) -> ScopeStrategy {
        self.strategy
    }

    /// The synthetic tokens inserted into each compound selector.
    pub fn selector_tokens(&self) -> Vec<Token> {
        let name = Token::synthetic(TokenKind::Ident, self.token.as_str());
        match self.strategy {
            ScopeStrategy::Class => vec![Token::synthetic(TokenKind::Delim, "."), name],
            ScopeStrategy::Attribute => vec![
                Token::synthetic(TokenKind::BracketOpen, "["),
                name,
                Token::synthetic(TokenKind::BracketClose, "]"),
            ],
            ScopeStrategy::Where => vec![
                Token::synthetic(TokenKind::Colon, ":"),
                Token::synthetic(TokenKind::Ident, "where"),
                Token::synthetic(TokenKind::ParenOpen, "("),
                Token::synthetic(TokenKind::Delim, "."),
                name,
                Token::synthetic(TokenKind::ParenClose, ")"),
            ],
        }
    }

    /// The inserted selector as text, e.g. `.svelte-xyz`.
    pub fn selector_text(&self) -> String {
        self.selector_tokens().into_iter().map(|t| t.text).collect()
    }
}

/// Hash a style block into a short base-36 string.
///
/// Carriage returns are ignored so CRLF and LF checkouts hash the same. The
/// hash runs over UTF-16 code units, last to first.
pub fn scope_hash(css: &str) -> String {
    let units: Vec<u16> = css.encode_utf16().filter(|&u| u != u16::from(b'\r')).collect();
    let mut hash: u32 = 5381;
    for &unit in units.iter().rev() {
        hash = (hash << 5).wrapping_sub(hash) ^ u32::from(unit);
    }
    to_base36(hash)
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits.iter().rev().map(|&d| d as char).collect()
}

/// At-rules whose block holds ordinary rules that must be scoped too.
const GROUPING_AT_RULES: [&str; 7] = [
    "media",
    "supports",
    "container",
    "layer",
    "document",
    "scope",
    "starting-style",
];

/// Scope every rule in `sheet` in place.
pub fn scope(sheet: &mut Stylesheet, scope: &Scope) {
    scope_nodes(&mut sheet.children, scope);
}

fn scope_nodes(nodes: &mut [Node], scope: &Scope) {
    for node in nodes {
        match node {
            Node::Rule(rule) => scope_rule(rule, scope),
            Node::AtRule(at_rule) => scope_at_rule(at_rule, scope),
            Node::Declaration(_) | Node::Comment(_) => {}
        }
    }
}

fn scope_rule(rule: &mut Rule, scope: &Scope) {
    for selector in &mut rule.selectors {
        scope_selector(&mut selector.tokens, scope);
    }
    scope_nodes(&mut rule.block.children, scope);
}

fn scope_at_rule(at_rule: &mut AtRule, scope: &Scope) {
    let name = at_rule.vendorless_name();
    let groups_rules = GROUPING_AT_RULES
        .iter()
        .any(|g| name.eq_ignore_ascii_case(g));
    if !groups_rules {
        if at_rule.block.is_some() {
            trace!(name = %at_rule.name.text, "leaving at-rule body unscoped");
        }
        return;
    }
    if let Some(block) = &mut at_rule.block {
        scope_nodes(&mut block.children, scope);
    }
}

/// Rewrite one selector of a selector list.
fn scope_selector(tokens: &mut Vec<Token>, scope: &Scope) {
    // Back to front so earlier ranges stay valid after each splice.
    for range in compound_ranges(tokens).into_iter().rev() {
        if let Some(rewritten) = scope_compound(&tokens[range.clone()], scope) {
            tokens.splice(range, rewritten);
        }
    }
}

/// Whitespace, comments and `>`, `+`, `~` separate compounds.
fn is_combinator(token: &Token) -> bool {
    token.is_trivia() || token.is_delim('>') || token.is_delim('+') || token.is_delim('~')
}

/// Token ranges of the compound selectors in `tokens`. Parentheses and
/// brackets are opaque: `:not(a > b)` is one compound.
fn compound_ranges(tokens: &[Token]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = None;
    let mut depth = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        if depth == 0 && is_combinator(token) {
            if let Some(s) = start.take() {
                ranges.push(s..i);
            }
            continue;
        }
        start.get_or_insert(i);
        match token.kind {
            TokenKind::ParenOpen | TokenKind::BracketOpen => depth += 1,
            TokenKind::ParenClose | TokenKind::BracketClose => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if let Some(s) = start {
        ranges.push(s..tokens.len());
    }
    ranges
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimpleKind {
    Type,
    Universal,
    Class,
    Id,
    Attribute,
    PseudoClass,
    PseudoElement,
    /// `:global(...)`
    Global,
    /// `&`
    Nesting,
    Other,
}

impl SimpleKind {
    /// Kinds the scope may follow.
    fn anchors_scope(self) -> bool {
        matches!(
            self,
            SimpleKind::Type
                | SimpleKind::Universal
                | SimpleKind::Class
                | SimpleKind::Id
                | SimpleKind::Attribute
        )
    }
}

/// One simple selector inside a compound.
#[derive(Debug)]
struct Simple<'a> {
    kind: SimpleKind,
    range: Range<usize>,
    /// Tokens between the parentheses of a functional pseudo-class.
    arguments: Option<Range<usize>>,
    /// Pseudo-class or pseudo-element name.
    name: &'a str,
}

/// Pseudo-elements that may be written with a single colon.
const LEGACY_PSEUDO_ELEMENTS: [&str; 4] = ["before", "after", "first-line", "first-letter"];

/// Returns `(arguments_end, end)` for the group opened at `open`: the index
/// of the matching close token and the index after it. An unclosed group runs
/// to the end.
fn group_end(tokens: &[Token], open: usize) -> (usize, usize) {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::ParenOpen | TokenKind::BracketOpen => depth += 1,
            TokenKind::ParenClose | TokenKind::BracketClose => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (i, i + 1);
                }
            }
            _ => {}
        }
    }
    (tokens.len(), tokens.len())
}

fn pseudo(compound: &[Token], colon: usize) -> Simple<'_> {
    let double = compound
        .get(colon + 1)
        .is_some_and(|t| t.kind == TokenKind::Colon);
    let name_at = if double { colon + 2 } else { colon + 1 };

    let Some(name_token) = compound.get(name_at).filter(|t| t.kind == TokenKind::Ident) else {
        return Simple {
            kind: SimpleKind::Other,
            range: colon..name_at,
            arguments: None,
            name: "",
        };
    };
    let name = name_token.text.as_str();

    let mut end = name_at + 1;
    let mut arguments = None;
    if compound.get(end).is_some_and(|t| t.kind == TokenKind::ParenOpen) {
        let (arguments_end, after) = group_end(compound, end);
        arguments = Some(end + 1..arguments_end);
        end = after;
    }

    let kind = if double
        || LEGACY_PSEUDO_ELEMENTS
            .iter()
            .any(|e| name.eq_ignore_ascii_case(e))
    {
        SimpleKind::PseudoElement
    } else if arguments.is_some() && name.eq_ignore_ascii_case("global") {
        SimpleKind::Global
    } else {
        SimpleKind::PseudoClass
    };

    Simple {
        kind,
        range: colon..end,
        arguments,
        name,
    }
}

fn simple_selectors(compound: &[Token]) -> Vec<Simple<'_>> {
    let mut simples = Vec::new();
    let mut i = 0;

    while i < compound.len() {
        let token = &compound[i];
        let simple = match token.kind {
            TokenKind::Colon => pseudo(compound, i),
            TokenKind::BracketOpen => Simple {
                kind: SimpleKind::Attribute,
                range: i..group_end(compound, i).1,
                arguments: None,
                name: "",
            },
            _ => {
                let (kind, len) = match token.kind {
                    TokenKind::Ident => (SimpleKind::Type, 1),
                    TokenKind::Hash => (SimpleKind::Id, 1),
                    TokenKind::Delim if token.is_delim('*') => (SimpleKind::Universal, 1),
                    TokenKind::Delim if token.is_delim('&') => (SimpleKind::Nesting, 1),
                    TokenKind::Delim if token.is_delim('.') => {
                        let named = compound
                            .get(i + 1)
                            .is_some_and(|t| t.kind == TokenKind::Ident);
                        (SimpleKind::Class, if named { 2 } else { 1 })
                    }
                    _ => (SimpleKind::Other, 1),
                };
                Simple {
                    kind,
                    range: i..i + len,
                    arguments: None,
                    name: "",
                }
            }
        };
        // Every arm consumes at least one token.
        i = simple.range.end.max(i + 1);
        simples.push(simple);
    }

    simples
}

/// Strip leading and trailing trivia.
fn trim_trivia(tokens: &[Token]) -> &[Token] {
    let start = tokens.iter().position(|t| !t.is_trivia()).unwrap_or(tokens.len());
    let end = tokens.iter().rposition(|t| !t.is_trivia()).map_or(start, |i| i + 1);
    &tokens[start..end]
}

enum Insert {
    /// After the simple selector at this index.
    After(usize),
    /// Before the first simple selector.
    Front,
    Nowhere,
}

/// The rewritten compound, or `None` to leave it as is.
fn scope_compound(compound: &[Token], scope: &Scope) -> Option<Vec<Token>> {
    let simples = simple_selectors(compound);

    if simples.iter().any(|s| s.kind == SimpleKind::Nesting) {
        trace!("leaving compound with nesting selector unscoped");
        return None;
    }

    let has_global = simples.iter().any(|s| s.kind == SimpleKind::Global);
    let root_or_host = simples.iter().any(|s| {
        s.kind == SimpleKind::PseudoClass
            && (s.name.eq_ignore_ascii_case("root") || s.name.eq_ignore_ascii_case("host"))
    });

    let insert = match simples.iter().rposition(|s| s.kind.anchors_scope()) {
        Some(i) => Insert::After(i),
        None if has_global || root_or_host => Insert::Nowhere,
        None => Insert::Front,
    };
    if matches!(insert, Insert::Nowhere) && !has_global {
        return None;
    }

    let mut out = Vec::with_capacity(compound.len() + 3);
    if matches!(insert, Insert::Front) {
        out.extend(scope.selector_tokens());
    }
    for (i, simple) in simples.iter().enumerate() {
        match (&simple.kind, &simple.arguments) {
            (SimpleKind::Global, Some(arguments)) => {
                out.extend_from_slice(trim_trivia(&compound[arguments.clone()]));
            }
            _ => out.extend_from_slice(&compound[simple.range.clone()]),
        }
        if matches!(insert, Insert::After(at) if at == i) {
            out.extend(scope.selector_tokens());
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::model::join;
    use crate::css::parser::parse_css;
    use crate::css::printer::print;
    use pretty_assertions::assert_eq;

    fn scoped_with(input: &str, scope_: &Scope) -> String {
        let mut sheet = parse_css(input).unwrap_or_else(|e| panic!("parse failed: {e}"));
        scope(&mut sheet, scope_);
        print(&sheet)
    }

    fn scoped(input: &str) -> String {
        scoped_with(input, &Scope::new("svelte-xyz"))
    }

    // ── Placement ────────────────────────────────────────────────────

    #[test]
    fn type_selector() {
        assert_eq!(scoped("div { color: blue; }"), "div.svelte-xyz { color: blue; }");
    }

    #[test]
    fn every_compound_is_scoped() {
        assert_eq!(
            scoped("div > p, a ~ b + i {}"),
            "div.svelte-xyz > p.svelte-xyz, a.svelte-xyz ~ b.svelte-xyz + i.svelte-xyz {}"
        );
    }

    #[test]
    fn combinators_without_spaces() {
        assert_eq!(scoped("div+p>a{}"), "div.svelte-xyz+p.svelte-xyz>a.svelte-xyz{}");
    }

    #[test]
    fn classes_ids_and_attributes() {
        assert_eq!(scoped(".a.b {}"), ".a.b.svelte-xyz {}");
        assert_eq!(scoped("#main {}"), "#main.svelte-xyz {}");
        assert_eq!(
            scoped("input[type=\"text\"] {}"),
            "input[type=\"text\"].svelte-xyz {}"
        );
        assert_eq!(scoped("* {}"), "*.svelte-xyz {}");
    }

    #[test]
    fn escaped_class_names_are_one_selector() {
        assert_eq!(scoped(r".sm\:flex {}"), r".sm\:flex.svelte-xyz {}");
        assert_eq!(scoped(r".w-1\/2 {}"), r".w-1\/2.svelte-xyz {}");
        assert_eq!(
            scoped(r".md\:hover\:bg-red:hover {}"),
            r".md\:hover\:bg-red.svelte-xyz:hover {}"
        );
        assert_eq!(scoped(r"#\31 23 {}"), r"#\31 23.svelte-xyz {}");
    }

    #[test]
    fn before_pseudo_classes_and_elements() {
        assert_eq!(scoped("a:hover {}"), "a.svelte-xyz:hover {}");
        assert_eq!(scoped("p::before {}"), "p.svelte-xyz::before {}");
        assert_eq!(scoped("p:after {}"), "p.svelte-xyz:after {}");
        assert_eq!(scoped("a:hover.b {}"), "a:hover.b.svelte-xyz {}");
    }

    #[test]
    fn functional_pseudo_class_is_opaque() {
        assert_eq!(
            scoped("a:not(.b, .c) {}"),
            "a.svelte-xyz:not(.b, .c) {}"
        );
        assert_eq!(
            scoped("li:nth-child(2n + 1) {}"),
            "li.svelte-xyz:nth-child(2n + 1) {}"
        );
    }

    #[test]
    fn pseudo_only_compound_gets_scope_in_front() {
        assert_eq!(scoped(":focus {}"), ".svelte-xyz:focus {}");
        assert_eq!(scoped("div :hover {}"), "div.svelte-xyz .svelte-xyz:hover {}");
    }

    #[test]
    fn whitespace_and_comments_are_untouched() {
        assert_eq!(
            scoped("div/* c */p ,\n\ta  >  b {}"),
            "div.svelte-xyz/* c */p.svelte-xyz ,\n\ta.svelte-xyz  >  b.svelte-xyz {}"
        );
    }

    // ── Exemptions ───────────────────────────────────────────────────

    #[test]
    fn global_compound_is_unwrapped() {
        assert_eq!(scoped(":global(body) div {}"), "body div.svelte-xyz {}");
        assert_eq!(scoped("div :global(.a) {}"), "div.svelte-xyz .a {}");
        assert_eq!(scoped(":global( .x > .y ) {}"), ".x > .y {}");
    }

    #[test]
    fn global_attached_to_scoped_compound() {
        assert_eq!(scoped("div:global(.open) {}"), "div.svelte-xyz.open {}");
    }

    #[test]
    fn root_and_host_are_left_alone() {
        assert_eq!(scoped(":root { --x: 1 }"), ":root { --x: 1 }");
        assert_eq!(scoped(":host p {}"), ":host p.svelte-xyz {}");
    }

    #[test]
    fn nesting_selector_is_left_alone() {
        assert_eq!(
            scoped("div { &:hover { color: red } }"),
            "div.svelte-xyz { &:hover { color: red } }"
        );
    }

    #[test]
    fn nested_rules_recurse() {
        assert_eq!(
            scoped("div { span { color: red } }"),
            "div.svelte-xyz { span.svelte-xyz { color: red } }"
        );
    }

    // ── At-rules ─────────────────────────────────────────────────────

    #[test]
    fn media_body_is_scoped_prelude_is_not() {
        assert_eq!(
            scoped("@media only screen and (min-width: 400px) { div { color: red; } }"),
            "@media only screen and (min-width: 400px) { div.svelte-xyz { color: red; } }"
        );
    }

    #[test]
    fn vendor_prefixed_media_body_is_scoped() {
        assert_eq!(
            scoped("@-webkit-media only screen { div {} }"),
            "@-webkit-media only screen { div.svelte-xyz {} }"
        );
    }

    #[test]
    fn supports_and_layer_bodies_are_scoped() {
        assert_eq!(
            scoped("@supports (display: grid) { @layer base { p {} } }"),
            "@supports (display: grid) { @layer base { p.svelte-xyz {} } }"
        );
    }

    #[test]
    fn keyframes_are_untouched() {
        let input = "@keyframes spin { from { opacity: 0 } 50% { opacity: .5 } to { opacity: 1 } }";
        assert_eq!(scoped(input), input);
        let prefixed = "@-webkit-keyframes spin { from { a: b } }";
        assert_eq!(scoped(prefixed), prefixed);
    }

    #[test]
    fn unknown_at_rule_passes_through() {
        let input = "@font-feature-values Font One { @styleset { nice: 12; } } @page :first { margin: 1in; }";
        assert_eq!(scoped(input), input);
    }

    // ── Strategies ───────────────────────────────────────────────────

    #[test]
    fn attribute_strategy() {
        let scope_ = Scope::new("svelte-xyz").with_strategy(ScopeStrategy::Attribute);
        assert_eq!(scoped_with("div p {}", &scope_), "div[svelte-xyz] p[svelte-xyz] {}");
        assert_eq!(scope_.selector_text(), "[svelte-xyz]");
    }

    #[test]
    fn where_strategy() {
        let scope_ = Scope::new("s1").with_strategy(ScopeStrategy::Where);
        assert_eq!(scoped_with("div {}", &scope_), "div:where(.s1) {}");
    }

    #[test]
    fn scope_accessors() {
        let scope_ = Scope::new("abc");
        assert_eq!(scope_.token(), "abc");
        assert_eq!(scope_.strategy(), ScopeStrategy::Class);
        assert_eq!(scope_.selector_text(), ".abc");
        assert!(scope_.selector_tokens().iter().all(Token::is_synthetic));
    }

    // ── Locality ─────────────────────────────────────────────────────

    #[test]
    fn declarations_and_preludes_are_not_rewritten() {
        let input = "div { color: blue; } @media (min-width: 400px) and print { p > a { margin: 0 auto !important } }";
        let before = parse_css(input).unwrap_or_else(|e| panic!("{e}"));
        let mut after = before.clone();
        scope(&mut after, &Scope::new("svelte-xyz"));

        let values = |sheet: &Stylesheet| -> Vec<String> {
            sheet
                .declarations()
                .iter()
                .map(|d| format!("{}:{}", d.property_name(), join(&d.value)))
                .collect()
        };
        let preludes = |sheet: &Stylesheet| -> Vec<Vec<Token>> {
            sheet.at_rules().iter().map(|a| a.prelude.clone()).collect()
        };

        assert_eq!(values(&before), values(&after));
        assert_eq!(preludes(&before), preludes(&after));
        assert_ne!(
            before.rules()[0].selectors,
            after.rules()[0].selectors
        );
    }

    // ── Hash ─────────────────────────────────────────────────────────

    #[test]
    fn hash_is_stable_and_ignores_carriage_returns() {
        assert_eq!(scope_hash("div {}\n"), scope_hash("div {}\r\n"));
        assert_eq!(scope_hash(""), "45h");
        assert_eq!(scope_hash("div { color: red; }"), "bcpeq7");
        assert_ne!(scope_hash("a"), scope_hash("b"));
    }

    #[test]
    fn hash_is_base36() {
        let hash = scope_hash("div { color: red; }");
        assert!(hash.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u32::MAX), "1z141z3");
    }
}
