//! Pipeline entry point: style block in, scoped CSS (and map) out.
//!
//! [`transform`] runs the whole chain for one style block:
//! tokenize, parse, resolve the scope token, scope, print.

use tracing::debug;

use crate::css::parser::{parse, ParseError};
use crate::css::printer::{print, print_with_map};
use crate::css::scope::{scope, scope_hash, Scope, ScopeStrategy};
use crate::css::sourcemap::SourceMap;
use crate::css::tokenizer::tokenize;

// ---------------------------------------------------------------------------
// TransformOptions
// ---------------------------------------------------------------------------

/// Configuration for one [`transform`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Explicit scope token. When absent, one is derived from the source.
    pub scope: Option<String>,
    /// Prefix for derived scope tokens.
    pub hash_prefix: String,
    /// How the scope is written into selectors.
    pub strategy: ScopeStrategy,
    /// Produce a source map alongside the code.
    pub source_map: bool,
    /// Name of the original file, used as the map's source.
    pub filename: Option<String>,
    /// Name of the generated CSS file, written as the map's `file`.
    pub output_filename: Option<String>,
    /// Embed the original text in the map.
    pub include_source_content: bool,
    /// Development build. Accepted for driver parity; output is identical.
    pub dev: bool,
    /// Styles are injected at runtime. Accepted for driver parity; output is
    /// identical.
    pub inject_styles: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            scope: None,
            hash_prefix: "svelte-".to_string(),
            strategy: ScopeStrategy::Class,
            source_map: false,
            filename: None,
            output_filename: None,
            include_source_content: false,
            dev: false,
            inject_styles: false,
        }
    }
}

impl TransformOptions {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit scope token (builder).
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the prefix for derived scope tokens (builder).
    pub fn with_hash_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hash_prefix = prefix.into();
        self
    }

    /// Set the scoping strategy (builder).
    pub fn with_strategy(mut self, strategy: ScopeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable source maps for `filename` (builder).
    pub fn with_source_map(mut self, filename: impl Into<String>) -> Self {
        self.source_map = true;
        self.filename = Some(filename.into());
        self
    }

    /// Name the generated file in the map (builder).
    pub fn with_output_filename(mut self, filename: impl Into<String>) -> Self {
        self.output_filename = Some(filename.into());
        self
    }

    /// Embed the source text in the map (builder).
    pub fn with_source_content(mut self, include: bool) -> Self {
        self.include_source_content = include;
        self
    }

    /// Set the development flag (builder).
    pub fn with_dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    /// Set the style injection flag (builder).
    pub fn with_inject_styles(mut self, inject: bool) -> Self {
        self.inject_styles = inject;
        self
    }

    /// The scope to apply to `source`.
    pub fn resolve_scope(&self, source: &str) -> Scope {
        let token = match &self.scope {
            Some(token) => token.clone(),
            None => format!("{}{}", self.hash_prefix, scope_hash(source)),
        };
        Scope::new(token).with_strategy(self.strategy)
    }
}

// ---------------------------------------------------------------------------
// transform
// ---------------------------------------------------------------------------

/// The result of [`transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub code: String,
    pub map: Option<SourceMap>,
    /// The scope token that was applied.
    pub scope: String,
}

const DEFAULT_FILENAME: &str = "input.css";

/// Scope and print one style block.
pub fn transform(source: &str, options: &TransformOptions) -> Result<Transformed, ParseError> {
    let scope_ = options.resolve_scope(source);
    debug!(
        scope = scope_.token(),
        bytes = source.len(),
        dev = options.dev,
        inject_styles = options.inject_styles,
        "transforming style block"
    );

    let mut sheet = parse(tokenize(source))?;
    scope(&mut sheet, &scope_);

    let (code, map) = if options.source_map {
        let filename = options.filename.as_deref().unwrap_or(DEFAULT_FILENAME);
        let mut map = SourceMap::new(filename);
        if let Some(output) = &options.output_filename {
            map = map.with_file(output.as_str());
        }
        if options.include_source_content {
            map = map.with_source_content(source);
        }
        let (code, map) = print_with_map(&sheet, source, map);
        (code, Some(map))
    } else {
        (print(&sheet), None)
    };

    debug!(bytes = code.len(), mapped = map.is_some(), "style block printed");
    Ok(Transformed {
        code,
        map,
        scope: scope_.token().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_options() {
        let options = TransformOptions::new();
        assert_eq!(options.scope, None);
        assert_eq!(options.hash_prefix, "svelte-");
        assert_eq!(options.strategy, ScopeStrategy::Class);
        assert!(!options.source_map);
        assert!(!options.dev);
    }

    #[test]
    fn builder_chain() {
        let options = TransformOptions::new()
            .with_scope("s-1")
            .with_strategy(ScopeStrategy::Attribute)
            .with_source_map("App.svelte")
            .with_output_filename("App.css")
            .with_source_content(true)
            .with_dev(true)
            .with_inject_styles(true);
        assert_eq!(options.scope.as_deref(), Some("s-1"));
        assert_eq!(options.strategy, ScopeStrategy::Attribute);
        assert!(options.source_map);
        assert_eq!(options.filename.as_deref(), Some("App.svelte"));
        assert_eq!(options.output_filename.as_deref(), Some("App.css"));
        assert!(options.include_source_content);
        assert!(options.dev && options.inject_styles);
    }

    #[test]
    fn explicit_scope_wins() {
        let scope_ = TransformOptions::new().with_scope("svelte-xyz").resolve_scope("div {}");
        assert_eq!(scope_.token(), "svelte-xyz");
    }

    #[test]
    fn derived_scope_uses_prefix_and_hash() {
        let source = "div { color: red; }";
        let scope_ = TransformOptions::new()
            .with_hash_prefix("s-")
            .resolve_scope(source);
        assert_eq!(scope_.token(), format!("s-{}", scope_hash(source)));
    }

    #[test]
    fn transform_scopes_and_prints() {
        let out = transform("div { color: red; }", &TransformOptions::new().with_scope("svelte-xyz"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out.code, "div.svelte-xyz { color: red; }");
        assert_eq!(out.scope, "svelte-xyz");
        assert!(out.map.is_none());
    }

    #[test]
    fn transform_with_map() {
        let options = TransformOptions::new()
            .with_scope("s")
            .with_source_map("App.svelte")
            .with_source_content(true);
        let out = transform("a{}", &options).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out.code, "a.s{}");
        let map = out.map.expect("map requested");
        assert_eq!(map.source, "App.svelte");
        assert_eq!(map.source_content.as_deref(), Some("a{}"));
        assert_eq!(map.encoded_mappings(), "AAAA,GAAC,CAAC");
        assert_eq!(map.file, None);
    }

    #[test]
    fn transform_names_output_file() {
        let options = TransformOptions::new()
            .with_scope("s")
            .with_source_map("App.svelte")
            .with_output_filename("App.css");
        let out = transform("a{}", &options).unwrap_or_else(|e| panic!("{e}"));
        let map = out.map.expect("map requested");
        assert_eq!(map.file.as_deref(), Some("App.css"));
        assert_eq!(
            map.to_json().unwrap_or_else(|e| panic!("{e}")),
            r#"{"version":3,"file":"App.css","sources":["App.svelte"],"names":[],"mappings":"AAAA,GAAC,CAAC"}"#
        );
    }

    #[test]
    fn output_filename_without_map_is_ignored() {
        let options = TransformOptions::new()
            .with_scope("s")
            .with_output_filename("App.css");
        let out = transform("a{}", &options).unwrap_or_else(|e| panic!("{e}"));
        assert!(out.map.is_none());
    }

    #[test]
    fn transform_reports_malformed_input() {
        let err = transform("div {", &TransformOptions::new()).unwrap_err();
        assert_eq!(err.to_string(), "malformed stylesheet at 1:5: block is never closed");
    }
}
