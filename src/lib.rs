//! # stylescope
//!
//! A whitespace-preserving CSS pipeline for component style blocks.
//!
//! stylescope lexes a style block into tokens that keep every whitespace run and
//! comment, builds a concrete syntax tree, rewrites selectors so they only match
//! the owning component, and prints the tree back out. Everything the scoper did
//! not touch prints byte-for-byte as it was written, so `@media only screen`
//! stays `@media only screen`.
//!
//! ## Core Systems
//!
//! - **[`css::tokenizer`]** - Logos-based lexer that keeps trivia as tokens
//! - **[`css::parser`]** - Recursive-descent parser into [`css::model`] nodes
//! - **[`css::scope`]** - Selector scoping and the scope hash
//! - **[`css::printer`]** - Faithful printer with optional source maps
//! - **[`css::sourcemap`]** - Source Map v3 output
//! - **[`transform`]** - One call for the whole pipeline
//!
//! ```
//! use stylescope::{transform, TransformOptions};
//!
//! let options = TransformOptions::new().with_scope("svelte-xyz");
//! let out = transform("@media only screen { div { color: red; } }", &options).unwrap();
//! assert_eq!(out.code, "@media only screen { div.svelte-xyz { color: red; } }");
//! ```

pub mod css;
pub mod transform;

pub use css::parser::{ParseError, MalformedReason};
pub use css::scope::{Scope, ScopeStrategy};
pub use transform::{transform, TransformOptions, Transformed};
