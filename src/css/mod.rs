//! CSS engine: tokenizer, parser, scoper, printer, source maps.

pub mod location;
pub mod model;
pub mod parser;
pub mod printer;
pub mod scope;
pub mod sourcemap;
pub mod tokenizer;
