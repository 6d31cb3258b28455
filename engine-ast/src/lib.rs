//! # engine-ast
//!
//! The AST Facade (spec §4.C): given `(content, path)`, decide the
//! language, dispatch to a registered parser plugin, and memoize the
//! `ParseResult` in [`engine_cache::ArtifactCache`] under the AST
//! namespace.
//!
//! Concrete per-language parsers are a collaborator, not core scope
//! (spec §1 non-goals): this crate owns the plugin contract and
//! registry, plus two reference plugins (tree-sitter-backed Rust, and
//! a dependency-free plain-text fallback) that exist to prove the
//! interface end-to-end.

pub mod errors;
pub mod facade;
pub mod plugin;
pub mod plugins;
pub mod types;

pub use errors::AstError;
pub use facade::AstFacade;
pub use plugin::{Capabilities, LanguageParserPlugin};
pub use types::{ImportInfo, ParseDiagnostic, ParseResult, Symbol, SymbolKind};
