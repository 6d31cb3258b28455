//! Reference tree-sitter-backed plugin for `.rs` files. Demonstrates a
//! real integration of the plugin contract; not meant to be the only
//! (or most complete) Rust plugin a production host would register.

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::plugin::{Capabilities, LanguageParserPlugin};
use crate::types::{ImportInfo, ParseDiagnostic, ParseResult, Symbol, SymbolKind};

pub struct RustPlugin;

impl RustPlugin {
    pub fn new() -> Self {
        Self
    }

    fn make_parser() -> Option<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .ok()?;
        Some(parser)
    }

    fn walk(node: Node, source: &[u8], symbols: &mut Vec<Symbol>, imports: &mut Vec<ImportInfo>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "function_item" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        symbols.push(Symbol {
                            name: text_of(name, source),
                            kind: SymbolKind::Function,
                            line: child.start_position().row + 1,
                        });
                    }
                }
                "struct_item" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        symbols.push(Symbol {
                            name: text_of(name, source),
                            kind: SymbolKind::Struct,
                            line: child.start_position().row + 1,
                        });
                    }
                }
                "use_declaration" => {
                    imports.push(ImportInfo {
                        module: text_of(child, source).trim_end_matches(';').to_string(),
                        line: child.start_position().row + 1,
                    });
                }
                _ => {}
            }
            Self::walk(child, source, symbols, imports);
        }
    }
}

fn text_of(node: Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

impl LanguageParserPlugin for RustPlugin {
    fn extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { symbols: true, imports: true, exports: false }
    }

    fn supports(&self, path: &Path, _content: Option<&[u8]>) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("rs")
    }

    fn parse(&self, content: &[u8], _path: &Path) -> ParseResult {
        let mut result = ParseResult {
            language: "rust".to_string(),
            ..Default::default()
        };

        let Some(mut parser) = Self::make_parser() else {
            result.errors.push(ParseDiagnostic {
                message: "failed to initialize tree-sitter-rust grammar".to_string(),
                line: None,
            });
            return result;
        };

        let Some(tree) = parser.parse(content, None) else {
            result.errors.push(ParseDiagnostic {
                message: "tree-sitter failed to produce a parse tree".to_string(),
                line: None,
            });
            return result;
        };

        let root = tree.root_node();
        if root.has_error() {
            result.errors.push(ParseDiagnostic {
                message: "source contains syntax errors; partial results returned".to_string(),
                line: None,
            });
        }

        Self::walk(root, content, &mut result.symbols, &mut result.imports);
        result
    }

    fn extract_imports(&self, _path: &Path, content: &[u8]) -> Option<Vec<ImportInfo>> {
        let mut parser = Self::make_parser()?;
        let tree = parser.parse(content, None)?;
        let mut symbols = Vec::new();
        let mut imports = Vec::new();
        Self::walk(tree.root_node(), content, &mut symbols, &mut imports);
        Some(imports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_and_struct_symbols() {
        let plugin = RustPlugin::new();
        let src = b"struct Foo;\nfn bar() {}\n";
        let result = plugin.parse(src, Path::new("lib.rs"));
        assert!(result.errors.is_empty());
        assert!(result.symbols.iter().any(|s| s.name == "Foo" && s.kind == SymbolKind::Struct));
        assert!(result.symbols.iter().any(|s| s.name == "bar" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn extracts_use_imports() {
        let plugin = RustPlugin::new();
        let src = b"use std::collections::HashMap;\nfn main() {}\n";
        let result = plugin.parse(src, Path::new("main.rs"));
        assert_eq!(result.imports.len(), 1);
        assert!(result.imports[0].module.contains("HashMap"));
    }

    #[test]
    fn malformed_source_reports_diagnostic_not_panic() {
        let plugin = RustPlugin::new();
        let src = b"fn this is not { valid rust <<<";
        let result = plugin.parse(src, Path::new("broken.rs"));
        assert!(!result.errors.is_empty());
    }
}
