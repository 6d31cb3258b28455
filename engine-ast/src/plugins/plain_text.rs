//! Universal fallback plugin. Always `supports`, never panics, and
//! reports a single structural diagnostic instead of failing the
//! request when no language-specific plugin claims the file.

use std::path::Path;

use crate::plugin::{Capabilities, LanguageParserPlugin};
use crate::types::{ParseDiagnostic, ParseResult};

pub struct PlainTextPlugin;

impl LanguageParserPlugin for PlainTextPlugin {
    fn extensions(&self) -> &[&str] {
        &[]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn supports(&self, _path: &Path, _content: Option<&[u8]>) -> bool {
        true
    }

    fn parse(&self, content: &[u8], _path: &Path) -> ParseResult {
        let mut result = ParseResult {
            language: "text".to_string(),
            ..Default::default()
        };
        if std::str::from_utf8(content).is_err() {
            result.errors.push(ParseDiagnostic {
                message: "content is not valid UTF-8; treated as opaque bytes".to_string(),
                line: None,
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_everything() {
        let plugin = PlainTextPlugin;
        assert!(plugin.supports(Path::new("whatever.xyz"), None));
    }

    #[test]
    fn never_panics_on_binary_garbage() {
        let plugin = PlainTextPlugin;
        let garbage = vec![0xff, 0xfe, 0x00, 0x01, 0x02];
        let result = plugin.parse(&garbage, Path::new("blob.bin"));
        assert_eq!(result.errors.len(), 1);
    }
}
