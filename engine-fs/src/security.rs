//! Allow/deny path policy (spec §6 "Security surface").
//!
//! A path is accepted iff it canonicalises within the workspace, is not
//! within any blocked prefix, and — if `allowed_paths` is non-empty —
//! is within one allowed prefix.

use std::path::Path;

use engine_core::config::SecurityOptions;

#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    allowed_prefixes: Vec<String>,
    blocked_prefixes: Vec<String>,
}

impl SecurityPolicy {
    pub fn from_options(options: &SecurityOptions) -> Self {
        Self {
            allowed_prefixes: options.allowed_paths.clone(),
            blocked_prefixes: options.blocked_paths.clone(),
        }
    }

    pub fn is_allowed(&self, resolved_abs_path: &Path) -> bool {
        let path_str = resolved_abs_path.to_string_lossy();

        if self
            .blocked_prefixes
            .iter()
            .any(|p| path_str.starts_with(p.as_str()))
        {
            return false;
        }

        if self.allowed_prefixes.is_empty() {
            return true;
        }

        self.allowed_prefixes
            .iter()
            .any(|p| path_str.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_allows_everything_not_blocked() {
        let policy = SecurityPolicy::from_options(&SecurityOptions {
            allowed_paths: vec![],
            blocked_paths: vec!["/workspace/secrets".into()],
            sandbox: None,
        });
        assert!(policy.is_allowed(Path::new("/workspace/src/lib.rs")));
        assert!(!policy.is_allowed(Path::new("/workspace/secrets/key.pem")));
    }

    #[test]
    fn nonempty_allowlist_is_a_whitelist() {
        let policy = SecurityPolicy::from_options(&SecurityOptions {
            allowed_paths: vec!["/workspace/src".into()],
            blocked_paths: vec![],
            sandbox: None,
        });
        assert!(policy.is_allowed(Path::new("/workspace/src/lib.rs")));
        assert!(!policy.is_allowed(Path::new("/workspace/docs/readme.md")));
    }

    #[test]
    fn blocked_wins_over_allowed() {
        let policy = SecurityPolicy::from_options(&SecurityOptions {
            allowed_paths: vec!["/workspace".into()],
            blocked_paths: vec!["/workspace/src/secret.rs".into()],
            sandbox: None,
        });
        assert!(!policy.is_allowed(Path::new("/workspace/src/secret.rs")));
    }
}
