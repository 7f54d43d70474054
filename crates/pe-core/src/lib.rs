//! Shared primitives used across the page enhancer crates.

use core::fmt;

/// Result alias used across the workspace.
pub type EnhancerResult<T> = Result<T, EnhancerError>;

/// Workspace error: a dotted machine-readable code plus a human message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancerError {
    pub code: &'static str,
    pub message: String,
}

impl EnhancerError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns true when the error code sits under `prefix` (e.g. `"dom"`).
    pub fn is_in(&self, prefix: &str) -> bool {
        self.code
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}

impl fmt::Display for EnhancerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for EnhancerError {}

#[cfg(test)]
mod tests {
    use super::EnhancerError;

    #[test]
    fn displays_code_and_message() {
        let error = EnhancerError::new("dom.unknown_node", "node 7 does not exist");
        assert_eq!(error.to_string(), "dom.unknown_node: node 7 does not exist");
    }

    #[test]
    fn matches_code_namespaces() {
        let error = EnhancerError::new("scenario.unknown_target", "no match");
        assert!(error.is_in("scenario"));
        assert!(!error.is_in("scen"));
        assert!(!error.is_in("dom"));
    }
}
