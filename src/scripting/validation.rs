//! Static checks run before a script is compiled
//!
//! The denylist is a plain pattern match over the source. It is not sound on
//! its own; the runtime guards installed by the sandbox back it up.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{PulseScriptError, Result};

struct Denied {
    pattern: Regex,
    message: &'static str,
}

fn denied(pattern: &str, message: &'static str) -> Denied {
    Denied {
        pattern: Regex::new(pattern).expect("denylist pattern is valid"),
        message,
    }
}

static DENYLIST: Lazy<Vec<Denied>> = Lazy::new(|| {
    vec![
        denied(r"(?:^|[^\w.$])eval\s*\(", "eval() is not allowed in scripts"),
        denied(
            r"(?:^|[^\w.$])new\s+Function\s*\(",
            "Function constructor is not allowed in scripts",
        ),
        denied(r"(?:^|[^\w.$])require\s*\(", "require() is not allowed in scripts"),
        denied(r"(?:^|[^\w.$])import\s*\(", "import() is not allowed in scripts"),
        denied(r"(?:^|[^\w.$])process(?:$|[^\w])", "process is not allowed in scripts"),
        denied(r"(?:^|[^\w.$])global(?:$|[^\w])", "global is not allowed in scripts"),
        denied(r"(?:^|[^\w.$])window\s*\.", "window object is not allowed in scripts"),
        denied(r"(?:^|[^\w.$])document\s*\.", "document object is not allowed in scripts"),
        denied(r"(?:^|[^\w.$])navigator\s*\.", "navigator object is not allowed in scripts"),
        denied(
            r"(?:^|[^\w.$])XMLHttpRequest(?:$|[^\w])",
            "XMLHttpRequest is not allowed in scripts, use pm.sendRequest instead",
        ),
        denied(
            r"(?:^|[^\w.$])fetch\s*\(",
            "fetch() is not allowed in scripts, use pm.sendRequest instead",
        ),
    ]
});

/// Reject oversized scripts and scripts naming a denied capability
pub fn check_source(source: &str, max_bytes: usize) -> Result<()> {
    if source.len() > max_bytes {
        return Err(PulseScriptError::Forbidden(format!(
            "Script is {} bytes, larger than the {} byte limit",
            source.len(),
            max_bytes
        )));
    }

    match violation(source) {
        Some(message) => Err(PulseScriptError::Forbidden(message.to_string())),
        None => Ok(()),
    }
}

/// The denylist message that `source` would trigger, if any
fn violation(source: &str) -> Option<&'static str> {
    DENYLIST
        .iter()
        .find(|d| d.pattern.is_match(source))
        .map(|d| d.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_calls() {
        assert_eq!(violation("eval('1+1')"), Some("eval() is not allowed in scripts"));
        assert_eq!(
            violation("const f = new Function('return 1')"),
            Some("Function constructor is not allowed in scripts")
        );
        assert_eq!(violation("require('fs')"), Some("require() is not allowed in scripts"));
        assert_eq!(violation("await import('x')"), Some("import() is not allowed in scripts"));
        assert_eq!(
            violation("fetch('https://x')"),
            Some("fetch() is not allowed in scripts, use pm.sendRequest instead")
        );
    }

    #[test]
    fn test_denied_globals() {
        assert_eq!(violation("process.exit(1)"), Some("process is not allowed in scripts"));
        assert_eq!(violation("const g = global;"), Some("global is not allowed in scripts"));
        assert_eq!(violation("window.location"), Some("window object is not allowed in scripts"));
        assert_eq!(violation("document.cookie"), Some("document object is not allowed in scripts"));
        assert_eq!(violation("navigator.userAgent"), Some("navigator object is not allowed in scripts"));
        assert!(violation("new XMLHttpRequest()").is_some());
    }

    #[test]
    fn test_lookalikes_allowed() {
        assert_eq!(violation("const evaluate = 1;"), None);
        assert_eq!(violation("obj.eval(1)"), None);
        assert_eq!(violation("const processed = true;"), None);
        assert_eq!(violation("const globals = pm.globals;"), None);
        assert_eq!(violation("myfetch(1)"), None);
    }

    #[test]
    fn test_size_limit() {
        let source = "x".repeat(11);
        assert!(matches!(check_source(&source, 10), Err(PulseScriptError::Forbidden(_))));
        assert!(check_source("pm.info('ok')", 10_000).is_ok());
    }
}
