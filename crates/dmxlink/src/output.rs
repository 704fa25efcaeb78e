//! JSON output for command results.

use serde::Serialize;

/// Output settings from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct OutputControls {
    pub pretty: bool,
}

impl OutputControls {
    /// Render `data` as one JSON document.
    pub fn emit<T: Serialize>(&self, data: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        rendered.unwrap_or_else(|_| "null".to_string())
    }

    /// Print data to stdout, one document per line unless pretty-printing.
    pub fn print<T: Serialize>(&self, data: &T) {
        println!("{}", self.emit(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_is_single_line() {
        let out = OutputControls::default();
        let line = out.emit(&json!({ "universe": 1, "data": [1, 2] }));
        assert!(!line.contains('\n'));
        assert!(line.contains("\"universe\":1"));
    }

    #[test]
    fn test_pretty_is_indented() {
        let out = OutputControls { pretty: true };
        assert!(out.emit(&json!({ "state": "running" })).contains('\n'));
    }
}
