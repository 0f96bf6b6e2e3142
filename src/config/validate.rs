//! Raw config file checks with unknown field detection.

use serde_json::Value;
use std::collections::HashSet;

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &[
    "retry",
    "tools",
    "profile",
    "project",
    "packages",
    "patch",
    "dev_server",
    "http",
    "logging",
];

/// Known fields per section.
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    ("retry", &["max_attempts", "delay_secs", "backoff"]),
    ("tools", &["install_noir", "solc_version", "solc_sha256", "skip"]),
    ("profile", &["update_rc", "rc_file", "bin_dirs"]),
    (
        "project",
        &[
            "dir",
            "marker",
            "template_repo",
            "template_ref",
            "normalize_permissions",
        ],
    ),
    ("packages", &["enabled", "manager", "install_args"]),
    ("patch", &["enabled", "file", "find", "replace"]),
    ("dev_server", &["enabled", "dir", "command"]),
    ("http", &["timeout_secs"]),
    ("logging", &["format", "level", "file"]),
];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

fn unknown_keys(
    obj: &serde_json::Map<String, Value>,
    known: &[&str],
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let known_set: HashSet<&str> = known.iter().copied().collect();
    let mut found = false;
    for key in obj.keys() {
        if known_set.contains(key.as_str()) {
            continue;
        }
        found = true;
        let message = match suggest_field(key, known) {
            Some(hint) => format!("Unknown field '{}', {}", key, hint),
            None => format!("Unknown field '{}'", key),
        };
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            path: if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            },
            message,
        });
    }
    found
}

/// Validate a raw JSON config value against known field names.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match raw.as_object() {
        Some(o) => o,
        None => {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Error,
                path: String::new(),
                message: "Config must be a JSON object".to_string(),
            });
            return diagnostics;
        }
    };

    diagnostics.push(Diagnostic {
        level: DiagnosticLevel::Ok,
        path: String::new(),
        message: "Valid JSON".to_string(),
    });

    let mut has_unknown = unknown_keys(obj, KNOWN_TOP_LEVEL, "", &mut diagnostics);
    for (section, known) in KNOWN_SECTIONS {
        if let Some(inner) = obj.get(*section).and_then(|v| v.as_object()) {
            has_unknown |= unknown_keys(inner, known, section, &mut diagnostics);
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Ok,
            path: String::new(),
            message: "All fields recognized".to_string(),
        });
    }

    // Behavioural warnings
    if let Some(delay) = obj
        .get("retry")
        .and_then(|r| r.get("delay_secs"))
        .and_then(|v| v.as_u64())
    {
        if delay > 300 {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Warn,
                path: "retry.delay_secs".to_string(),
                message: format!("{}s between attempts is unusually long", delay),
            });
        }
    }
    if obj
        .get("project")
        .and_then(|p| p.get("template_repo"))
        .and_then(|v| v.as_str())
        .is_some_and(|url| url.starts_with("http://"))
    {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warn,
            path: "project.template_repo".to_string(),
            message: "Template is cloned over plain HTTP".to_string(),
        });
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("retry", "retry"), 0);
        assert_eq!(levenshtein("retry", "rety"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert!(levenshtein("patch", "logging") > 3);
    }

    #[test]
    fn test_suggest_field_match() {
        let result = suggest_field("projct", KNOWN_TOP_LEVEL);
        assert!(result.unwrap().contains("project"));
    }

    #[test]
    fn test_suggest_field_no_match() {
        assert!(suggest_field("xyzabcdef", KNOWN_TOP_LEVEL).is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let raw = json!({
            "retry": {"max_attempts": 4},
            "tools": {"install_noir": true}
        });
        let diags = validate_config(&raw);
        assert!(diags.iter().all(|d| d.level != DiagnosticLevel::Error));
        assert!(diags.iter().any(|d| d.message == "All fields recognized"));
    }

    #[test]
    fn test_validate_unknown_nested_field() {
        let raw = json!({"retry": {"max_attempt": 4}});
        let diags = validate_config(&raw);
        let err = diags
            .iter()
            .find(|d| d.level == DiagnosticLevel::Error)
            .unwrap();
        assert_eq!(err.path, "retry.max_attempt");
        assert!(err.message.contains("max_attempts"));
    }

    #[test]
    fn test_validate_not_an_object() {
        let diags = validate_config(&json!([1, 2]));
        assert!(diags
            .iter()
            .any(|d| d.level == DiagnosticLevel::Error && d.message.contains("JSON object")));
    }

    #[test]
    fn test_validate_plain_http_template_warns() {
        let raw = json!({"project": {"template_repo": "http://example.com/repo.git"}});
        let diags = validate_config(&raw);
        assert!(diags.iter().any(|d| d.level == DiagnosticLevel::Warn));
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            level: DiagnosticLevel::Warn,
            path: "retry.delay_secs".to_string(),
            message: "long".to_string(),
        };
        assert_eq!(d.to_string(), "[WARN] retry.delay_secs: long");
    }
}
