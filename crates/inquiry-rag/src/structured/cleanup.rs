//! Named cleanup passes for extracting JSON from free-form model text
//!
//! Passes are applied left to right, each to the output of the previous one,
//! and parsing stops at the first text that is valid JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").expect("Invalid regex"));

/// One transformation of candidate JSON text
#[derive(Clone, Copy)]
pub struct CleanupPass {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for CleanupPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Default pass order, least to most aggressive
pub const DEFAULT_PASSES: &[CleanupPass] = &[
    CleanupPass {
        name: "extract_fence",
        apply: extract_fence,
    },
    CleanupPass {
        name: "trim_to_json_bounds",
        apply: trim_to_json_bounds,
    },
    CleanupPass {
        name: "strip_comments",
        apply: strip_comments,
    },
    CleanupPass {
        name: "strip_trailing_commas",
        apply: strip_trailing_commas,
    },
    CleanupPass {
        name: "drop_comment_lines",
        apply: drop_comment_lines,
    },
];

/// Parsed JSON plus the passes that were needed to get there
#[derive(Debug, Clone)]
pub struct Extracted {
    pub value: Value,
    pub passes: Vec<&'static str>,
}

/// Extract a JSON value from model text
pub fn extract_json(text: &str) -> Result<Extracted, String> {
    extract_json_with(text, DEFAULT_PASSES)
}

/// Extract with an explicit pass list
pub fn extract_json_with(text: &str, passes: &[CleanupPass]) -> Result<Extracted, String> {
    let mut current = text.trim().to_string();
    let mut last_error = match serde_json::from_str::<Value>(&current) {
        Ok(value) => {
            return Ok(Extracted {
                value,
                passes: Vec::new(),
            })
        }
        Err(e) => e.to_string(),
    };

    let mut applied = Vec::new();
    for pass in passes {
        let next = (pass.apply)(&current);
        if next == current {
            continue;
        }
        current = next;
        applied.push(pass.name);

        match serde_json::from_str::<Value>(&current) {
            Ok(value) => {
                return Ok(Extracted {
                    value,
                    passes: applied,
                })
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(format!("no valid JSON found: {}", last_error))
}

/// Take the body of the first markdown code fence
pub fn extract_fence(text: &str) -> String {
    FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Cut leading prose before the first `{`/`[` and trailing prose after the
/// last `}`/`]`
pub fn trim_to_json_bounds(text: &str) -> String {
    let start = text.find(|c: char| c == '{' || c == '[');
    let end = text.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(s), Some(e)) if s < e => text[s..=e].to_string(),
        _ => text.to_string(),
    }
}

/// Remove `//` and `/* */` comments that sit outside string literals
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Remove commas directly before a closing `]` or `}` outside strings
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(c);
    }

    out
}

/// Drop whole lines that look like comments (`//` or `#`)
pub fn drop_comment_lines(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let t = line.trim_start();
            !t.starts_with("//") && !t.starts_with('#')
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_needs_no_passes() {
        let extracted = extract_json(r#"{"answer": "ok"}"#).unwrap();
        assert_eq!(extracted.value, json!({"answer": "ok"}));
        assert!(extracted.passes.is_empty());
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let text = "Here you go:\n```json\n{\"answer\": \"ok\"}\n```\nHope that helps.";
        let extracted = extract_json(text).unwrap();
        assert_eq!(extracted.value, json!({"answer": "ok"}));
        assert_eq!(extracted.passes, vec!["extract_fence"]);
    }

    #[test]
    fn test_comments_and_trailing_commas() {
        let text = r#"```
{
  "url": "http://example.com/a", // the link
  /* block */ "items": [1, 2, 3,],
}
```"#;
        let extracted = extract_json(text).unwrap();
        assert_eq!(
            extracted.value,
            json!({"url": "http://example.com/a", "items": [1, 2, 3]})
        );
        assert!(extracted.passes.contains(&"strip_comments"));
        assert!(extracted.passes.contains(&"strip_trailing_commas"));
    }

    #[test]
    fn test_trim_to_bounds() {
        assert_eq!(
            trim_to_json_bounds("Sure! [1, 2] done"),
            "[1, 2]".to_string()
        );
        assert_eq!(trim_to_json_bounds("no json"), "no json".to_string());
    }

    #[test]
    fn test_strings_are_untouched() {
        let text = r#"{"a": "x, ]", "b": "// not a comment"}"#;
        assert_eq!(strip_trailing_commas(text), text);
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn test_drop_comment_lines() {
        assert_eq!(drop_comment_lines("# note\n{}\n// x"), "{}");
    }

    #[test]
    fn test_garbage_fails() {
        assert!(extract_json("I cannot answer that.").is_err());
    }
}
