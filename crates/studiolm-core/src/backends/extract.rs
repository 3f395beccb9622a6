//! Free-text tool-call extraction
//!
//! Backends without native tool calling are instructed to answer with a
//! single JSON object `{"tool": ..., "args": {...}}`. Models rarely obey
//! perfectly: they wrap the object in prose, fence it in a code block, or
//! put braces inside string values. Extraction tries, in order:
//!
//! 1. a fenced code block tagged `json` (or untagged)
//! 2. a quote-aware, brace-balanced scan for the first complete JSON
//!    object starting at the first `{`
//! 3. the entire trimmed response
//!
//! A candidate qualifies only if it parses to an object with a non-empty
//! string `tool` field; the first qualifying candidate wins. No qualifying
//! candidate means the text is a plain answer, not a tool call.

use serde_json::Value;

/// A tool call extracted from free text
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedToolCall {
    /// Name of the requested tool
    pub tool: String,
    /// Arguments object (empty object when absent)
    pub args: Value,
}

/// Extract a tool call from a raw model response, if one is present
pub fn extract_tool_call(text: &str) -> Option<ExtractedToolCall> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(candidate) = fenced_block(trimmed) {
        if let Some(call) = qualify(candidate) {
            return Some(call);
        }
    }
    if let Some(candidate) = balanced_object(trimmed) {
        if let Some(call) = qualify(candidate) {
            return Some(call);
        }
    }
    qualify(trimmed)
}

/// The body of the first ```-fenced block tagged `json` or untagged
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let newline = after_fence.find('\n')?;
    let tag = after_fence[..newline].trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after_fence[newline + 1..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// The first complete JSON object, found by balancing braces while
/// tracking string-literal and escape state so braces inside quoted
/// strings do not affect depth.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a candidate and accept it only if it is an object with a
/// non-empty string `tool` field
fn qualify(candidate: &str) -> Option<ExtractedToolCall> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let obj = value.as_object()?;
    let tool = obj.get("tool")?.as_str()?;
    if tool.is_empty() {
        return None;
    }
    let args = obj
        .get("args")
        .cloned()
        .unwrap_or(Value::Object(Default::default()));
    Some(ExtractedToolCall {
        tool: tool.to_string(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_json() {
        let call = extract_tool_call(r#"{"tool": "list_workbooks", "args": {}}"#).unwrap();
        assert_eq!(call.tool, "list_workbooks");
        assert_eq!(call.args, json!({}));
    }

    #[test]
    fn test_brace_inside_string_does_not_break_balancing() {
        let text = r#"blah blah {"tool": "foo", "args": {"a": "}"}} trailing text"#;
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool, "foo");
        assert_eq!(call.args.get("a").unwrap(), "}");
    }

    #[test]
    fn test_plain_prose_is_not_a_tool_call() {
        assert_eq!(extract_tool_call("The main gear MOS is 0.24."), None);
        assert_eq!(extract_tool_call(""), None);
    }

    #[test]
    fn test_fenced_block_preferred() {
        let text = "Here you go:\n```json\n{\"tool\": \"search_documents\", \"args\": {\"query\": \"gear\"}}\n```\nHope this helps!";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool, "search_documents");
        assert_eq!(call.args.get("query").unwrap(), "gear");
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"tool\": \"read_document\", \"args\": {\"path\": \"a.md\"}}\n```";
        assert_eq!(extract_tool_call(text).unwrap().tool, "read_document");
    }

    #[test]
    fn test_non_json_fence_falls_through_to_scan() {
        let text = "```python\nprint('hi')\n```\n{\"tool\": \"echo\", \"args\": {}}";
        assert_eq!(extract_tool_call(text).unwrap().tool, "echo");
    }

    #[test]
    fn test_text_before_and_after_object() {
        let text = "Based on the documents, I need to look: {\"tool\": \"read_document\", \"args\": {\"workbook_id\": \"wbA\", \"path\": \"notes.md\"}}\n\nLet me check.";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool, "read_document");
        assert_eq!(call.args.get("workbook_id").unwrap(), "wbA");
    }

    #[test]
    fn test_multiline_object() {
        let text = "Here's the call:\n{\n  \"tool\": \"list_documents\",\n  \"args\": {\n    \"workbook_id\": \"wbA\"\n  }\n}\n";
        assert_eq!(extract_tool_call(text).unwrap().tool, "list_documents");
    }

    #[test]
    fn test_object_without_tool_field_is_prose() {
        assert_eq!(
            extract_tool_call(r#"{"value": 0.24, "label": "Main Gear MOS"}"#),
            None
        );
    }

    #[test]
    fn test_empty_tool_name_rejected() {
        assert_eq!(extract_tool_call(r#"{"tool": "", "args": {}}"#), None);
    }

    #[test]
    fn test_missing_args_defaults_to_empty_object() {
        let call = extract_tool_call(r#"{"tool": "list_workbooks"}"#).unwrap();
        assert_eq!(call.args, json!({}));
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let text = r#"{"tool": "echo", "args": {"msg": "she said \"}\" loudly"}}"#;
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.args.get("msg").unwrap(), "she said \"}\" loudly");
    }

    #[test]
    fn test_unterminated_object_is_prose() {
        assert_eq!(extract_tool_call(r#"{"tool": "echo", "args": {"#), None);
    }
}
