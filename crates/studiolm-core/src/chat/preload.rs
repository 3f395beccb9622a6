//! Explicit-reference scanning
//!
//! Users can name a document directly in chat (`workbook://wbA/notes.md`).
//! The orchestrator loads such references up front instead of hoping the
//! backend decides to call a lookup tool, which makes explicit grounding
//! deterministic.

/// A `workbook://<id>/<path>` reference found in a user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitReference {
    pub workbook_id: String,
    pub path: String,
}

impl ExplicitReference {
    /// The canonical URI form of this reference
    pub fn uri(&self) -> String {
        format!("workbook://{}/{}", self.workbook_id, self.path)
    }
}

const SCHEME: &str = "workbook://";

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Scan free text for explicit workbook references, deduplicated in
/// first-occurrence order.
pub fn scan_references(text: &str) -> Vec<ExplicitReference> {
    let mut refs: Vec<ExplicitReference> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(SCHEME) {
        let after = &rest[start + SCHEME.len()..];

        let id_end = after.find(|c: char| !is_id_char(c)).unwrap_or(after.len());
        let workbook_id = &after[..id_end];
        let mut consumed = id_end;

        if !workbook_id.is_empty() && after[id_end..].starts_with('/') {
            let path_text = &after[id_end + 1..];
            let path_end = path_text
                .find(|c: char| c.is_whitespace())
                .unwrap_or(path_text.len());
            // trailing sentence punctuation belongs to the prose, not the path
            let path = path_text[..path_end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"']);
            consumed = id_end + 1 + path_end;

            if !path.is_empty() {
                let reference = ExplicitReference {
                    workbook_id: workbook_id.to_string(),
                    path: path.to_string(),
                };
                if !refs.contains(&reference) {
                    refs.push(reference);
                }
            }
        }

        rest = &rest[start + SCHEME.len() + consumed..];
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_reference() {
        let refs = scan_references("Please summarize workbook://wbA/notes.md for me");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].workbook_id, "wbA");
        assert_eq!(refs[0].path, "notes.md");
        assert_eq!(refs[0].uri(), "workbook://wbA/notes.md");
    }

    #[test]
    fn test_trailing_punctuation_stripped() {
        let refs = scan_references("Look at workbook://wbA/reports/q3.md.");
        assert_eq!(refs[0].path, "reports/q3.md");

        let refs = scan_references("(see workbook://wbA/notes.md)");
        assert_eq!(refs[0].path, "notes.md");
    }

    #[test]
    fn test_multiple_references_deduplicated() {
        let refs = scan_references(
            "Compare workbook://wbA/a.md with workbook://wbB/b.md and workbook://wbA/a.md again",
        );
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].workbook_id, "wbA");
        assert_eq!(refs[1].workbook_id, "wbB");
    }

    #[test]
    fn test_no_references() {
        assert!(scan_references("just a normal question").is_empty());
        assert!(scan_references("").is_empty());
    }

    #[test]
    fn test_scheme_without_path_ignored() {
        assert!(scan_references("the workbook:// scheme is used").is_empty());
        assert!(scan_references("workbook://wbA has no path").is_empty());
    }

    #[test]
    fn test_nested_path() {
        let refs = scan_references("read workbook://wb-1/specs/engine/fuel.md now");
        assert_eq!(refs[0].workbook_id, "wb-1");
        assert_eq!(refs[0].path, "specs/engine/fuel.md");
    }
}
