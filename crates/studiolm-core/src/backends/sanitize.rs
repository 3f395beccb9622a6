//! Tool-name sanitization for backends with restricted name grammars
//!
//! The Gemini wire protocol only accepts function names made of
//! `[A-Za-z0-9_.-]`, starting with a letter or underscore, at most 64
//! characters. Registry tool names are arbitrary, so the adapter maps them
//! to wire-safe names for the duration of a single backend call and maps
//! responses back through the same table, so routing to the true tool
//! name is exact.

use std::collections::HashMap;

use crate::types::ToolDefinition;

const MAX_NAME_LEN: usize = 64;

/// Bidirectional tool-name map for one backend call
#[derive(Debug, Default)]
pub struct ToolNameMap {
    to_wire: HashMap<String, String>,
    to_tool: HashMap<String, String>,
}

impl ToolNameMap {
    /// Build a map covering the given tools. Collisions after
    /// sanitization get a numeric suffix so every tool keeps a distinct
    /// wire name.
    pub fn build(tools: &[ToolDefinition]) -> Self {
        let mut map = Self::default();
        for tool in tools {
            let base = sanitize(&tool.name);
            let mut candidate = base.clone();
            let mut suffix = 2usize;
            while map.to_tool.contains_key(&candidate) {
                let tail = format!("_{}", suffix);
                let keep = MAX_NAME_LEN.saturating_sub(tail.len()).min(base.len());
                candidate = format!("{}{}", &base[..keep], tail);
                suffix += 1;
            }
            map.to_wire.insert(tool.name.clone(), candidate.clone());
            map.to_tool.insert(candidate, tool.name.clone());
        }
        map
    }

    /// The wire name for a registry tool name (identity for unknown names)
    pub fn wire_name<'a>(&'a self, tool_name: &'a str) -> &'a str {
        self.to_wire
            .get(tool_name)
            .map(String::as_str)
            .unwrap_or(tool_name)
    }

    /// The registry tool name behind a wire name (identity for unknown
    /// names, so passthrough stays harmless)
    pub fn tool_name<'a>(&'a self, wire_name: &'a str) -> &'a str {
        self.to_tool
            .get(wire_name)
            .map(String::as_str)
            .unwrap_or(wire_name)
    }
}

/// Replace disallowed characters and enforce the grammar
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let starts_ok = out
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_ok {
        out.insert(0, '_');
    }
    if out.len() > MAX_NAME_LEN {
        out.truncate(MAX_NAME_LEN);
    }
    out
}
