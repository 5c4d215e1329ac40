//! Detection of tool-invocation requests embedded in model replies.
//!
//! Backends encode tool requests in different ways. Three encodings are
//! recognized, tried in this order, and the first that matches wins:
//!
//! 1. Delimited block: `<tool>{"name": "...", "arguments": {...}}</tool>`
//! 2. Whole reply: the entire reply is `{"function": {"name": "...", "arguments": ...}}`
//! 3. Line prefixed: a line `[Tool: <name>]` optionally followed by `Input: <text>`
//!
//! Tool output fed back to the model is wrapped in `<result>…</result>`.
//! A request that starts inside such a region is skipped, so a reply that
//! quotes an earlier result is never mistaken for a new request. The reply
//! text itself is never rewritten: a request whose arguments happen to
//! contain result markers parses as written.
//!
//! Detection never fails: a reply matching none of the encodings is plain
//! conversational content.

use serde_json::{Map, Value, json};
use std::ops::Range;

pub const TOOL_OPEN: &str = "<tool>";
pub const TOOL_CLOSE: &str = "</tool>";
pub const RESULT_OPEN: &str = "<result>";
pub const RESULT_CLOSE: &str = "</result>";
pub const LINE_MARKER: &str = "[Tool:";
pub const INPUT_MARKER: &str = "Input:";

/// A tool request extracted from a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    /// Passed through to the tool untouched.
    pub arguments: Value,
}

/// The encoding a request was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    DelimitedBlock,
    WholeReply,
    LinePrefixed,
}

/// Outcome of running the interpreter over a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    NoCall,
    Call { call: ToolCall, format: WireFormat },
}

impl Detection {
    pub fn call(&self) -> Option<&ToolCall> {
        match self {
            Detection::NoCall => None,
            Detection::Call { call, .. } => Some(call),
        }
    }

    pub fn format(&self) -> Option<WireFormat> {
        match self {
            Detection::NoCall => None,
            Detection::Call { format, .. } => Some(*format),
        }
    }
}

type Detector = fn(&str, &Quoted) -> Option<ToolCall>;

const DETECTORS: [(WireFormat, Detector); 3] = [
    (WireFormat::DelimitedBlock, delimited_block),
    (WireFormat::WholeReply, whole_reply),
    (WireFormat::LinePrefixed, line_prefixed),
];

/// Detect a tool request in a fully accumulated reply.
pub fn interpret(reply: &str) -> Detection {
    let quoted = Quoted::scan(reply);
    for (format, detect) in DETECTORS {
        if let Some(call) = detect(reply, &quoted) {
            return Detection::Call { call, format };
        }
    }
    Detection::NoCall
}

/// Wrap tool output for re-submission to the model.
pub fn wrap_result(output: &str) -> String {
    format!("{RESULT_OPEN}{output}{RESULT_CLOSE}")
}

/// Render a request as a delimited block.
pub fn render_block(name: &str, arguments: &Value) -> String {
    let body = json!({ "name": name, "arguments": arguments });
    format!("{TOOL_OPEN}{body}{TOOL_CLOSE}")
}

/// Render a request as a whole-reply function object.
pub fn render_function(name: &str, arguments: &Value) -> String {
    json!({ "function": { "name": name, "arguments": arguments } }).to_string()
}

/// Render a request in the line-prefixed form.
pub fn render_lines(name: &str, arguments: &Value) -> String {
    format!("\n{LINE_MARKER} {name}]\n{INPUT_MARKER} {arguments}\n")
}

/// Byte ranges of complete `<result>…</result>` regions. An unterminated
/// opening marker starts no region.
struct Quoted(Vec<Range<usize>>);

impl Quoted {
    fn scan(reply: &str) -> Self {
        let mut regions = Vec::new();
        let mut from = 0;
        while let Some(open) = reply[from..].find(RESULT_OPEN) {
            let start = from + open;
            let body = start + RESULT_OPEN.len();
            let Some(close) = reply[body..].find(RESULT_CLOSE) else {
                break;
            };
            from = body + close + RESULT_CLOSE.len();
            regions.push(start..from);
        }
        Self(regions)
    }

    fn contains(&self, at: usize) -> bool {
        self.0.iter().any(|region| region.contains(&at))
    }
}

fn call_from_object(object: &Map<String, Value>) -> Option<ToolCall> {
    let name = object.get("name")?.as_str()?;
    let arguments = object.get("arguments")?;
    Some(ToolCall {
        name: name.to_string(),
        arguments: arguments.clone(),
    })
}

/// The first block opening outside a quoted result. Its body runs to the
/// first closing marker that yields valid JSON, so arguments may contain the
/// marker text.
fn delimited_block(text: &str, quoted: &Quoted) -> Option<ToolCall> {
    let (open, _) = text
        .match_indices(TOOL_OPEN)
        .find(|(at, _)| !quoted.contains(*at))?;
    let start = open + TOOL_OPEN.len();
    let body = text[start..]
        .match_indices(TOOL_CLOSE)
        .find_map(|(end, _)| serde_json::from_str::<Value>(text[start..start + end].trim()).ok())?;
    call_from_object(body.as_object()?)
}

fn whole_reply(text: &str, _quoted: &Quoted) -> Option<ToolCall> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let body: Value = serde_json::from_str(trimmed).ok()?;
    call_from_object(body.get("function")?.as_object()?)
}

fn line_prefixed(text: &str, quoted: &Quoted) -> Option<ToolCall> {
    let mut offset = 0;
    let lines: Vec<(usize, &str)> = text
        .split_inclusive('\n')
        .map(|raw| {
            let at = offset;
            offset += raw.len();
            (at, raw.trim_end_matches(['\n', '\r']))
        })
        .collect();
    for (index, (at, line)) in lines.iter().enumerate() {
        if quoted.contains(*at) {
            continue;
        }
        let Some(rest) = line.strip_prefix(LINE_MARKER) else {
            continue;
        };
        let Some(name) = rest.trim_end().strip_suffix(']') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let arguments = lines
            .get(index + 1)
            .and_then(|(_, next)| next.strip_prefix(INPUT_MARKER))
            .map(|raw| Value::String(raw.trim().to_string()))
            .unwrap_or(Value::Null);
        return Some(ToolCall {
            name: name.to_string(),
            arguments,
        });
    }
    None
}
