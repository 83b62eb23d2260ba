//! Code-analysis capabilities for Python source.
//!
//! `explain_code` and `suggest_refactor` work on a light structural scan
//! (logical lines, indentation and block headers) rather than a full parser.
//! `execute_code` hands the snippet to a Python interpreter on stdin.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::util::text::take_chars;

/// Wall-clock ceiling for a single snippet run.
pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(5);

const DOC_LIMIT: usize = 240;
const MAX_ARGS: usize = 6;
const MAX_FUNCTION_LINES: usize = 80;
const MAX_LOOP_DEPTH: usize = 2;

/// A structural scan failure, reported like an interpreter would.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

/// One statement, possibly spanning several physical lines.
#[derive(Debug, Clone)]
struct LogicalLine {
    start: usize,
    end: usize,
    indent: usize,
    text: String,
}

#[derive(Debug, Clone, Copy)]
struct OpenString {
    quote: char,
    triple: bool,
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Split source into logical lines, dropping comments and blank lines.
fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, SyntaxError> {
    let mut out = Vec::new();
    let mut buffer = String::new();
    let mut start = 0;
    let mut indent = 0;
    let mut depth: i32 = 0;
    let mut open: Option<OpenString> = None;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;

        if buffer.is_empty() && open.is_none() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            start = line_no;
            indent = indent_width(line);
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = if buffer.is_empty() {
            chars.iter().take_while(|c| c.is_whitespace()).count()
        } else {
            0
        };
        while i < chars.len() {
            let c = chars[i];
            if let Some(s) = open {
                buffer.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        buffer.push(next);
                    }
                    i += 2;
                    continue;
                }
                if c == s.quote {
                    if !s.triple {
                        open = None;
                    } else if chars.get(i + 1) == Some(&s.quote) && chars.get(i + 2) == Some(&s.quote) {
                        buffer.push(s.quote);
                        buffer.push(s.quote);
                        i += 2;
                        open = None;
                    }
                }
                i += 1;
                continue;
            }

            match c {
                '#' => break,
                '"' | '\'' => {
                    let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                    if triple {
                        buffer.push(c);
                        buffer.push(c);
                        i += 2;
                    }
                    open = Some(OpenString { quote: c, triple });
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(SyntaxError {
                            message: format!("unmatched '{c}'"),
                            line: line_no,
                        });
                    }
                }
                _ => {}
            }
            buffer.push(c);
            i += 1;
        }

        if let Some(s) = open {
            if !s.triple && !buffer.ends_with('\\') {
                return Err(SyntaxError {
                    message: "unterminated string literal".to_string(),
                    line: line_no,
                });
            }
        }

        let continued = open.is_some() || depth > 0 || buffer.trim_end().ends_with('\\');
        if continued {
            buffer.push('\n');
            continue;
        }

        let text = buffer.trim_end().to_string();
        buffer.clear();
        if !text.is_empty() {
            out.push(LogicalLine {
                start,
                end: line_no,
                indent,
                text,
            });
        }
    }

    if open.is_some_and(|s| s.triple) {
        return Err(SyntaxError {
            message: "unterminated triple-quoted string literal".to_string(),
            line: start,
        });
    }
    if depth > 0 {
        return Err(SyntaxError {
            message: "'(' was never closed".to_string(),
            line: start,
        });
    }

    Ok(out)
}

fn def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").expect("def header regex must compile")
    })
}

fn class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^class\s+([A-Za-z_]\w*)\s*(\(|:)").expect("class header regex must compile"))
}

fn loop_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:async\s+)?(?:for|while)\b").expect("loop header regex must compile"))
}

/// Index of the `)` closing the `(` at `open_idx`.
fn matching_paren(text: &str, open_idx: usize) -> Option<usize> {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (idx, c) in text.char_indices().skip_while(|(i, _)| *i < open_idx) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Positional parameter names, stopping at `*args`, a bare `*` or `**kwargs`.
fn positional_args(params: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for c in params.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    pieces.push(current);

    let mut args = Vec::new();
    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() || piece == "/" {
            continue;
        }
        if piece.starts_with('*') {
            break;
        }
        let name = piece
            .split(|c| c == ':' || c == '=')
            .next()
            .unwrap_or(piece)
            .trim();
        args.push(name.to_string());
    }
    args
}

/// Docstring of a block whose first body statement is `first`.
fn docstring(first: Option<&LogicalLine>) -> String {
    let Some(line) = first else {
        return String::new();
    };
    let text = line.text.trim();
    let text = text.trim_start_matches(|c: char| matches!(c, 'r' | 'R' | 'u' | 'U'));
    let body = ["\"\"\"", "'''", "\"", "'"].iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    });
    match body {
        Some(raw) => clean_doc(raw),
        None => String::new(),
    }
}

/// Strip uniform indentation the way Python's `inspect.cleandoc` does.
fn clean_doc(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim_start().to_string()
            } else if l.chars().count() >= margin {
                l.chars().skip(margin).collect::<String>().trim_end().to_string()
            } else {
                l.trim().to_string()
            }
        })
        .collect();
    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

fn short_doc(doc: String) -> String {
    if doc.chars().count() > DOC_LIMIT {
        format!("{}...", take_chars(&doc, DOC_LIMIT))
    } else {
        doc
    }
}

#[derive(Debug, Clone)]
struct FunctionDef {
    name: String,
    args: Vec<String>,
    doc: String,
    loc: usize,
    indent: usize,
}

#[derive(Debug, Clone)]
struct ClassDef {
    name: String,
    doc: String,
    methods: Vec<String>,
}

#[derive(Debug, Clone)]
enum Definition {
    Function(FunctionDef),
    Class(ClassDef),
}

/// Indices of the body statements of the block opened at `header`.
fn block_body(lines: &[LogicalLine], header: usize) -> std::ops::Range<usize> {
    let indent = lines[header].indent;
    let end = lines[header + 1..]
        .iter()
        .position(|l| l.indent <= indent)
        .map(|p| header + 1 + p)
        .unwrap_or(lines.len());
    header + 1..end
}

fn parse_function(lines: &[LogicalLine], idx: usize) -> Result<Option<FunctionDef>, SyntaxError> {
    let line = &lines[idx];
    let Some(caps) = def_regex().captures(&line.text) else {
        if line.text.starts_with("def ") || line.text.starts_with("async def ") {
            return Err(SyntaxError {
                message: "invalid syntax".to_string(),
                line: line.start,
            });
        }
        return Ok(None);
    };
    let name = caps[1].to_string();
    let open_idx = caps.get(0).map(|m| m.end() - 1).unwrap_or(0);
    let close_idx = matching_paren(&line.text, open_idx).ok_or_else(|| SyntaxError {
        message: "'(' was never closed".to_string(),
        line: line.start,
    })?;
    let after = line.text[close_idx + 1..].trim_start();
    let has_colon = after.starts_with(':') || (after.starts_with("->") && after.contains(':'));
    if !has_colon {
        return Err(SyntaxError {
            message: "expected ':'".to_string(),
            line: line.start,
        });
    }

    let body = block_body(lines, idx);
    let end = if body.is_empty() {
        line.end
    } else {
        lines[body.end - 1].end
    };
    Ok(Some(FunctionDef {
        name,
        args: positional_args(&line.text[open_idx + 1..close_idx]),
        doc: docstring(lines.get(body.start).filter(|_| !body.is_empty())),
        loc: end - line.start + 1,
        indent: line.indent,
    }))
}

fn parse_class(lines: &[LogicalLine], idx: usize) -> Result<Option<ClassDef>, SyntaxError> {
    let line = &lines[idx];
    let Some(caps) = class_regex().captures(&line.text) else {
        if line.text.starts_with("class ") {
            return Err(SyntaxError {
                message: "invalid syntax".to_string(),
                line: line.start,
            });
        }
        return Ok(None);
    };
    if !line.text.contains(':') {
        return Err(SyntaxError {
            message: "expected ':'".to_string(),
            line: line.start,
        });
    }

    let body = block_body(lines, idx);
    let member_indent = body.clone().next().map(|i| lines[i].indent);
    let mut methods = Vec::new();
    for i in body.clone() {
        if Some(lines[i].indent) != member_indent {
            continue;
        }
        if let Some(caps) = def_regex().captures(&lines[i].text) {
            methods.push(caps[1].to_string());
        }
    }

    Ok(Some(ClassDef {
        name: caps[1].to_string(),
        doc: docstring(lines.get(body.start).filter(|_| !body.is_empty())),
        methods,
    }))
}

/// All function definitions at any depth.
fn all_functions(lines: &[LogicalLine]) -> Result<Vec<FunctionDef>, SyntaxError> {
    let mut out = Vec::new();
    for idx in 0..lines.len() {
        if let Some(f) = parse_function(lines, idx)? {
            out.push(f);
        }
    }
    Ok(out)
}

fn top_level_definitions(lines: &[LogicalLine]) -> Result<Vec<Definition>, SyntaxError> {
    let base = lines.first().map(|l| l.indent).unwrap_or(0);
    let mut out = Vec::new();
    for idx in 0..lines.len() {
        // Validate nested headers too so syntax errors surface anywhere.
        let function = parse_function(lines, idx)?;
        let class = parse_class(lines, idx)?;
        if lines[idx].indent != base {
            continue;
        }
        if let Some(f) = function {
            out.push(Definition::Function(f));
        } else if let Some(c) = class {
            out.push(Definition::Class(c));
        }
    }
    Ok(out)
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Summary {
    Function {
        name: String,
        args: Vec<String>,
        doc: String,
        loc: usize,
    },
    Class {
        name: String,
        methods: Vec<String>,
        doc: String,
    },
}

/// Structural summary of top-level functions and classes as pretty JSON.
pub fn explain_code(code: &str) -> String {
    let definitions = match logical_lines(code).and_then(|lines| top_level_definitions(&lines)) {
        Ok(defs) => defs,
        Err(e) => return format!("Syntax error: {e}"),
    };

    let summary: Vec<Summary> = definitions
        .into_iter()
        .map(|def| match def {
            Definition::Function(f) => Summary::Function {
                name: f.name,
                args: f.args,
                doc: short_doc(f.doc),
                loc: f.loc,
            },
            Definition::Class(c) => Summary::Class {
                name: c.name,
                methods: c.methods,
                doc: short_doc(c.doc),
            },
        })
        .collect();

    serde_json::to_string_pretty(&summary).unwrap_or_else(|e| format!("Analysis error: {e}"))
}

/// Static refactor hints: long parameter lists, long functions, deep loops.
pub fn suggest_refactor(code: &str) -> String {
    let lines = match logical_lines(code) {
        Ok(lines) => lines,
        Err(e) => return format!("Refactor error: {e}"),
    };
    let functions = match all_functions(&lines) {
        Ok(functions) => functions,
        Err(e) => return format!("Refactor error: {e}"),
    };

    let mut messages = Vec::new();
    let mut loop_stack: Vec<usize> = Vec::new();
    let mut fn_iter = functions.iter().peekable();

    for line in &lines {
        while loop_stack.last().is_some_and(|&indent| indent >= line.indent) {
            loop_stack.pop();
        }

        if let Some(f) = fn_iter.peek() {
            if def_regex().is_match(&line.text) && f.indent == line.indent {
                if f.args.len() > MAX_ARGS {
                    messages.push(format!("Function '{}' has {} args", f.name, f.args.len()));
                }
                if f.loc > MAX_FUNCTION_LINES {
                    messages.push(format!("Function '{}' is {} lines", f.name, f.loc));
                }
                fn_iter.next();
            }
        }

        if loop_regex().is_match(&line.text) {
            if loop_stack.len() >= MAX_LOOP_DEPTH {
                messages.push("Found nested loops deeper than 2".to_string());
            }
            loop_stack.push(line.indent);
        }
    }

    if messages.is_empty() {
        "No refactor suggestions found.".to_string()
    } else {
        messages.join("\n")
    }
}

/// Run a Python snippet, feeding it to the interpreter on stdin.
pub async fn execute_code(python_bin: &str, code: &str, language: &str) -> String {
    if !language.eq_ignore_ascii_case("python") {
        return "Only Python execution is supported.".to_string();
    }

    let child = Command::new(python_bin)
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(e) => return format!("Execution error: {e}"),
    };

    let run = async {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes()).await?;
        }
        child.wait_with_output().await
    };

    match tokio::time::timeout(EXECUTION_TIMEOUT, run).await {
        Err(_) => {
            tracing::warn!(timeout_secs = EXECUTION_TIMEOUT.as_secs(), "code execution timed out");
            "Timeout (5 seconds limit)".to_string()
        }
        Ok(Err(e)) => format!("Execution error: {e}"),
        Ok(Ok(output)) if !output.status.success() => {
            format!("Error: {}", String::from_utf8_lossy(&output.stderr))
        }
        Ok(Ok(output)) => format!("Success: {}", String::from_utf8_lossy(&output.stdout)),
    }
}
