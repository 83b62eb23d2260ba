//! System instructions per tool group.

use std::collections::BTreeSet;

use crate::tools::ToolGroup;

/// Substituted whenever a template comes out blank.
pub const FALLBACK_INSTRUCTION: &str = "You are a helpful assistant.";

const DATABASE_NAMES: [&str; 2] = ["query_database", "get_database_schema"];
const CODE_NAMES: [&str; 3] = ["execute_code", "explain_code", "suggest_refactor"];

pub const DATABASE_PROMPT: &str = "\
You are an expert SQL analyst and database specialist. You turn questions about
data into efficient, correct, read-only SQL.

AVAILABLE TOOLS:
- query_database: run a read-only SQL query and return formatted rows
- get_database_schema: list tables, columns and types

SAFETY RULES:
- Never issue destructive statements (DROP, DELETE, TRUNCATE, ALTER, UPDATE, INSERT, CREATE).
- Keep every query read-only: SELECT, WITH or EXPLAIN.
- Ask a clarifying question when the request is ambiguous.

HOW TO WORK:
1. Check the schema first when unsure of the table structure.
2. Write well-formatted SQL and explain what it does.
3. Sanity-check results before presenting them.
4. Suggest optimizations where they matter.";

pub const CODE_PROMPT: &str = "\
You are an expert software engineer and code reviewer.

AVAILABLE TOOLS:
- execute_code: run a Python snippet with a short time limit
- explain_code: summarize the structure of Python source
- suggest_refactor: static refactoring hints for Python source

RESPONSIBILITIES:
- Assess correctness, readability and performance.
- Point out bugs and show concrete fixes.
- Prefer clear, idiomatic examples.

SAFETY RULES:
- Never execute code that touches the filesystem, network or environment destructively.
- Review a snippet before running it.

HOW TO WORK:
1. Break the problem down.
2. Explain your reasoning and the fix.
3. Consider edge cases and error handling.";

pub const GENERAL_PROMPT: &str = "\
You are a helpful, knowledgeable assistant.

AVAILABLE TOOLS:
- search_web: look up current information on the web
- call_external_api: fetch data from a public REST API (GET only)

HOW TO WORK:
1. Understand the core question.
2. Use tools when you need current or external information.
3. Give a clear, complete, well-structured answer.

SAFETY RULES:
- Only call APIs with read-only GET requests.
- If you do not know something, say so. Never invent facts or sources.";

/// Group whose tools appear in `tool_names`; database first, then code, else general.
pub fn group_for_tools(tool_names: &BTreeSet<String>) -> ToolGroup {
    let has_any = |names: &[&str]| names.iter().any(|n| tool_names.contains(*n));
    if has_any(&DATABASE_NAMES) {
        ToolGroup::Database
    } else if has_any(&CODE_NAMES) {
        ToolGroup::CodeAnalysis
    } else {
        ToolGroup::General
    }
}

/// Overridable instruction set.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplates {
    pub database: String,
    pub code: String,
    pub general: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            database: DATABASE_PROMPT.to_string(),
            code: CODE_PROMPT.to_string(),
            general: GENERAL_PROMPT.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn for_group(&self, group: ToolGroup) -> &str {
        match group {
            ToolGroup::Database => &self.database,
            ToolGroup::CodeAnalysis => &self.code,
            ToolGroup::General => &self.general,
        }
    }

    /// System instruction for the active tool set. Never empty.
    pub fn select(&self, tool_names: &BTreeSet<String>) -> String {
        let template = self.for_group(group_for_tools(tool_names)).trim();
        if template.is_empty() {
            FALLBACK_INSTRUCTION.to_string()
        } else {
            template.to_string()
        }
    }
}

/// [`PromptTemplates::select`] on the built-in templates.
pub fn select_prompt(tool_names: &BTreeSet<String>) -> String {
    PromptTemplates::default().select(tool_names)
}
