//! Tests for the tool system.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use switchyard::error::{Result, SwitchyardError};
use switchyard::tools::database::BLOCKED_MESSAGE;
use switchyard::tools::*;

#[test]
fn parameter_builder_constructs_schema() {
    let params = ToolParameters::object()
        .string("url", "Absolute URL", true)
        .string_with_default("method", "HTTP method", "GET")
        .build();

    let schema = &params.schema;
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["url"]["type"], "string");
    assert_eq!(schema["properties"]["method"]["default"], "GET");
    assert_eq!(schema["required"], json!(["url"]));
}

#[test]
fn empty_parameters() {
    let params = ToolParameters::empty();
    assert_eq!(params.schema["type"], "object");
    assert_eq!(params.schema["required"], json!([]));
}

#[test]
fn tool_arguments_get_str() {
    let args = ToolArguments::new(json!({"query": "rust", "limit": 3}));
    assert_eq!(args.get_str("query").unwrap(), "rust");
    assert!(args.get_str("limit").is_err());
    assert!(matches!(args.get_str("missing"), Err(SwitchyardError::InvalidArgument(_))));
    assert_eq!(args.get_str_or("method", "GET"), "GET");
}

#[test]
fn registry_exposes_seven_capabilities_in_three_groups() {
    let registry = ToolRegistry::new(ToolBackends::default());
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(
        names,
        vec![
            "call_external_api",
            "execute_code",
            "explain_code",
            "get_database_schema",
            "query_database",
            "search_web",
            "suggest_refactor",
        ]
    );

    for group in [ToolGroup::Database, ToolGroup::CodeAnalysis, ToolGroup::General] {
        assert_eq!(registry.tools_for_group(group), group.tool_names());
    }
    assert_eq!(ToolGroup::CodeAnalysis.tool_names().len(), 3);
}

#[test]
fn definitions_skip_unknown_names() {
    let registry = ToolRegistry::new(ToolBackends::default());
    let selected: BTreeSet<String> = ["search_web", "not_a_tool"].into_iter().map(String::from).collect();
    let defs = registry.definitions(&selected);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "search_web");
    assert_eq!(defs[0].parameters["required"], json!(["query"]));
}

#[tokio::test]
async fn missing_backend_is_a_configuration_error() {
    let registry = ToolRegistry::new(ToolBackends::default());
    let err = registry
        .invoke("query_database", &json!({"sql_query": "SELECT 1"}))
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchyardError::Configuration(ref m) if m.contains("DATABASE_PATH")));
}

#[tokio::test]
async fn missing_arguments_are_reported() {
    let registry = ToolRegistry::new(ToolBackends::default());
    let err = registry.invoke("explain_code", &json!({})).await.unwrap_err();
    assert!(matches!(err, SwitchyardError::InvalidArgument(_)));
}

struct SlowSearch;

#[async_trait]
impl SearchBackend for SlowSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn slow_tools_time_out() {
    let backends = ToolBackends {
        search: Some(Arc::new(SlowSearch)),
        ..ToolBackends::default()
    };
    let registry = ToolRegistry::new(backends);
    assert_eq!(registry.timeout(), Duration::from_secs(15));

    let err = registry.invoke("search_web", &json!({"query": "x"})).await.unwrap_err();
    assert!(matches!(err, SwitchyardError::Timeout(15_000)));
}

struct PanickingSearch;

#[async_trait]
impl SearchBackend for PanickingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        panic!("index out of range")
    }
}

#[tokio::test]
async fn panicking_handlers_become_tool_errors() {
    let backends = ToolBackends {
        search: Some(Arc::new(PanickingSearch)),
        ..ToolBackends::default()
    };
    let err = ToolRegistry::new(backends)
        .invoke("search_web", &json!({"query": "x"}))
        .await
        .unwrap_err();
    match err {
        SwitchyardError::ToolExecution { tool_name, message } => {
            assert_eq!(tool_name, "search_web");
            assert_eq!(message, "handler panicked: index out of range");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn explain_code_handles_unicode_indented_docstrings() {
    let registry = ToolRegistry::new(ToolBackends::default());
    let code = "def f():\n    \"\"\"Doc.\n     a\n    \u{a0}b\n    \"\"\"\n    pass\n";
    let out = tokio::spawn(async move { registry.invoke("explain_code", &json!({"code": code})).await })
        .await
        .expect("handler must not panic")
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed[0]["name"], "f");
    assert_eq!(parsed[0]["doc"], "Doc.\na\nb");
}

#[tokio::test]
async fn tavily_search_renders_hits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"api_key": "tv-key", "query": "rust async", "max_results": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "ignored",
            "results": [
                {"title": "Async Book", "url": "https://rust-lang.github.io/async-book/", "content": "Asynchronous programming in Rust."},
                {"title": "", "url": "", "content": ""}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backends = ToolBackends {
        search: Some(Arc::new(TavilySearch::new("tv-key".to_string(), Some(server.uri())))),
        ..ToolBackends::default()
    };
    let out = ToolRegistry::new(backends)
        .invoke("search_web", &json!({"query": "rust async"}))
        .await
        .unwrap();

    assert_eq!(
        out,
        "Found 2 results for 'rust async':\n\n\
         1. **Async Book**\n   URL: https://rust-lang.github.io/async-book/\n   Asynchronous programming in Rust....\n\n\
         2. **No title**\n"
    );
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seeded() -> ToolRegistry {
        let backend = SqliteBackend::open(":memory:").unwrap();
        backend
            .execute_batch(
                "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, tier TEXT DEFAULT 'free');
                 INSERT INTO customers (name, tier) VALUES ('Ada', 'pro'), ('Grace', 'free');",
            )
            .unwrap();
        ToolRegistry::new(ToolBackends {
            sql: Some(Arc::new(backend)),
            ..ToolBackends::default()
        })
    }

    #[tokio::test]
    async fn select_renders_rows() {
        let out = seeded()
            .invoke("query_database", &json!({"sql_query": "SELECT name FROM customers ORDER BY id"}))
            .await
            .unwrap();
        assert_eq!(
            out,
            "✅ Query successful! Found 2 rows:\n\n• {\"name\":\"Ada\"}\n• {\"name\":\"Grace\"}\n"
        );
    }

    #[tokio::test]
    async fn writes_are_blocked_before_reaching_the_database() {
        let registry = seeded();
        let out = registry
            .invoke("query_database", &json!({"sql_query": "DELETE FROM customers"}))
            .await
            .unwrap();
        assert_eq!(out, BLOCKED_MESSAGE);

        let count = registry
            .invoke("query_database", &json!({"sql_query": "SELECT COUNT(*) AS n FROM customers"}))
            .await
            .unwrap();
        assert!(count.contains("{\"n\":2}"), "{count}");
    }

    #[tokio::test]
    async fn database_errors_are_rendered() {
        let out = seeded()
            .invoke("query_database", &json!({"sql_query": "SELECT * FROM missing_table"}))
            .await
            .unwrap();
        assert!(out.starts_with("❌ Database error:"), "{out}");
    }

    #[tokio::test]
    async fn schema_lists_tables_and_columns() {
        let out = seeded().invoke("get_database_schema", &json!({})).await.unwrap();
        assert!(out.starts_with("📌 Database Schema:"));
        assert!(out.contains("=== customers ==="));
        assert!(out.contains("  - name (TEXT) NOT NULL"));
        assert!(out.contains("  - tier (TEXT) NULL DEFAULT 'free'"));
    }
}
