//! Tests for the error system.

use switchyard::error::*;

#[test]
fn error_api_creation() {
    let err = SwitchyardError::api(404, "Not found");
    assert!(matches!(&err, SwitchyardError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API error (status 404): Not found");
}

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: SwitchyardError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
        expected_recovery: RecoverySuggestion,
    }

    let network_error = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: SwitchyardError::Authentication("bad-key".to_string()),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: SwitchyardError::RateLimited {
                retry_after_ms: Some(1000),
            },
            expected_category: ErrorCategory::RateLimit,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: SwitchyardError::Timeout(5000),
            expected_category: ErrorCategory::Timeout,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::IncreaseTimeout,
        },
        Case {
            error: SwitchyardError::Configuration("bad-config".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: SwitchyardError::ModelUnavailable("anthropic".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: SwitchyardError::Network(network_error),
            expected_category: ErrorCategory::Network,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: SwitchyardError::Serialization(serde_error),
            expected_category: ErrorCategory::Serialization,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: SwitchyardError::tool("search_web", "failed"),
            expected_category: ErrorCategory::ToolExecution,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckToolImplementation,
        },
        Case {
            error: SwitchyardError::api(401, "Unauthorized"),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: SwitchyardError::api(429, "Rate limited"),
            expected_category: ErrorCategory::RateLimit,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: SwitchyardError::api(503, "Server unavailable"),
            expected_category: ErrorCategory::Server,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: SwitchyardError::api(418, "Teapot"),
            expected_category: ErrorCategory::Api,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: SwitchyardError::InvalidInput("Message cannot be empty".to_string()),
            expected_category: ErrorCategory::Client,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::FixRequest,
        },
        Case {
            error: SwitchyardError::ThreadNotFound("thread_0123456789abcdef".to_string()),
            expected_category: ErrorCategory::Client,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::FixRequest,
        },
        Case {
            error: SwitchyardError::Io(io_error),
            expected_category: ErrorCategory::Persistence,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckStorage,
        },
        Case {
            error: SwitchyardError::persistence("disk full"),
            expected_category: ErrorCategory::Persistence,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckStorage,
        },
        Case {
            error: SwitchyardError::InvalidArgument("bad-arg".to_string()),
            expected_category: ErrorCategory::Unknown,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category, "{}", case.error);
        assert_eq!(case.error.is_retryable(), case.expected_retryable, "{}", case.error);
        assert_eq!(case.error.recovery_suggestion(), case.expected_recovery, "{}", case.error);
    }
}

#[test]
fn client_and_infrastructure_errors_are_disjoint() {
    let client = SwitchyardError::InvalidInput("bad".into());
    let infra = SwitchyardError::persistence("gone");
    let agent = SwitchyardError::api(500, "boom");

    assert!(client.is_client_error() && !client.is_infrastructure());
    assert!(infra.is_infrastructure() && !infra.is_client_error());
    assert!(!agent.is_client_error() && !agent.is_infrastructure());
}

#[test]
fn error_display_messages() {
    assert_eq!(
        SwitchyardError::ThreadNotFound("thread_0123456789abcdef".into()).to_string(),
        "Thread not found: thread_0123456789abcdef"
    );
    assert_eq!(
        SwitchyardError::ModelUnavailable("openai".into()).to_string(),
        "No provider configured for model 'openai'"
    );
    assert_eq!(
        SwitchyardError::tool("query_database", "no connection").to_string(),
        "Tool execution error: query_database: no connection"
    );
}
