use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::FetchError;

/// Posts a GraphQL payload and returns its `data` member.
///
/// Non-success statuses and a non-empty `errors` array are both failures.
pub(crate) async fn post_graphql(client: &Client, endpoint: &str, payload: &Value) -> Result<Value, FetchError> {
    let response = client.post(endpoint).json(payload).send().await?;
    info!("Response Code: {}", response.status());

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    let mut body: Value = response.json().await?;

    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages = errors
                .iter()
                .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
                .collect::<Vec<&str>>()
                .join("; ");
            return Err(FetchError::GraphQl(messages));
        }
    }

    match body.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => Err(FetchError::Malformed("response has no data".to_string())),
        Some(data) => {
            debug!("GraphQL data received");
            Ok(data)
        }
    }
}

/// Nested values are exported as compact JSON text, null stays empty
pub(crate) fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn json_text_keeps_structure() {
        assert_eq!(json_text(&Value::Null), None);
        assert_eq!(json_text(&json!("plain")), Some("plain".to_string()));
        assert_eq!(json_text(&json!([1, 2])), Some("[1,2]".to_string()));
        assert_eq!(json_text(&json!({"a": true})), Some(r#"{"a":true}"#.to_string()));
    }

    #[tokio::test]
    async fn returns_data_member() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": 1}})))
            .mount(&server)
            .await;

        let endpoint = format!("{}/graphql", server.uri());
        let data = post_graphql(&Client::new(), &endpoint, &json!({"query": "{}"})).await.unwrap();
        assert_eq!(data, json!({"ok": 1}));
    }

    #[tokio::test]
    async fn surfaces_graphql_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{"message": "bad location"}, {"message": "rate limited"}]
            })))
            .mount(&server)
            .await;

        let err = post_graphql(&Client::new(), &server.uri(), &json!({})).await.unwrap_err();
        match err {
            FetchError::GraphQl(msg) => assert_eq!(msg, "bad location; rate limited"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = post_graphql(&Client::new(), &server.uri(), &json!({})).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 403));
    }
}
