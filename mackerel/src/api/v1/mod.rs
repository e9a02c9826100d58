pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod response;
pub mod router;

#[cfg(test)]
pub(crate) async fn test_state(
    api_keys: Vec<String>,
) -> (crate::api::AppState, tempfile::NamedTempFile) {
    use std::sync::Arc;

    use crate::config::{
        Config, DatabaseConfig, MatchingConfig, QueueConfig, ResolutionConfig, ServerConfig,
    };
    use crate::db::{Database, LibSqlBackend, MatchingOracle};

    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_keys,
        },
        database: DatabaseConfig {
            url: temp_file.path().to_str().unwrap().to_string(),
            auth_token: None,
            local_path: None,
        },
        queue: QueueConfig {
            default_limit: 25,
            max_limit: 200,
            source_timeout_secs: 10,
        },
        resolution: ResolutionConfig {
            batch_concurrency: 4,
        },
        matching: MatchingConfig {
            name_agreement_threshold: 0.85,
            weak_name_threshold: 0.92,
            scan_enabled: false,
            scan_interval_secs: 3600,
        },
    };

    let raw_db = Database::new(&config.database).await.unwrap();
    let db: Arc<dyn MatchingOracle> = Arc::new(LibSqlBackend::new(raw_db));

    (crate::api::AppState::new(config, db), temp_file)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::test_state;
    use crate::api::routes::create_router;
    use crate::db::test_support::{insert_dedup_candidate, insert_person};

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
        request.header("Authorization", "Bearer test-key")
    }

    #[tokio::test]
    async fn protected_route_requires_auth() {
        let (state, _temp) = test_state(vec!["test-key".to_string()]).await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/duplicates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _temp) = test_state(vec!["secret".to_string()]).await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["sources"]["dedup"], "ok");
    }

    #[tokio::test]
    async fn openapi_json_is_public_and_valid() {
        let (state, _temp) = test_state(vec!["secret".to_string()]).await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let version = json["openapi"]
            .as_str()
            .expect("openapi field should be a string");
        assert!(
            version.starts_with("3"),
            "OpenAPI version should start with 3, got: {version}"
        );
    }

    #[tokio::test]
    async fn queue_roundtrip_through_http() {
        // Given a pending tier-1 candidate
        let (state, _temp) = test_state(vec!["test-key".to_string()]).await;
        let conn = {
            use crate::config::DatabaseConfig;
            let config = DatabaseConfig {
                url: _temp.path().to_str().unwrap().to_string(),
                auth_token: None,
                local_path: None,
            };
            crate::db::Database::new(&config).await.unwrap().connect().unwrap()
        };
        insert_person(&conn, "P1", Some("Ada"), Some("Feral"), Some("a@x.com"), None).await;
        insert_person(&conn, "P2", Some("Ada"), Some("Feral"), Some("a@x.com"), None).await;
        insert_dedup_candidate(&conn, "P1", "P2", 1, 5).await;
        let app = create_router(state);

        // When listing the queue
        let response = app
            .clone()
            .oneshot(
                authed(Request::builder().uri("/api/v1/duplicates?filter=tier1"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Then the candidate appears with stats and pagination meta
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["items"][0]["compositeId"], "dedup:P1:P2");
        assert_eq!(json["data"]["items"][0]["matchProbability"], 0.99);
        assert_eq!(json["data"]["stats"]["tier1"], 1);
        assert_eq!(json["meta"]["pagination"]["approximate"], false);

        // When resolving it over HTTP
        let response = app
            .clone()
            .oneshot(
                authed(
                    Request::builder()
                        .method("POST")
                        .uri("/api/v1/duplicates:resolve")
                        .header("content-type", "application/json"),
                )
                .body(Body::from(
                    r#"{"id":"dedup:P1:P2","action":"merge","resolvedBy":"jo"}"#,
                ))
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "merged");

        // And a second attempt reports the race distinctly
        let response = app
            .oneshot(
                authed(
                    Request::builder()
                        .method("POST")
                        .uri("/api/v1/duplicates:resolve")
                        .header("content-type", "application/json"),
                )
                .body(Body::from(r#"{"id":"dedup:P1:P2","action":"dismiss"}"#))
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "already_resolved");
    }

    #[tokio::test]
    async fn unknown_filter_is_invalid_request() {
        let (state, _temp) = test_state(vec!["test-key".to_string()]).await;
        let app = create_router(state);

        let response = app
            .oneshot(
                authed(Request::builder().uri("/api/v1/duplicates?filter=tier9"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let (state, _temp) = test_state(vec!["test-key".to_string()]).await;
        let app = create_router(state);

        let response = app
            .oneshot(
                authed(
                    Request::builder()
                        .method("POST")
                        .uri("/api/v1/duplicates:resolveBatch")
                        .header("content-type", "application/json"),
                )
                .body(Body::from(r#"{"items":[]}"#))
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_reports_partial_success_over_http() {
        let (state, _temp) = test_state(vec!["test-key".to_string()]).await;
        let conn = {
            use crate::config::DatabaseConfig;
            let config = DatabaseConfig {
                url: _temp.path().to_str().unwrap().to_string(),
                auth_token: None,
                local_path: None,
            };
            crate::db::Database::new(&config).await.unwrap().connect().unwrap()
        };
        insert_person(&conn, "P1", Some("Ada"), Some("Feral"), None, None).await;
        insert_person(&conn, "P2", Some("Ada"), Some("Feral"), None, None).await;
        insert_dedup_candidate(&conn, "P1", "P2", 5, 1).await;
        let app = create_router(state);

        let response = app
            .oneshot(
                authed(
                    Request::builder()
                        .method("POST")
                        .uri("/api/v1/duplicates:resolveBatch")
                        .header("content-type", "application/json"),
                )
                .body(Body::from(
                    r#"{"items":[
                        {"id":"dedup:P1:P2","action":"keep_separate"},
                        {"id":"dedup:no:pair","action":"merge"}
                    ],"resolvedBy":"jo"}"#,
                ))
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["succeeded"], 1);
        assert_eq!(json["data"]["failed"], 1);
        assert_eq!(json["data"]["results"][0]["success"], true);
        assert_eq!(json["data"]["results"][1]["success"], false);
        assert_eq!(json["data"]["results"][1]["code"], "invalid_candidate");
    }
}
