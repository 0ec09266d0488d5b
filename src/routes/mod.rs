use axum::Router;

use crate::state::AppState;

pub mod contractors;
pub mod flats;
pub mod health;
pub mod identity;
pub mod maintenance;
pub mod payments;
pub mod tenants;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(identity::router())
        .merge(flats::router())
        .merge(tenants::router())
        .merge(maintenance::router())
        .merge(payments::router())
        .merge(contractors::router())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::v1_router;
    use crate::{
        auth::tests::{test_config, token_for},
        state::AppState,
    };

    fn app() -> Router {
        v1_router().with_state(AppState {
            config: Arc::new(test_config()),
            db_pool: None,
        })
    }

    fn request(method: Method, uri: &str, user_id: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request should build"),
            None => builder.body(Body::empty()).expect("request should build"),
        }
    }

    fn raw_request(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for("user-1")));
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_is_ok_without_database() {
        let (status, body) = send(request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["db"], true);
    }

    #[tokio::test]
    async fn me_echoes_token_claims() {
        let (status, body) = send(request(Method::GET, "/me", Some("user-1"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "user-1");
        assert_eq!(body["email"], "user-1@example.com");
    }

    #[tokio::test]
    async fn data_endpoints_require_a_token() {
        for uri in ["/flats", "/tenants", "/payments/arrears", "/contractors"] {
            let (status, body) = send(request(Method::GET, uri, None, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert!(body["detail"].as_str().is_some_and(|detail| !detail.is_empty()));
        }
    }

    #[tokio::test]
    async fn missing_database_is_service_unavailable() {
        let (status, body) = send(request(Method::GET, "/flats", Some("user-1"), None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["detail"]
            .as_str()
            .is_some_and(|detail| detail.contains("DATABASE_URL")));
    }

    #[tokio::test]
    async fn missing_required_fields_are_named() {
        let (status, body) = send(request(
            Method::POST,
            "/flats",
            Some("user-1"),
            Some(json!({ "address": "1 High St", "monthly_rent": 900 })),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "name is required.");

        let (status, body) = send(request(
            Method::POST,
            "/flats/0b3f4a5e-7c1d-4f7e-9a61-3c1e2f0d9b10/invoices",
            Some("user-1"),
            Some(json!({ "amount": 950 })),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "due_date is required.");

        let (status, body) = send(request(
            Method::POST,
            "/tenants",
            Some("user-1"),
            Some(json!({ "flat_id": "f-1", "name": "Ada", "email": "not-an-email" })),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "email is invalid.");
    }

    #[tokio::test]
    async fn malformed_bodies_and_queries_render_json_errors() {
        let (status, body) = send(request(
            Method::POST,
            "/flats",
            Some("user-1"),
            Some(json!({ "name": "A", "address": "B", "monthly_rent": "lots" })),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .is_some_and(|detail| detail.contains("monthly_rent")));

        let (status, body) = send(raw_request(
            Method::POST,
            "/tenants",
            Some("application/json"),
            "{\"name\": ",
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, body) = send(raw_request(Method::POST, "/flats", None, "name=A")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let (status, body) = send(request(Method::GET, "/flats?limit=many", Some("user-1"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn mark_paid_body_is_optional_but_must_parse() {
        let uri = "/flats/0b3f4a5e-7c1d-4f7e-9a61-3c1e2f0d9b10/invoices/inv-1/mark-paid";
        let (status, _) = send(raw_request(Method::POST, uri, None, "")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = send(raw_request(
            Method::POST,
            uri,
            Some("application/json"),
            "{\"method\": \"barter\"}",
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .is_some_and(|detail| detail.starts_with("Invalid JSON body")));
    }

    #[tokio::test]
    async fn blank_names_and_oversized_descriptions_are_rejected() {
        let (status, body) = send(request(
            Method::POST,
            "/flats",
            Some("user-1"),
            Some(json!({ "name": "   ", "address": "1 High St", "monthly_rent": 900 })),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "name is required.");

        let (status, body) = send(request(
            Method::PATCH,
            "/flats/0b3f4a5e-7c1d-4f7e-9a61-3c1e2f0d9b10/maintenance/r-1",
            Some("user-1"),
            Some(json!({ "description": "x".repeat(4001) })),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "description is invalid.");
    }

    #[tokio::test]
    async fn contractor_directory_needs_no_database() {
        let (status, body) = send(request(
            Method::GET,
            "/contractors?trade=Plumbing",
            Some("user-1"),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        let contractors = body["data"].as_array().expect("data array");
        assert_eq!(contractors.len(), 2);
        assert!(contractors
            .iter()
            .all(|contractor| contractor["trade"] == "plumbing"));

        let (status, body) = send(request(
            Method::GET,
            "/contractors/ctr-elec-01",
            Some("user-1"),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trade"], "electrical");

        let (status, _) = send(request(
            Method::GET,
            "/contractors/ctr-missing",
            Some("user-1"),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
