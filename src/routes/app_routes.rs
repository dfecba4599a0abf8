// src/routes/app_routes.rs

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::handlers::chat_handlers::{get_messages, mark_read, send_message};
use crate::handlers::inbox_handlers::get_inbox;
use crate::middleware::{auth_middleware::auth_middleware, ws_auth_middleware::ws_auth_middleware};
use crate::websocket::handlers::websocket_handler;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/businesses/:business_id/messages",
            get(get_messages)
                .post(send_message)
                .route_layer(from_fn(auth_middleware)),
        )
        .route(
            "/businesses/:business_id/messages/read",
            post(mark_read).route_layer(from_fn(auth_middleware)),
        )
        .route("/inbox", get(get_inbox).route_layer(from_fn(auth_middleware)))
        .route(
            "/ws",
            get(websocket_handler).route_layer(from_fn(ws_auth_middleware)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        models::business::Business, repositories::memory::InMemoryStore,
        services::jwt_service::create_jwt, websocket::change_feed::ChangeFeed,
    };

    const SECRET: &str = "clave-de-prueba";

    struct Fixture {
        app: Router,
        owner: Uuid,
        customer: Uuid,
        business: Uuid,
    }

    fn fixture() -> Fixture {
        let feed = ChangeFeed::new(64);
        let store = Arc::new(InMemoryStore::with_feed(feed.clone()));
        let owner = Uuid::new_v4();
        let business = Uuid::new_v4();
        store
            .add_business(Business {
                id: business,
                name: "Salón Bella".to_string(),
                city: Some("Granada".to_string()),
                owner_id: Some(owner),
            })
            .unwrap();

        let state = AppState::new(feed, store.clone(), store, SECRET, 50);
        Fixture {
            app: create_router(state),
            owner,
            customer: Uuid::new_v4(),
            business,
        }
    }

    fn bearer(user: Uuid) -> String {
        format!("Bearer {}", create_jwt(user, SECRET).unwrap())
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn send_request(business: Uuid, user: Uuid, text: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/businesses/{}/messages", business))
            .header(header::AUTHORIZATION, bearer(user))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "message": text }).to_string()))
            .unwrap()
    }

    fn get_request(uri: String, user: Uuid) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(user))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn history_requires_a_token() {
        let f = fixture();
        let request = Request::builder()
            .uri(format!("/businesses/{}/messages", f.business))
            .body(Body::empty())
            .unwrap();

        let (status, _) = call(&f.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sender_type_follows_ownership() {
        let f = fixture();

        let (status, body) = call(&f.app, send_request(f.business, f.customer, "Hola")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sender_type"], "customer");
        assert_eq!(body["sender_id"], f.customer.to_string());

        let (status, body) =
            call(&f.app, send_request(f.business, f.owner, "Hola, en qué ayudo?")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sender_type"], "business");

        let uri = format!("/businesses/{}/messages", f.business);
        let (status, body) = call(&f.app, get_request(uri, f.customer)).await;
        assert_eq!(status, StatusCode::OK);
        let history = body.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["message"], "Hola");
    }

    #[tokio::test]
    async fn blank_and_oversized_messages_are_rejected() {
        let f = fixture();

        let (status, _) = call(&f.app, send_request(f.business, f.customer, "   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let long = "a".repeat(2001);
        let (status, body) = call(&f.app, send_request(f.business, f.customer, &long)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("errors").is_some());
    }

    #[tokio::test]
    async fn unknown_business_is_not_found() {
        let f = fixture();
        let (status, body) = call(&f.app, send_request(Uuid::new_v4(), f.customer, "Hola")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Business not found"));
    }

    #[tokio::test]
    async fn owner_inbox_reports_unread_and_mark_read_clears_it() {
        let f = fixture();
        call(&f.app, send_request(f.business, f.customer, "Hola")).await;

        let (status, body) = call(&f.app, get_request("/inbox".to_string(), f.owner)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_unread"], 1);
        assert_eq!(body["badge"], "1");
        assert_eq!(body["items"][0]["business_name"], "Salón Bella");

        let request = Request::builder()
            .method("POST")
            .uri(format!("/businesses/{}/messages/read", f.business))
            .header(header::AUTHORIZATION, bearer(f.owner))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&f.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);

        let (_, body) = call(&f.app, get_request("/inbox".to_string(), f.owner)).await;
        assert_eq!(body["total_unread"], 0);
        assert!(body["badge"].is_null());
    }

    #[tokio::test]
    async fn customer_inbox_is_empty() {
        let f = fixture();
        call(&f.app, send_request(f.business, f.customer, "Hola")).await;

        let (status, body) = call(&f.app, get_request("/inbox".to_string(), f.customer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 0);
    }
}
