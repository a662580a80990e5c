pub mod health;
pub mod inventory;
pub mod orders;
pub mod tables;

use crate::db::Repository;
use crate::domain::{Actor, Role};
use crate::notify::Notifier;
use axum::http::HeaderMap;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, notifier: Arc<Notifier>) -> Self {
        Self { repo, notifier }
    }
}

/// Caller identity from trusted gateway headers. Authentication itself lives
/// upstream; absent headers mean an anonymous staff-level caller.
pub fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let name = headers
        .get("x-staff-name")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let role = headers
        .get("x-staff-role")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Role::parse(v.to_uppercase().as_str()))
        .unwrap_or(Role::Staff);
    Actor::new(name, role)
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/orders", post(orders::create_order).get(orders::list_orders))
        .route("/v1/orders/:id", get(orders::get_order))
        .route("/v1/orders/:id/items", post(orders::replace_items))
        .route("/v1/orders/:id/pay", post(orders::pay_order))
        .route("/v1/orders/:id/cancel", post(orders::cancel_order))
        .route("/v1/orders/:id/status", patch(orders::update_status))
        .route("/v1/orders/:id/invoice", get(orders::get_invoice))
        .route("/v1/orders/:id/send-invoice", post(orders::send_invoice))
        .route("/v1/tables", post(tables::create_table).get(tables::list_tables))
        .route("/v1/tables/:id/sessions", post(tables::seat_table))
        .route("/v1/sessions/active", get(tables::list_active_sessions))
        .route(
            "/v1/ingredients",
            post(inventory::create_ingredient).get(inventory::list_ingredients),
        )
        .route("/v1/ingredients/:id/adjust", post(inventory::adjust_stock))
        .route("/v1/ingredients/:id/ledger", get(inventory::get_ledger))
        .route("/v1/purchases", post(inventory::record_purchase))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_actor_defaults_to_staff() {
        let headers = HeaderMap::new();
        let actor = actor_from_headers(&headers);
        assert_eq!(actor.role, Role::Staff);
        assert!(actor.name.is_none());
    }

    #[test]
    fn test_actor_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-staff-name", HeaderValue::from_static("asha"));
        headers.insert("x-staff-role", HeaderValue::from_static("ADMIN"));
        let actor = actor_from_headers(&headers);
        assert_eq!(actor.name.as_deref(), Some("asha"));
        assert!(actor.is_admin());
    }

    #[test]
    fn test_unknown_role_falls_back_to_staff() {
        let mut headers = HeaderMap::new();
        headers.insert("x-staff-role", HeaderValue::from_static("SUPERUSER"));
        assert_eq!(actor_from_headers(&headers).role, Role::Staff);
    }
}
