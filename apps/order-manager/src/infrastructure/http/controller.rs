//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API over the orchestrator and the order store.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::ports::{EventPublisherPort, ExchangePort, OrderStorePort, StoreError};
use crate::application::services::Orchestrator;
use crate::application::use_cases::{RejectionReason, SubmitRejection};
use crate::domain::order_execution::OrderStatus;
use crate::domain::shared::OrderId;

use super::request::{CreateOrderRequest, ListOrdersQuery};
use super::response::{ErrorResponse, HealthResponse, OrderListResponse};

/// Application state shared across handlers.
pub struct AppState<S, X, P>
where
    S: OrderStorePort + ?Sized,
    X: ExchangePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    /// Submission path and store access.
    pub orchestrator: Arc<Orchestrator<S, X, P>>,
    /// Application version.
    pub version: String,
}

impl<S, X, P> Clone for AppState<S, X, P>
where
    S: OrderStorePort + ?Sized,
    X: ExchangePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<S, X, P>(state: AppState<S, X, P>) -> Router
where
    S: OrderStorePort + ?Sized + 'static,
    X: ExchangePort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/{id}", get(get_order))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<S, X, P>(State(state): State<AppState<S, X, P>>) -> impl IntoResponse
where
    S: OrderStorePort + ?Sized,
    X: ExchangePort + ?Sized,
    P: EventPublisherPort + ?Sized,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Submit an order. 202 once it is stored; execution happens later.
async fn create_order<S, X, P>(
    State(state): State<AppState<S, X, P>>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Response
where
    S: OrderStorePort + ?Sized + 'static,
    X: ExchangePort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error(
                StatusCode::BAD_REQUEST,
                RejectionReason::InvalidOrder.as_str(),
                rejection.body_text(),
            );
        }
    };

    let new_order = match request.into_new_order() {
        Ok(new_order) => new_order,
        Err(message) => {
            return error(
                StatusCode::BAD_REQUEST,
                RejectionReason::InvalidOrder.as_str(),
                message,
            );
        }
    };

    match state.orchestrator.submit_order(new_order).await {
        Ok(order) => (StatusCode::ACCEPTED, Json(order)).into_response(),
        Err(rejection) => rejection_response(&rejection),
    }
}

fn rejection_response(rejection: &SubmitRejection) -> Response {
    let status = match rejection.reason() {
        RejectionReason::InvalidOrder => StatusCode::BAD_REQUEST,
        RejectionReason::DuplicateOrder => StatusCode::CONFLICT,
        RejectionReason::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    error(status, rejection.reason().as_str(), rejection.to_string())
}

/// Fetch one order.
async fn get_order<S, X, P>(
    State(state): State<AppState<S, X, P>>,
    Path(id): Path<String>,
) -> Response
where
    S: OrderStorePort + ?Sized + 'static,
    X: ExchangePort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    match state.orchestrator.store().get_order(&OrderId::new(id)).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => store_error(&e),
    }
}

/// List orders newest first.
async fn list_orders<S, X, P>(
    State(state): State<AppState<S, X, P>>,
    Query(query): Query<ListOrdersQuery>,
) -> Response
where
    S: OrderStorePort + ?Sized + 'static,
    X: ExchangePort + ?Sized + 'static,
    P: EventPublisherPort + ?Sized + 'static,
{
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => match OrderStatus::from_str(raw) {
            Ok(status) => Some(status),
            Err(e) => return error(StatusCode::BAD_REQUEST, "INVALID_QUERY", e.to_string()),
        },
        None => None,
    };

    match state
        .orchestrator
        .store()
        .list_orders(status, query.effective_limit())
        .await
    {
        Ok(orders) => {
            let count = orders.len();
            (StatusCode::OK, Json(OrderListResponse { orders, count })).into_response()
        }
        Err(e) => store_error(&e),
    }
}

fn store_error(e: &StoreError) -> Response {
    match e {
        StoreError::NotFound { .. } => error(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", e.to_string()),
        StoreError::Unavailable { .. } => {
            tracing::warn!(error = %e, "Read path failed");
            error(
                StatusCode::SERVICE_UNAVAILABLE,
                RejectionReason::StorageUnavailable.as_str(),
                "order store unavailable",
            )
        }
        _ => {
            tracing::error!(error = %e, "Read path failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "internal error")
        }
    }
}

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(code, message))).into_response()
}
