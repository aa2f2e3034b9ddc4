//! REST surface and webhook transport. Thin: every handler maps straight
//! onto a ledger operation and back into the shared wire shapes.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use ulid::Ulid;

use crate::assistant;
use crate::ledger::{Ledger, LedgerError};
use crate::model::*;
use crate::observability;

pub fn router(ledger: Arc<Ledger>) -> Router {
    Router::new()
        .route(
            "/api/facilities",
            get(list_facilities).put(upsert_facility),
        )
        .route("/api/facilities/{id}/deactivate", post(deactivate_facility))
        .route("/api/availability", get(check_availability))
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/api/assistant/webhook", post(assistant_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}

// ── Error mapping ────────────────────────────────────────────────

/// Ledger errors mapped onto REST status codes. Business failures keep their
/// message; journal failures are logged and flattened to a generic 500.
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            LedgerError::FacilityNotFound(_) | LedgerError::BookingNotFound(_) => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            LedgerError::SlotTaken { .. } => (
                StatusCode::CONFLICT,
                "This time slot is already booked".to_string(),
            ),
            LedgerError::Validation(_) | LedgerError::LimitExceeded(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            LedgerError::Journal(e) => {
                tracing::error!("journal write failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Parse a request body by hand so malformed input is a 400, not a 422.
fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| LedgerError::Validation(format!("malformed request body: {e}")).into())
}

// ── Facilities ───────────────────────────────────────────────────

async fn list_facilities(State(ledger): State<Arc<Ledger>>) -> Json<Value> {
    let started = Instant::now();
    let facilities = ledger.list_active_facilities().await;
    observability::record_operation("get_facilities", true, started);
    Json(json!({ "facilities": assistant::facility_listing(&facilities) }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertFacilityRequest {
    facility_id: String,
    name: String,
    address: String,
    city: String,
    province: String,
    postal_code: String,
    phone: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

async fn upsert_facility(
    State(ledger): State<Arc<Ledger>>,
    Json(body): Json<Value>,
) -> Result<Json<Facility>, ApiError> {
    let req: UpsertFacilityRequest = parse_body(body)?;

    // Preserve the original creation timestamp on updates
    let now = now_ms();
    let created_at = ledger
        .find_facility(&req.facility_id)
        .await
        .map_or(now, |f| f.created_at);

    let facility = Facility {
        facility_id: req.facility_id,
        name: req.name,
        address: req.address,
        city: req.city,
        province: req.province,
        postal_code: req.postal_code,
        phone: req.phone,
        is_active: req.is_active,
        created_at,
        updated_at: now,
    };
    ledger.upsert_facility(facility.clone()).await?;
    Ok(Json(facility))
}

async fn deactivate_facility(
    State(ledger): State<Arc<Ledger>>,
    Path(id): Path<String>,
) -> Result<Json<Facility>, ApiError> {
    Ok(Json(ledger.deactivate_facility(&id).await?))
}

// ── Availability ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityQuery {
    date: NaiveDate,
    facility_id: Option<String>,
}

async fn check_availability(
    State(ledger): State<Arc<Ledger>>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<Value> {
    let started = Instant::now();
    let availability = ledger
        .resolve_availability(query.date, query.facility_id.as_deref())
        .await;
    observability::record_operation("check_availability", true, started);
    Json(json!({
        "date": query.date,
        "availability": assistant::availability_listing(&availability),
    }))
}

// ── Bookings ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingsQuery {
    date: Option<NaiveDate>,
    facility_id: Option<String>,
}

async fn list_bookings(
    State(ledger): State<Arc<Ledger>>,
    Query(query): Query<BookingsQuery>,
) -> Json<Value> {
    let bookings = ledger
        .list_bookings(query.date, query.facility_id.as_deref())
        .await;
    Json(json!({ "bookings": bookings }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    facility_id: String,
    date: NaiveDate,
    time_slot: Slot,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    booking_type: Option<String>,
    duration: Option<u32>,
    notes: Option<String>,
}

async fn create_booking(
    State(ledger): State<Arc<Ledger>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let started = Instant::now();
    let req: CreateBookingRequest = parse_body(body)?;

    let result = ledger
        .book(BookingRequest {
            facility_id: req.facility_id,
            date: req.date,
            slot: req.time_slot,
            customer: Customer {
                name: req.customer_name,
                phone: req.customer_phone,
                email: req.customer_email,
            },
            booking_type: BookingType::parse_or_default(req.booking_type.as_deref()),
            duration_min: req.duration,
            notes: req.notes,
        })
        .await;
    observability::record_operation("book_appointment", result.is_ok(), started);

    let booking = result?;
    Ok((StatusCode::CREATED, Json(json!({ "booking": booking }))))
}

async fn cancel_booking(
    State(ledger): State<Arc<Ledger>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let booking_id: Ulid = id
        .parse()
        .map_err(|_| LedgerError::Validation(format!("invalid booking id: {id}")))?;

    let result = ledger.cancel(booking_id).await;
    observability::record_operation("cancel_appointment", result.is_ok(), started);

    let booking = result?;
    Ok(Json(json!({
        "success": true,
        "message": "Your booking has been cancelled successfully.",
        "booking": booking,
    })))
}

// ── Assistant webhook ────────────────────────────────────────────

async fn assistant_webhook(
    State(ledger): State<Arc<Ledger>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let payload: assistant::WebhookPayload = parse_body(body)?;
    let response = assistant::handle(&ledger, payload).await?;
    Ok(Json(response))
}
