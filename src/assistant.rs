//! Assistant tool-call surface: the voice assistant posts a batch of named
//! function invocations; each is dispatched independently and answered under
//! its caller-supplied correlation id. Business failures come back as
//! speakable `{success: false, error}` results — only infrastructure
//! failures propagate as errors.

use std::time::Instant;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use ulid::Ulid;

use crate::ledger::{Ledger, LedgerError};
use crate::limits::MAX_TOOL_CALLS_PER_BATCH;
use crate::model::*;
use crate::observability;

// ── Webhook payload ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "toolCallList", default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

// ── Operation arguments ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityArgs {
    date: NaiveDate,
    facility_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookArgs {
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelArgs {
    booking_id: Ulid,
}

/// Tool-call arguments arrive inline or as a JSON-encoded string, depending
/// on the assistant host. Accept both.
fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T, String> {
    let parsed = match arguments {
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| format!("invalid arguments: {e}"))
}

// ── Dispatch ─────────────────────────────────────────────────────

/// Handle one webhook payload. Anything that isn't a tool-call batch is
/// acknowledged and ignored — the conversational state machine lives in the
/// assistant, not here.
pub async fn handle(ledger: &Ledger, payload: WebhookPayload) -> Result<Value, LedgerError> {
    let Some(message) = payload.message else {
        return Ok(json!({ "status": "ok" }));
    };
    if message.kind != "tool-calls" {
        return Ok(json!({ "status": "ok" }));
    }
    if message.tool_calls.len() > MAX_TOOL_CALLS_PER_BATCH {
        return Err(LedgerError::LimitExceeded("too many tool calls in batch"));
    }

    let mut results = Vec::with_capacity(message.tool_calls.len());
    for call in &message.tool_calls {
        let label = observability::operation_label(&call.function.name);
        let started = Instant::now();
        let result = dispatch(ledger, call).await;
        observability::record_operation(label, result.is_ok(), started);
        results.push(json!({
            "toolCallId": call.id,
            "result": result?,
        }));
    }
    Ok(json!({ "results": results }))
}

/// Dispatch one tool call by name. An unknown name answers that call alone;
/// the rest of the batch proceeds.
async fn dispatch(ledger: &Ledger, call: &ToolCall) -> Result<Value, LedgerError> {
    match call.function.name.as_str() {
        "getFacilities" => get_facilities(ledger).await,
        "checkAvailability" => check_availability(ledger, &call.function.arguments).await,
        "bookAppointment" => book_appointment(ledger, &call.function.arguments).await,
        "cancelAppointment" => cancel_appointment(ledger, &call.function.arguments).await,
        _ => Ok(json!({ "error": "Unknown function" })),
    }
}

// ── Operations ───────────────────────────────────────────────────

/// Facilities numbered in name order, addresses flattened for playback.
/// Shared by the REST surface.
pub(crate) fn facility_listing(facilities: &[Facility]) -> Vec<Value> {
    facilities
        .iter()
        .enumerate()
        .map(|(i, f)| {
            json!({
                "number": i + 1,
                "id": f.facility_id,
                "name": f.name,
                "address": f.display_address(),
            })
        })
        .collect()
}

/// Resolver output in the wire shape both surfaces share.
pub(crate) fn availability_listing(availability: &[FacilityAvailability]) -> Vec<Value> {
    availability
        .iter()
        .map(|a| {
            json!({
                "facility": {
                    "id": a.facility.facility_id,
                    "name": a.facility.name,
                    "address": a.facility.display_address(),
                },
                "availableSlots": a.available_slots,
            })
        })
        .collect()
}

async fn get_facilities(ledger: &Ledger) -> Result<Value, LedgerError> {
    let facilities = ledger.list_active_facilities().await;
    Ok(json!({ "facilities": facility_listing(&facilities) }))
}

async fn check_availability(ledger: &Ledger, arguments: &Value) -> Result<Value, LedgerError> {
    let args: AvailabilityArgs = match parse_args(arguments) {
        Ok(args) => args,
        Err(e) => return Ok(json!({ "error": e })),
    };
    let availability = ledger
        .resolve_availability(args.date, args.facility_id.as_deref())
        .await;
    Ok(json!({
        "date": args.date,
        "availability": availability_listing(&availability),
    }))
}

fn confirmation_message(facility_name: &str, booking: &Booking) -> String {
    format!(
        "Your ice time at {} on {} at {} has been confirmed. See you at the rink!",
        facility_name, booking.date, booking.slot
    )
}

async fn book_appointment(ledger: &Ledger, arguments: &Value) -> Result<Value, LedgerError> {
    let args: BookArgs = match parse_args(arguments) {
        Ok(args) => args,
        Err(e) => return Ok(json!({ "success": false, "error": e })),
    };

    let request = BookingRequest {
        facility_id: args.facility_id,
        date: args.date,
        slot: args.time_slot,
        customer: Customer {
            name: args.customer_name,
            phone: args.customer_phone,
            email: args.customer_email,
        },
        booking_type: BookingType::parse_or_default(args.booking_type.as_deref()),
        duration_min: args.duration,
        notes: args.notes,
    };

    match ledger.book(request).await {
        Ok(booking) => {
            let facility_name = ledger
                .find_facility(&booking.facility_id)
                .await
                .map(|f| f.name)
                .unwrap_or_else(|| booking.facility_id.clone());
            Ok(json!({
                "success": true,
                "booking": {
                    "id": booking.id,
                    "facilityName": facility_name,
                    "date": booking.date,
                    "timeSlot": booking.slot,
                    "confirmationMessage": confirmation_message(&facility_name, &booking),
                },
            }))
        }
        Err(LedgerError::SlotTaken { .. }) => Ok(json!({
            "success": false,
            "error": "This time slot is no longer available",
        })),
        Err(LedgerError::FacilityNotFound(_)) => Ok(json!({
            "success": false,
            "error": "Facility not found",
        })),
        Err(e @ LedgerError::Journal(_)) => Err(e),
        Err(e) => Ok(json!({ "success": false, "error": e.to_string() })),
    }
}

async fn cancel_appointment(ledger: &Ledger, arguments: &Value) -> Result<Value, LedgerError> {
    let args: CancelArgs = match parse_args(arguments) {
        Ok(args) => args,
        Err(e) => return Ok(json!({ "success": false, "error": e })),
    };

    match ledger.cancel(args.booking_id).await {
        Ok(_) => Ok(json!({
            "success": true,
            "message": "Your booking has been cancelled successfully.",
        })),
        Err(LedgerError::BookingNotFound(_) | LedgerError::FacilityNotFound(_)) => {
            Ok(json!({ "success": false, "error": "Booking not found" }))
        }
        Err(e @ LedgerError::Journal(_)) => Err(e),
        Err(e) => Ok(json!({ "success": false, "error": e.to_string() })),
    }
}
