use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};
use uuid::Uuid;

const TELEMETRY_TARGET: &str = "flowlens::events::telemetry";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestLifecycle {
    Start,
    Success,
    Failure,
    Canceled,
}

impl fmt::Display for RequestLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "request_start"),
            Self::Success => write!(f, "request_success"),
            Self::Failure => write!(f, "request_failure"),
            Self::Canceled => write!(f, "request_canceled"),
        }
    }
}

/// One lifecycle record of a fetch slot request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTelemetry {
    pub correlation_id: String,
    pub slot: String,
    pub lifecycle: RequestLifecycle,
    pub error_reason: Option<String>,
    pub duration_ms: Option<u128>,
}

impl RequestTelemetry {
    fn new(slot: &str, correlation_id: &str, lifecycle: RequestLifecycle) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            slot: slot.to_string(),
            lifecycle,
            error_reason: None,
            duration_ms: None,
        }
    }

    fn now_unix_ms() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn request_start(slot: &str, correlation_id: &str) -> RequestTelemetry {
    let telemetry = RequestTelemetry::new(slot, correlation_id, RequestLifecycle::Start);
    info!(
        target: TELEMETRY_TARGET,
        slot = %telemetry.slot,
        correlation_id = %telemetry.correlation_id,
        lifecycle = %telemetry.lifecycle,
        timestamp_ms = RequestTelemetry::now_unix_ms(),
        "request_start"
    );
    telemetry
}

pub fn request_success(
    slot: &str,
    correlation_id: &str,
    duration_ms: Option<u128>,
) -> RequestTelemetry {
    let mut telemetry = RequestTelemetry::new(slot, correlation_id, RequestLifecycle::Success);
    telemetry.duration_ms = duration_ms;
    info!(
        target: TELEMETRY_TARGET,
        slot = %telemetry.slot,
        correlation_id = %telemetry.correlation_id,
        lifecycle = %telemetry.lifecycle,
        duration_ms = ?telemetry.duration_ms,
        timestamp_ms = RequestTelemetry::now_unix_ms(),
        "request_success"
    );
    telemetry
}

pub fn request_failure(
    slot: &str,
    correlation_id: &str,
    reason: Option<String>,
) -> RequestTelemetry {
    let mut telemetry = RequestTelemetry::new(slot, correlation_id, RequestLifecycle::Failure);
    telemetry.error_reason = reason;
    let error_reason = telemetry.error_reason.as_deref().unwrap_or("unclassified");

    error!(
        target: TELEMETRY_TARGET,
        slot = %telemetry.slot,
        correlation_id = %telemetry.correlation_id,
        lifecycle = %telemetry.lifecycle,
        error = %error_reason,
        timestamp_ms = RequestTelemetry::now_unix_ms(),
        "request_failure"
    );

    telemetry
}

/// Superseded or aborted requests are expected, so this stays at debug.
pub fn request_canceled(slot: &str, correlation_id: &str) -> RequestTelemetry {
    let telemetry = RequestTelemetry::new(slot, correlation_id, RequestLifecycle::Canceled);
    debug!(
        target: TELEMETRY_TARGET,
        slot = %telemetry.slot,
        correlation_id = %telemetry.correlation_id,
        lifecycle = %telemetry.lifecycle,
        timestamp_ms = RequestTelemetry::now_unix_ms(),
        "request_canceled"
    );
    telemetry
}
