//! Response-side types shared by the gateway handlers.

use super::*;

/// Plain JSON error body for non-JSON-RPC endpoints.
#[derive(Debug)]
pub(super) struct GatewayApiError {
    pub(super) status: StatusCode,
    pub(super) message: String,
}

impl GatewayApiError {
    pub(super) fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl IntoResponse for GatewayApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SseFrame {
    Data(String),
    Error(String),
}

impl From<LogStreamEvent> for SseFrame {
    fn from(event: LogStreamEvent) -> Self {
        match event {
            LogStreamEvent::Data(line) => Self::Data(line),
            LogStreamEvent::Error(message) => Self::Error(message),
        }
    }
}

impl SseFrame {
    pub(super) fn into_event(self) -> Event {
        match self {
            Self::Data(line) => Event::default().data(strip_carriage_returns(&line)),
            Self::Error(message) => Event::default()
                .event("error")
                .data(strip_carriage_returns(&message)),
        }
    }
}

// SSE framing rejects bare `\r` inside a field.
fn strip_carriage_returns(text: &str) -> String {
    text.replace('\r', "")
}
