use serde_json::{Value, json};

/// Terminal record payload closing every stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One unit of the wire event stream shared by the relay and the
/// conversation client. Each frame travels as a single
/// `data: <payload>\n\n` record.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// One incremental fragment of assistant text
    Delta(String),
    /// The service failed in a way the client should surface
    Error(String),
    /// No further frames follow
    Done,
}

impl Frame {
    /// Payload carried by this frame's `data:` record. Delta and
    /// Error payloads are JSON, so embedded newlines are escaped and
    /// a frame never spans multiple record lines.
    pub fn to_data(&self) -> String {
        match self {
            Frame::Delta(text) => json!({ "delta": text }).to_string(),
            Frame::Error(message) => json!({ "error": true, "message": message }).to_string(),
            Frame::Done => DONE_SENTINEL.to_string(),
        }
    }

    /// Parse one record payload. Returns None for anything that is
    /// not a meaningful frame so callers can skip keep-alives and
    /// malformed records without aborting the stream.
    pub fn parse(payload: &str) -> Option<Frame> {
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return Some(Frame::Done);
        }

        let value: Value = serde_json::from_str(payload).ok()?;
        if is_truthy(value.get("error")) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Some(Frame::Error(message));
        }

        value
            .get("delta")
            .and_then(Value::as_str)
            .map(|delta| Frame::Delta(delta.to_string()))
    }
}

// The error field follows JavaScript truthiness on the wire: absent,
// null, false, 0 and "" all mean no error
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
