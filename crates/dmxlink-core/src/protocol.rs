//! NDJSON message types spoken with the daemon socket.
//!
//! Every message is a single JSON object followed by a newline. The client
//! sends requests; the daemon answers each request with a response carrying
//! the same `id`, and pushes unsolicited events for inbound DMX frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::{DmxFrame, Universe};

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: u8 = 1;

/// Method name for submitting a frame.
pub const METHOD_SEND_DMX: &str = "send_dmx";

/// Event name for an inbound frame.
pub const EVENT_DMX: &str = "dmx";

/// A request to the daemon.
///
/// ```json
/// {"id": "uuid", "v": 1, "method": "send_dmx", "params": {"universe": 1, "data": [255, 0]}}
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier (echoed in the response)
    pub id: String,
    pub v: u8,
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            v: PROTOCOL_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Request carrying one DMX frame for `universe`.
    pub fn send_dmx(universe: Universe, frame: &DmxFrame) -> Self {
        Self::new(
            METHOD_SEND_DMX,
            serde_json::json!({
                "universe": universe,
                "data": frame.as_slice(),
            }),
        )
    }

    /// Serialize as one NDJSON line, trailing newline included.
    pub fn to_ndjson_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Answer to a [`Request`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// Error payload returned by the daemon.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code (e.g. "UNKNOWN_UNIVERSE")
    pub code: String,
    pub message: String,
}

/// Unsolicited frame pushed by the daemon.
///
/// ```json
/// {"event": "dmx", "universe": 1, "data": [0, 200, 255]}
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct DmxEvent {
    pub event: String,
    pub universe: Universe,
    pub data: DmxFrame,
}

impl DmxEvent {
    pub fn new(universe: Universe, data: DmxFrame) -> Self {
        Self {
            event: EVENT_DMX.to_string(),
            universe,
            data,
        }
    }
}

/// Anything the daemon may write to the socket.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Event(DmxEvent),
    Response(Response),
}

impl Incoming {
    pub fn from_ndjson_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_dmx_request_shape() {
        let frame = DmxFrame::from_slice(&[255, 100, 0, 5]).unwrap();
        let request = Request::send_dmx(1, &frame);
        let line = request.to_ndjson_line().unwrap();
        assert!(line.ends_with('\n'));

        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["v"], 1);
        assert_eq!(value["method"], "send_dmx");
        assert_eq!(value["params"]["universe"], 1);
        assert_eq!(value["params"]["data"], serde_json::json!([255, 100, 0, 5]));
        assert_eq!(value["id"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Request::new("ping", Value::Null);
        let b = Request::new("ping", Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_parse_event() {
        let line = r#"{"event":"dmx","universe":3,"data":[1,2,3]}"#;
        match Incoming::from_ndjson_line(line).unwrap() {
            Incoming::Event(event) => {
                assert_eq!(event.event, EVENT_DMX);
                assert_eq!(event.universe, 3);
                assert_eq!(event.data.as_slice(), &[1, 2, 3]);
            }
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_response() {
        let line = r#"{"id":"abc","ok":false,"error":{"code":"NACK","message":"no such universe"}}"#;
        match Incoming::from_ndjson_line(line).unwrap() {
            Incoming::Response(response) => {
                assert_eq!(response.id, "abc");
                assert!(!response.ok);
                assert_eq!(response.error.unwrap().code, "NACK");
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(Incoming::from_ndjson_line("not json").is_err());
        assert!(Incoming::from_ndjson_line(r#"{"hello":1}"#).is_err());
    }
}
