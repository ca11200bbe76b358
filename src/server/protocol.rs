//! Wire envelopes: newline-delimited JSON, one request and one response
//! per connection.
//!
//! The encoding is stable within a daemon version; clients match on the
//! `status` field and the machine-checkable `code` carried by errors.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A command envelope sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Request {
    pub fn new<I, S>(command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// A request with no arguments.
    pub fn bare(command: &str) -> Self {
        Self {
            command: command.to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// The daemon's answer to one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Response {
    pub fn success(payload: serde_json::Value) -> Self {
        Self {
            status: Status::Success,
            payload: Some(payload),
            error_message: None,
            code: None,
        }
    }

    pub fn failure(err: &Error) -> Self {
        Self {
            status: Status::Error,
            payload: None,
            error_message: Some(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Parse one request line. Anything unparseable is a `DecodeError` the
/// server answers with before closing the connection.
pub fn decode_request(line: &str) -> Result<Request> {
    serde_json::from_str(line.trim()).map_err(|e| Error::Decode(format!("bad request envelope: {e}")))
}

/// Encode an envelope as one wire line.
pub fn encode<T: Serialize>(value: &T) -> String {
    let mut line = serde_json::to_string(value).expect("envelope serializes to JSON");
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let req = Request::new("pause", ["https://cnn.com"]);
        let decoded = decode_request(&encode(&req)).unwrap();
        assert_eq!(decoded.command, "pause");
        assert_eq!(decoded.args, vec!["https://cnn.com"]);
    }

    #[test]
    fn test_request_args_default_to_empty() {
        let decoded = decode_request(r#"{"command":"list"}"#).unwrap();
        assert_eq!(decoded.command, "list");
        assert!(decoded.args.is_empty());
    }

    #[test]
    fn test_malformed_request_is_decode_error() {
        let err = decode_request("{not json").unwrap_err();
        assert_eq!(err.code(), "DecodeError");
    }

    #[test]
    fn test_error_response_wire_shape() {
        let resp = Response::failure(&Error::JobNotFound("https://cnn.com/".into()));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "JobNotFound");
        assert!(json["errorMessage"].as_str().unwrap().contains("cnn.com"));
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_success_response_wire_shape() {
        let resp = Response::success(serde_json::json!({ "count": 12 }));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["payload"]["count"], 12);
        assert!(json.get("errorMessage").is_none());
    }
}
