//! Wire encoding for operations.
//!
//! Every operation travels as a `{name, data}` envelope:
//!
//! | name     | data                              |
//! |----------|-----------------------------------|
//! | `new`    | full document content (string)    |
//! | `add`    | `{line, pos, text}`               |
//! | `delete` | `{line, pos, count}`              |
//! | `cursor` | `{x, y}`                          |
//!
//! Log-backed transports store a [`Record`] per line, which pairs the
//! envelope with the originating client id.

use serde::{Deserialize, Serialize};

use crate::document::Operation;

/// One stored log entry: an operation and the participant that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub client_id: String,
    pub op: Operation,
}

/// Encode an operation as a JSON envelope.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode(op: &Operation) -> serde_json::Result<String> {
    serde_json::to_string(op)
}

/// Decode a JSON envelope.
///
/// # Errors
/// Returns an error for unknown names or payloads that do not match the
/// schema for their name.
pub fn decode(payload: &str) -> serde_json::Result<Operation> {
    serde_json::from_str(payload)
}

/// Encode a log record as a single JSON line (without the trailing newline).
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode_record(client_id: &str, op: &Operation) -> serde_json::Result<String> {
    serde_json::to_string(&RecordRef { client_id, op })
}

/// Decode one JSON log line.
///
/// # Errors
/// Returns an error if the line is not a valid record.
pub fn decode_record(line: &str) -> serde_json::Result<Record> {
    serde_json::from_str(line.trim_end())
}

#[derive(Serialize)]
struct RecordRef<'a> {
    client_id: &'a str,
    op: &'a Operation,
}
