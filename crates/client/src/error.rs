// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error taxonomy shared by the decoder core and the HTTP client.

use thiserror::Error;

/// Errors raised while turning explorer responses into typed records.
///
/// Binary and projection errors are produced deep inside the Micheline codec
/// without knowing which column they belong to; the row decoder attaches the
/// column name with [`DecodeError::in_column`] before surfacing them.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed field '{column}' (value {value}): {reason}")]
    MalformedField {
        column: String,
        value: String,
        reason: String,
    },

    #[error("invalid {kind} '{value}'{}: {reason}", column_suffix(.column))]
    InvalidEncoding {
        /// Empty for values decoded outside a table row.
        column: String,
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("binary decode error in '{column}' at offset {offset}: {reason}")]
    BinaryDecode {
        column: String,
        offset: usize,
        reason: String,
    },

    #[error("value projection error in '{column}' at {path}: {reason}")]
    ValueProjection {
        column: String,
        path: String,
        reason: String,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed row {index}: {reason}")]
    MalformedRow { index: usize, reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(column: &str, value: &serde_json::Value, reason: impl Into<String>) -> Self {
        DecodeError::MalformedField {
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(kind: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeError::InvalidEncoding {
            column: String::new(),
            kind,
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn binary(offset: usize, reason: impl Into<String>) -> Self {
        DecodeError::BinaryDecode {
            column: String::new(),
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn projection(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeError::ValueProjection {
            column: String::new(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach the originating column to encoding, binary and projection errors.
    pub fn in_column(self, name: &str) -> Self {
        match self {
            DecodeError::InvalidEncoding {
                kind, value, reason, ..
            } => DecodeError::InvalidEncoding {
                column: name.to_string(),
                kind,
                value,
                reason,
            },
            DecodeError::BinaryDecode { offset, reason, .. } => DecodeError::BinaryDecode {
                column: name.to_string(),
                offset,
                reason,
            },
            DecodeError::ValueProjection { path, reason, .. } => DecodeError::ValueProjection {
                column: name.to_string(),
                path,
                reason,
            },
            other => other,
        }
    }
}

fn column_suffix(column: &str) -> String {
    if column.is_empty() {
        String::new()
    } else {
        format!(" in '{column}'")
    }
}

/// Errors surfaced by [`crate::Client`] and contract resolvers.
///
/// Transport and cancellation errors are never folded into [`DecodeError`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to encode query: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_column_sets_context() {
        let err = DecodeError::binary(4, "unexpected end of input").in_column("storage");
        match err {
            DecodeError::BinaryDecode { column, offset, .. } => {
                assert_eq!(column, "storage");
                assert_eq!(offset, 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_in_column_keeps_other_kinds() {
        let err = DecodeError::malformed("height", &serde_json::json!("x"), "expected number")
            .in_column("other");
        assert!(matches!(err, DecodeError::MalformedField { ref column, .. } if column == "height"));
        assert!(err.to_string().contains("\"x\""));
    }

    #[test]
    fn test_in_column_names_invalid_encoding() {
        let err = DecodeError::invalid("address", "tz1notvalid", "bad checksum");
        assert_eq!(err.to_string(), "invalid address 'tz1notvalid': bad checksum");

        let err = err.in_column("sender");
        assert!(matches!(err, DecodeError::InvalidEncoding { ref column, .. } if column == "sender"));
        assert_eq!(err.to_string(), "invalid address 'tz1notvalid' in 'sender': bad checksum");
    }
}
