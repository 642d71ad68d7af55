//! Provider error classification
//!
//! The provider embeds short error tokens ("E01", "S02", ...) anywhere in
//! free-text messages. Classification walks a fixed pattern list in priority
//! order and the first match wins; A01/A02/A03 deliberately collapse to one
//! key-invalid code. No match passes the upstream text through verbatim as
//! UNKNOWN.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LookupError, LookupErrorCode};

struct ErrorPattern {
    regex: Regex,
    code: LookupErrorCode,
    message: &'static str,
    status: u16,
}

static ERROR_PATTERNS: Lazy<Vec<ErrorPattern>> = Lazy::new(|| {
    vec![
        ErrorPattern {
            regex: Regex::new("(?i)E01").unwrap(),
            code: LookupErrorCode::E01InvalidImei,
            message: "IMEI failed validation. Please double-check and rescan.",
            status: 400,
        },
        ErrorPattern {
            regex: Regex::new("(?i)E02").unwrap(),
            code: LookupErrorCode::E02InvalidSn,
            message: "IMEI/SN is wrong or unsupported by this service.",
            status: 400,
        },
        ErrorPattern {
            regex: Regex::new("(?i)R01").unwrap(),
            code: LookupErrorCode::R01NotFound,
            message: "Device not found. Try another service or confirm the IMEI.",
            status: 400,
        },
        ErrorPattern {
            regex: Regex::new("(?i)B01").unwrap(),
            code: LookupErrorCode::B01LowBalance,
            message: "Provider balance is low. Please top up before retrying.",
            status: 402,
        },
        ErrorPattern {
            regex: Regex::new("(?i)S01").unwrap(),
            code: LookupErrorCode::S01ServiceInvalid,
            message: "The requested service ID is invalid or doesn't exist.",
            status: 400,
        },
        ErrorPattern {
            regex: Regex::new("(?i)S02").unwrap(),
            code: LookupErrorCode::S02ServiceIncompatible,
            message:
                "This service doesn't support this device model. Try a different service or device.",
            status: 400,
        },
        ErrorPattern {
            regex: Regex::new("(?i)A0[123]").unwrap(),
            code: LookupErrorCode::A01ApiKeyInvalid,
            message: "The provider API key is invalid or disabled.",
            status: 401,
        },
    ]
});

/// Map an opaque upstream message to the closed error code set.
///
/// Never fails; an unrecognized message becomes UNKNOWN with the original
/// text as both the message and the raw message.
pub fn classify_provider_message(raw_message: &str) -> LookupError {
    for pattern in ERROR_PATTERNS.iter() {
        if pattern.regex.is_match(raw_message) {
            return LookupError::new(pattern.code, pattern.message)
                .with_status(pattern.status)
                .with_raw_message(raw_message);
        }
    }

    LookupError::new(LookupErrorCode::Unknown, raw_message).with_raw_message(raw_message)
}
