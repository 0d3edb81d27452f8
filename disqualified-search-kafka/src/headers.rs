//! Record header names and codecs.
//!
//! Integer headers are written as decimal text. Readers also accept the
//! big-endian binary form (4 bytes for the attempt count, 8 bytes for epoch
//! millis) that other producers on the stream use.

/// Number of retry stages a record has already been through.
pub const RETRY_COUNT_HEADER: &str = "CHANGED_RESOURCE_RETRY_COUNT";

/// Epoch millis before which a retried record must not be processed.
pub const RETRY_NOT_BEFORE_HEADER: &str = "CHANGED_RESOURCE_RETRY_NOT_BEFORE";

/// Failure description attached to quarantined records.
pub const FAILURE_REASON_HEADER: &str = "CHANGED_RESOURCE_FAILURE_REASON";

/// Topic a quarantined record was read from.
pub const ORIGINAL_TOPIC_HEADER: &str = "CHANGED_RESOURCE_ORIGINAL_TOPIC";

/// Encode an attempt count as decimal text.
pub fn encode_attempt_count(count: u32) -> Vec<u8> {
    count.to_string().into_bytes()
}

/// Decode an attempt count header value.
///
/// Decimal text takes precedence; otherwise a 4-byte value is read as a
/// big-endian integer. Anything else is `None`.
pub fn decode_attempt_count(value: &[u8]) -> Option<u32> {
    if let Some(count) = parse_decimal::<u32>(value) {
        return Some(count);
    }
    let bytes: [u8; 4] = value.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Encode epoch millis as decimal text.
pub fn encode_epoch_millis(millis: i64) -> Vec<u8> {
    millis.to_string().into_bytes()
}

/// Decode an epoch millis header value (decimal text or 8-byte big-endian).
pub fn decode_epoch_millis(value: &[u8]) -> Option<i64> {
    if let Some(millis) = parse_decimal::<i64>(value) {
        return Some(millis);
    }
    let bytes: [u8; 8] = value.try_into().ok()?;
    Some(i64::from_be_bytes(bytes))
}

fn parse_decimal<T: std::str::FromStr>(value: &[u8]) -> Option<T> {
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(value).ok()?.parse().ok()
}
