//! JSON payload helpers for the variable-length part of messages.

use crate::error::{Result, ServiceError};
use bytes::{BufMut, BytesMut};
use serde::{Serialize, de::DeserializeOwned};

/// Appends `message` to `reply` and returns the number of bytes written.
pub fn serialize_to_response<T: Serialize>(
    reply: &mut BytesMut,
    message: &T,
) -> Result<u32> {
    let encoded = serde_json::to_vec(message)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    let length = u32::try_from(encoded.len()).map_err(|_| {
        ServiceError::Internal(format!(
            "serialized message of {} bytes does not fit a u32 length",
            encoded.len()
        ))
    })?;
    reply.put_slice(&encoded);
    Ok(length)
}

/// Decodes `length` bytes of `payload` starting at `offset`.
pub fn parse_from_request<T: DeserializeOwned>(
    payload: &[u8],
    offset: usize,
    length: u32,
) -> Result<T> {
    let end = offset.saturating_add(length as usize);
    let bytes = payload.get(offset..end).ok_or(ServiceError::MessageTooShort {
        needed: end,
        available: payload.len(),
    })?;
    serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::MalformedPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_serialize_appends_after_existing_bytes() -> anyhow::Result<()> {
        let mut reply = BytesMut::from(&b"hdr"[..]);
        let length = serialize_to_response(&mut reply, &vec![1, 2, 3])?;

        assert_eq!(length, 7);
        assert_eq!(&reply[..], b"hdr[1,2,3]");
        Ok(())
    }

    #[test]
    fn test_parse_at_offset() -> anyhow::Result<()> {
        let payload = b"xx{\"a\":1}trailing";
        let parsed: BTreeMap<String, u32> = parse_from_request(payload, 2, 7)?;

        assert_eq!(parsed.get("a"), Some(&1));
        Ok(())
    }

    #[test]
    fn test_parse_past_end() {
        let err =
            parse_from_request::<Vec<u32>>(b"xx[1]", 2, 10).unwrap_err();

        assert!(matches!(
            err,
            ServiceError::MessageTooShort {
                needed: 12,
                available: 5
            }
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_from_request::<Vec<u32>>(b"[1,", 0, 3).unwrap_err();
        assert!(matches!(err, ServiceError::MalformedPayload(_)));
    }
}
