//! Entry layout and its byte encoding.

use crate::error::{CacheError, CacheResult};
use crate::generation::Generation;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The unit stored under one composite key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Caller-supplied value.
    pub payload: serde_json::Value,

    /// Generation of the entry's group at write time.
    pub generation: Generation,

    /// Unix seconds until which a stale entry is served without electing
    /// another regenerator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_until: Option<i64>,
}

impl Entry {
    /// Create an entry with no stale marker.
    pub fn new(payload: serde_json::Value, generation: Generation) -> Self {
        Self {
            payload,
            generation,
            stale_until: None,
        }
    }

    /// Stamp a serializable value.
    pub fn from_value<T: Serialize + ?Sized>(value: &T, generation: Generation) -> CacheResult<Self> {
        let payload = serde_json::to_value(value)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(Self::new(payload, generation))
    }

    /// Deserialize the payload into a typed value.
    pub fn payload_as<T: DeserializeOwned>(&self) -> CacheResult<T> {
        T::deserialize(&self.payload).map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    /// Consume the entry, deserializing the payload.
    pub fn into_payload<T: DeserializeOwned>(self) -> CacheResult<T> {
        serde_json::from_value(self.payload).map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    /// Whether a stale marker is set and `now` is still inside it.
    pub fn in_grace_window(&self, now: i64) -> bool {
        self.stale_until.is_some_and(|until| now <= until)
    }
}

/// JSON codec between [`Entry`] and store bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryCodec;

impl EntryCodec {
    /// Encode an entry.
    pub fn encode(entry: &Entry) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(entry).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decode an entry. Documents without a valid `generation` are rejected.
    pub fn decode(bytes: &[u8]) -> CacheResult<Entry> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_omits_unset_marker() {
        let entry = Entry::new(json!({"name": "Ann"}), Generation::new(4));
        let bytes = EntryCodec::encode(&entry).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(!text.contains("stale_until"));
        assert_eq!(EntryCodec::decode(&bytes).unwrap(), entry);
    }

    #[test]
    fn test_decode_keeps_marker() {
        let entry = EntryCodec::decode(br#"{"payload":[1,2],"generation":2,"stale_until":99}"#)
            .unwrap();
        assert_eq!(entry.generation, Generation::new(2));
        assert_eq!(entry.stale_until, Some(99));
    }

    #[test]
    fn test_missing_generation_is_rejected() {
        let err = EntryCodec::decode(br#"{"payload":"x"}"#).unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[test]
    fn test_foreign_data_is_rejected() {
        assert!(EntryCodec::decode(b"not json").is_err());
        assert!(EntryCodec::decode(br#"{"payload":"x","generation":-1}"#).is_err());
        assert!(EntryCodec::decode(br#"{"payload":"x","generation":null}"#).is_err());
        assert!(EntryCodec::decode(br#""plain string""#).is_err());
    }

    #[test]
    fn test_typed_payload() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct User {
            name: String,
        }

        let entry = Entry::from_value(&User { name: "Ann".into() }, Generation::INITIAL).unwrap();
        let user: User = entry.payload_as().unwrap();
        assert_eq!(user.name, "Ann");
        assert!(entry.payload_as::<Vec<u8>>().is_err());
    }

    #[test]
    fn test_grace_window() {
        let mut entry = Entry::new(json!(1), Generation::INITIAL);
        assert!(!entry.in_grace_window(100));

        entry.stale_until = Some(130);
        assert!(entry.in_grace_window(100));
        assert!(entry.in_grace_window(130));
        assert!(!entry.in_grace_window(131));
    }
}
