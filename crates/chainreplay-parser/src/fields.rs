use chainreplay_types::{decode_bytes32, to_base58, to_hex32};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Typed accessor over a decoded event payload object.
///
/// Every 32-byte identifier goes through here exactly once; call sites never
/// re-encode. Integer fields accept both JSON numbers and decimal strings
/// (RPC decoders disagree on how to ship 64-bit values).
pub struct FieldReader<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> FieldReader<'a> {
    pub fn new(payload: &'a Value) -> Result<Self> {
        payload
            .as_object()
            .map(|map| Self { map })
            .ok_or_else(|| Error::InvalidBytes("event payload is not an object".to_string()))
    }

    fn require(&self, name: &str) -> Result<&'a Value> {
        match self.map.get(name) {
            None | Some(Value::Null) => Err(Error::MissingField(name.to_string())),
            Some(value) => Ok(value),
        }
    }

    fn bytes32(&self, name: &str, value: &Value) -> Result<[u8; 32]> {
        if let Value::Array(items) = value
            && items.len() != 32
        {
            return Err(Error::WrongArity {
                field: name.to_string(),
                expected: 32,
                actual: items.len(),
            });
        }
        decode_bytes32(value).ok_or_else(|| Error::InvalidBytes(name.to_string()))
    }

    /// 32-byte opaque identifier, normalized to lowercase hex.
    pub fn hex_id(&self, name: &str) -> Result<String> {
        let value = self.require(name)?;
        Ok(to_hex32(&self.bytes32(name, value)?))
    }

    pub fn opt_hex_id(&self, name: &str) -> Result<Option<String>> {
        match self.map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(to_hex32(&self.bytes32(name, value)?))),
        }
    }

    /// 32-byte account address, normalized to base58.
    pub fn pubkey(&self, name: &str) -> Result<String> {
        let value = self.require(name)?;
        Ok(to_base58(&self.bytes32(name, value)?))
    }

    pub fn opt_pubkey(&self, name: &str) -> Result<Option<String>> {
        match self.map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(to_base58(&self.bytes32(name, value)?))),
        }
    }

    pub fn u64(&self, name: &str) -> Result<u64> {
        let value = self.require(name)?;
        parse_u64(name, value)
    }

    pub fn opt_u64(&self, name: &str) -> Result<Option<u64>> {
        match self.map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => parse_u64(name, value).map(Some),
        }
    }

    pub fn i64(&self, name: &str) -> Result<i64> {
        let value = self.require(name)?;
        parse_i64(name, value)
    }

    pub fn opt_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => parse_i64(name, value).map(Some),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| Error::InvalidBytes(name.to_string()))
    }

    pub fn opt_string(&self, name: &str) -> Result<Option<String>> {
        match self.map.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Error::InvalidBytes(name.to_string())),
        }
    }
}

fn parse_u64(name: &str, value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::InvalidBytes(name.to_string())),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| Error::InvalidBytes(name.to_string())),
        _ => Err(Error::InvalidBytes(name.to_string())),
    }
}

fn parse_i64(name: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::InvalidBytes(name.to_string())),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| Error::InvalidBytes(name.to_string())),
        _ => Err(Error::InvalidBytes(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_field() {
        let payload = json!({"other": 1});
        let reader = FieldReader::new(&payload).unwrap();
        assert_eq!(
            reader.hex_id("task_id"),
            Err(Error::MissingField("task_id".to_string()))
        );
    }

    #[test]
    fn test_wrong_arity() {
        let payload = json!({"task_id": vec![1u8; 30]});
        let reader = FieldReader::new(&payload).unwrap();
        assert_eq!(
            reader.hex_id("task_id"),
            Err(Error::WrongArity {
                field: "task_id".to_string(),
                expected: 32,
                actual: 30,
            })
        );
    }

    #[test]
    fn test_u64_accepts_decimal_string() {
        let payload = json!({"reward": "18446744073709551615"});
        let reader = FieldReader::new(&payload).unwrap();
        assert_eq!(reader.u64("reward").unwrap(), u64::MAX);
    }

    #[test]
    fn test_pubkey_normalizes_byte_array() {
        let payload = json!({"creator": vec![1u8; 32]});
        let reader = FieldReader::new(&payload).unwrap();
        assert_eq!(
            reader.pubkey("creator").unwrap(),
            chainreplay_types::to_base58(&[1u8; 32])
        );
    }
}
