use serde_json::Value;

/// Render a 32-byte account-style identifier as a base58 public key.
pub fn to_base58(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

/// Render a 32-byte opaque identifier (task/dispute/agent IDs, hashes) as
/// lowercase hex.
pub fn to_hex32(bytes: &[u8; 32]) -> String {
    hex::encode(bytes)
}

/// Decode a 32-byte identifier from any of the shapes the RPC decoder
/// produces: a 32-element byte array, a 64-char hex string, or a base58
/// string.
pub fn decode_bytes32(value: &Value) -> Option<[u8; 32]> {
    match value {
        Value::Array(items) => {
            if items.len() != 32 {
                return None;
            }
            let mut out = [0u8; 32];
            for (i, item) in items.iter().enumerate() {
                let byte = item.as_u64()?;
                if byte > 255 {
                    return None;
                }
                out[i] = byte as u8;
            }
            Some(out)
        }
        Value::String(s) => decode_bytes32_str(s),
        _ => None,
    }
}

fn decode_bytes32_str(s: &str) -> Option<[u8; 32]> {
    if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        let decoded = hex::decode(s).ok()?;
        return decoded.try_into().ok();
    }
    let decoded = bs58::decode(s).into_vec().ok()?;
    decoded.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_byte_array_decodes() {
        let value = json!(vec![7u8; 32]);
        assert_eq!(decode_bytes32(&value), Some([7u8; 32]));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let value = json!(vec![7u8; 31]);
        assert_eq!(decode_bytes32(&value), None);
    }

    #[test]
    fn test_out_of_range_byte_rejected() {
        let mut items: Vec<Value> = vec![json!(0); 32];
        items[5] = json!(256);
        assert_eq!(decode_bytes32(&Value::Array(items)), None);
    }

    #[test]
    fn test_hex_round_trip() {
        let bytes = [0xabu8; 32];
        let decoded = decode_bytes32(&json!(to_hex32(&bytes)));
        assert_eq!(decoded, Some(bytes));
    }

    #[test]
    fn test_base58_round_trip() {
        let bytes = [1u8; 32];
        let decoded = decode_bytes32(&json!(to_base58(&bytes)));
        assert_eq!(decoded, Some(bytes));
    }
}
