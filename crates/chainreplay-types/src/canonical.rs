use serde_json::Value;

// NOTE: Canonicalization Contract
//
// Every hash in the system (projection hash, case hash, events hash, anomaly
// id, alert id) is computed over the output of `canonical_stringify`. The
// rules are fixed:
// - object keys sorted lexicographically at every depth
// - arrays keep their order
// - integers emitted as plain decimal while within the 53-bit safe range
// - integers outside the safe range emitted as tagged decimal strings
//   ("u64:<dec>" / "i64:<dec>") so consumers on float-based JSON stacks
//   never round them; `canonical_parse` reverses the tag
// - floats use serde_json's shortest round-trip rendering
//
// Canonicalization never fails: inputs are pre-normalized domain values.

/// Largest integer magnitude representable without loss in an IEEE-754 double.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

const U64_TAG: &str = "u64:";
const I64_TAG: &str = "i64:";

/// Serialize a JSON value into its canonical string form.
pub fn canonical_stringify(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Parse a canonical string back into a JSON value, reversing the
/// big-integer tag convention.
pub fn canonical_parse(input: &str) -> serde_json::Result<Value> {
    let value: Value = serde_json::from_str(input)?;
    Ok(untag(value))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_value(v, out);
                }
            }
            out.push('}');
        }
    }
}

fn write_number(n: &serde_json::Number, out: &mut String) {
    if let Some(u) = n.as_u64() {
        if u > MAX_SAFE_INTEGER {
            out.push('"');
            out.push_str(U64_TAG);
            out.push_str(&u.to_string());
            out.push('"');
        } else {
            out.push_str(&u.to_string());
        }
    } else if let Some(i) = n.as_i64() {
        if i < -(MAX_SAFE_INTEGER as i64) {
            out.push('"');
            out.push_str(I64_TAG);
            out.push_str(&i.to_string());
            out.push('"');
        } else {
            out.push_str(&i.to_string());
        }
    } else {
        // Floats: serde_json renders the shortest round-trip decimal.
        out.push_str(&n.to_string());
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn untag(value: Value) -> Value {
    match value {
        Value::String(s) => untag_string(s),
        Value::Array(items) => Value::Array(items.into_iter().map(untag).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, untag(v))).collect())
        }
        other => other,
    }
}

fn untag_string(s: String) -> Value {
    if let Some(rest) = s.strip_prefix(U64_TAG)
        && let Ok(u) = rest.parse::<u64>()
        && u > MAX_SAFE_INTEGER
        && rest == u.to_string()
    {
        return Value::from(u);
    }
    if let Some(rest) = s.strip_prefix(I64_TAG)
        && let Ok(i) = rest.parse::<i64>()
        && i < -(MAX_SAFE_INTEGER as i64)
        && rest == i.to_string()
    {
        return Value::from(i);
    }
    Value::String(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorts_object_keys_at_every_depth() {
        let value = json!({"b": 1, "a": {"z": true, "m": [3, 2, 1]}});
        assert_eq!(
            canonical_stringify(&value),
            r#"{"a":{"m":[3,2,1],"z":true},"b":1}"#
        );
    }

    #[test]
    fn test_arrays_preserve_order() {
        let value = json!([3, 1, 2]);
        assert_eq!(canonical_stringify(&value), "[3,1,2]");
    }

    #[test]
    fn test_safe_integers_stay_numeric() {
        let value = json!({"n": MAX_SAFE_INTEGER});
        assert_eq!(
            canonical_stringify(&value),
            r#"{"n":9007199254740991}"#
        );
    }

    #[test]
    fn test_large_u64_tagged_as_string() {
        let value = json!({"reward": u64::MAX});
        assert_eq!(
            canonical_stringify(&value),
            r#"{"reward":"u64:18446744073709551615"}"#
        );
    }

    #[test]
    fn test_large_negative_i64_tagged_as_string() {
        let value = json!({"delta": i64::MIN});
        assert_eq!(
            canonical_stringify(&value),
            r#"{"delta":"i64:-9223372036854775808"}"#
        );
    }

    #[test]
    fn test_string_escaping() {
        let value = json!("a\"b\\c\nd\u{01}");
        assert_eq!(canonical_stringify(&value), r#""a\"b\\c\nd""#);
    }

    #[test]
    fn test_round_trip_with_tagged_integers() {
        let value = json!({
            "slot": 42u64,
            "reward": u64::MAX,
            "delta": i64::MIN,
            "nested": [{"capabilities": 9_007_199_254_740_993u64}],
            "label": "plain string",
        });
        let text = canonical_stringify(&value);
        let parsed = canonical_parse(&text).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let value = json!({"b": [1, {"y": null, "x": false}], "a": 1.5});
        let once = canonical_stringify(&value);
        let twice = canonical_stringify(&canonical_parse(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_untag_rejects_non_canonical_forms() {
        // Leading zeros and in-range values are not untagged.
        let parsed = canonical_parse(r#"["u64:007","u64:5"]"#).unwrap();
        assert_eq!(parsed, json!(["u64:007", "u64:5"]));
    }
}
