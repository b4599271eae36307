use std::{collections::BTreeMap, time::Duration};

use serde_json::Value;

/// Key under which the flattened data map carries the compact JSON of the whole tree.
pub const RESERVED_DATA_KEY: &str = "data";

/// Flattens a data tree into the string map the v1 API requires.
///
/// Objects contribute dotted keys (`a.b`), arrays contribute index suffixes
/// (`a.c.0`). Null leaves keep their key with an empty string value. The full
/// tree is also serialized under [`RESERVED_DATA_KEY`], overwriting any
/// flattened entry with that name.
pub fn flatten_data(data: &Value) -> serde_json::Result<BTreeMap<String, String>> {
    let mut output = BTreeMap::new();

    match data {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_value(key, value, &mut output);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(&index.to_string(), item, &mut output);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }

    output.insert(RESERVED_DATA_KEY.to_string(), serde_json::to_string(data)?);

    Ok(output)
}

fn flatten_value(key: &str, value: &Value, output: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (child, nested) in map {
                flatten_value(&format!("{}.{}", key, child), nested, output);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(&format!("{}.{}", key, index), item, output);
            }
        }
        Value::String(s) => {
            output.insert(key.to_string(), s.clone());
        }
        Value::Number(n) => {
            output.insert(key.to_string(), n.to_string());
        }
        Value::Bool(b) => {
            output.insert(key.to_string(), b.to_string());
        }
        // The v1 data map has no null; keep the key so receivers can see it was sent.
        Value::Null => {
            output.insert(key.to_string(), String::new());
        }
    }
}

/// Parses a Retry-After value.
///
/// Accepts plain seconds (`"120"`), humantime expressions (`"2m 30s"`,
/// `"300ms"`) and fractional number/unit pairs (`"1.5s"`, `"0.25h"`; units
/// `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`). Values that overflow are rejected.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(seconds) = input.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    humantime::parse_duration(input)
        .ok()
        .or_else(|| parse_fractional_duration(input))
}

fn parse_fractional_duration(input: &str) -> Option<Duration> {
    let mut rest = input;
    let mut total_nanos: u64 = 0;

    while !rest.is_empty() {
        let whole_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (whole, tail) = rest.split_at(whole_len);

        let (fraction, tail) = match tail.strip_prefix('.') {
            Some(after) => {
                let len = after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len());
                after.split_at(len)
            }
            None => ("", tail),
        };
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let nanos_per_unit: u64 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return None,
        };

        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut nanos = whole.checked_mul(nanos_per_unit)?;

        let mut scale = nanos_per_unit;
        for digit in fraction.bytes() {
            scale /= 10;
            nanos = nanos.checked_add(u64::from(digit - b'0') * scale)?;
        }

        total_nanos = total_nanos.checked_add(nanos)?;
        rest = tail;
    }

    Some(Duration::from_nanos(total_nanos))
}
