//! Desired/current state comparison.
//!
//! Only keys present in the desired state are looked at; whatever else the
//! server reports is never considered a difference.

use serde_json::{Map, Value};

/// True when `current` satisfies `desired`.
///
/// `ignore` only applies to the top-level keys of a mapping.
pub fn compare_state(desired: &Value, current: &Value, ignore: &[&str]) -> bool {
    match (desired, current) {
        (Value::Array(desired), Value::Array(current)) => {
            desired.len() == current.len()
                && desired
                    .iter()
                    .zip(current)
                    .all(|(desired, current)| compare_state(desired, current, &[]))
        }
        (Value::Array(_), _) => false,
        (Value::Object(desired), Value::Object(current)) => desired
            .iter()
            .filter(|(key, _)| !ignore.contains(&key.as_str()))
            .all(|(key, value)| {
                current
                    .get(key)
                    .is_some_and(|current| compare_state(value, current, &[]))
            }),
        (Value::Object(_), _) => false,
        // module arguments arrive as strings where the server answers with integers
        (Value::String(desired), Value::Number(current)) if current.is_i64() || current.is_u64() => {
            *desired == current.to_string()
        }
        (Value::Number(desired), Value::Number(current)) => numbers_equal(desired, current),
        _ => desired == current,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    a.as_f64() == b.as_f64()
}

/// Duration strings such as `1h30m`, `90s` or `45` as whole seconds.
///
/// The parser splits on `h`, then `m`, then `s`; a value that does not
/// survive that (`30m1h`, `1d`, `true`) is returned unchanged so the caller
/// falls back to plain equality.
pub fn to_seconds(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return value.clone(),
    };
    match parse_duration(&text) {
        Some(seconds) => Value::from(seconds),
        None => value.clone(),
    }
}

fn parse_duration(text: &str) -> Option<i64> {
    let mut rest = text.to_string();
    let mut seconds = 0i64;

    for (unit, factor) in [('h', 3600), ('m', 60)] {
        if rest.contains(unit) {
            let mut parts = rest.split(unit);
            let head = parts.next().unwrap_or_default();
            seconds += parse_int(head)?.checked_mul(factor)?;
            rest = parts.collect();
        }
    }

    if !rest.is_empty() {
        let head = rest.split('s').next().unwrap_or_default();
        seconds += parse_int(head)?;
    }
    Some(seconds)
}

fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Desired keys whose value differs from the current state, in desired order.
pub fn get_keys_updated(desired: &Map<String, Value>, current: &Map<String, Value>, ignore: &[&str]) -> Vec<String> {
    desired
        .iter()
        .filter(|(key, _)| !ignore.contains(&key.as_str()))
        .filter(|(key, new_value)| match current.get(key.as_str()) {
            None => true,
            Some(old_value) if key.contains("ttl") => to_seconds(old_value) != to_seconds(new_value),
            Some(old_value) => !compare_state(new_value, old_value, &[]),
        })
        .map(|(key, _)| key.clone())
        .collect()
}

pub fn is_state_changed(desired: &Map<String, Value>, current: &Map<String, Value>) -> bool {
    !get_keys_updated(desired, current, &[]).is_empty()
}
