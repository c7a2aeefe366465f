// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order-preserving key encoding for the entry tables.
//!
//! ## Key Layout
//!
//! - primary: `owner ‖ client_id`
//! - index:   `owner ‖ timestamp ‖ client_id`
//!
//! Variable-length components are escaped (`0x00` → `0x00 0xFF`) and
//! terminated with `0x00 0x01`. Byte order of the encoded key therefore equals
//! the component-wise order of the logical key, and no owner's keys can fall
//! inside another owner's range.

use std::cmp::Ordering;

use serde_json::Value;

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;

// Type brackets for timestamp values, lowest first.
const TAG_NULL: u8 = 0x00;
const TAG_NUMBER: u8 = 0x01;
const TAG_STRING: u8 = 0x02;
const TAG_COMPOSITE: u8 = 0x03;
const TAG_BOOL: u8 = 0x04;

fn push_component(buf: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == ESCAPE {
            buf.push(ESCAPE);
            buf.push(ESCAPED_ZERO);
        } else {
            buf.push(b);
        }
    }
    buf.push(ESCAPE);
    buf.push(TERMINATOR);
}

/// Map an f64 onto a u64 whose big-endian bytes sort like the float.
fn sortable_f64(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let mapped = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
    mapped.to_be_bytes()
}

/// Encode an optional timestamp value into its sortable form.
pub fn timestamp_key(timestamp: Option<&Value>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    match timestamp {
        None | Some(Value::Null) => buf.push(TAG_NULL),
        Some(Value::Number(n)) => {
            buf.push(TAG_NUMBER);
            buf.extend_from_slice(&sortable_f64(n.as_f64().unwrap_or(0.0)));
        }
        Some(Value::String(s)) => {
            buf.push(TAG_STRING);
            push_component(&mut buf, s.as_bytes());
        }
        Some(other @ (Value::Array(_) | Value::Object(_))) => {
            buf.push(TAG_COMPOSITE);
            push_component(&mut buf, other.to_string().as_bytes());
        }
        Some(Value::Bool(b)) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
    }
    buf
}

/// Compare two timestamps for newest-first listing.
pub fn newest_first(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    timestamp_key(b).cmp(&timestamp_key(a))
}

/// Primary key of the document for `(owner, client_id)`.
pub fn primary_key(owner: &str, client_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + client_id.len() + 4);
    push_component(&mut key, owner.as_bytes());
    push_component(&mut key, client_id.as_bytes());
    key
}

/// Index key placing the entry inside its owner's time-ordered range.
pub fn index_key(owner: &str, timestamp: Option<&Value>, client_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + client_id.len() + 20);
    push_component(&mut key, owner.as_bytes());
    key.extend_from_slice(&timestamp_key(timestamp));
    push_component(&mut key, client_id.as_bytes());
    key
}

/// Half-open byte range `[start, end)` covering every key of `owner`.
pub fn owner_range(owner: &str) -> (Vec<u8>, Vec<u8>) {
    let mut start = Vec::with_capacity(owner.len() + 2);
    push_component(&mut start, owner.as_bytes());

    let mut end = start.clone();
    if let Some(last) = end.last_mut() {
        *last = TERMINATOR + 1;
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn in_range(key: &[u8], range: &(Vec<u8>, Vec<u8>)) -> bool {
        key >= range.0.as_slice() && key < range.1.as_slice()
    }

    #[test]
    fn owner_ranges_do_not_overlap() {
        let alice = owner_range("alice");
        assert!(in_range(&primary_key("alice", "e1"), &alice));
        assert!(in_range(&index_key("alice", Some(&json!(1)), "e1"), &alice));

        // Owners sharing a prefix, or containing NUL bytes, stay out.
        assert!(!in_range(&primary_key("alicex", "e1"), &alice));
        assert!(!in_range(&primary_key("alice\0", "e1"), &alice));
        assert!(!in_range(&primary_key("alic", "e1"), &alice));
    }

    #[test]
    fn numeric_timestamps_sort_numerically() {
        let values = [json!(-10.5), json!(-1), json!(0), json!(2), json!(1e12)];
        for pair in values.windows(2) {
            assert!(
                index_key("u", Some(&pair[0]), "e") < index_key("u", Some(&pair[1]), "e"),
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn string_prefixes_sort_before_extensions() {
        let short = index_key("u", Some(&json!("2024-01-01")), "z");
        let long = index_key("u", Some(&json!("2024-01-01T10:00:00Z")), "a");
        assert!(short < long);
    }

    #[test]
    fn missing_timestamp_sorts_lowest() {
        let missing = index_key("u", None, "e");
        assert_eq!(missing, index_key("u", Some(&Value::Null), "e"));
        assert!(missing < index_key("u", Some(&json!(-1e300)), "e"));
        assert!(index_key("u", Some(&json!(5)), "e") < index_key("u", Some(&json!("0")), "e"));
    }

    #[test]
    fn type_brackets_follow_document_store_order() {
        let ascending = [
            json!(null),
            json!(1e300),
            json!(""),
            json!({"at": 1}),
            json!(false),
            json!(true),
        ];
        for pair in ascending.windows(2) {
            assert!(
                timestamp_key(Some(&pair[0])) < timestamp_key(Some(&pair[1])),
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn equal_timestamps_fall_back_to_client_id() {
        let ts = json!(7);
        let ids = ["a", "ab", "a\0", "b", ""];
        let mut by_key: Vec<&str> = ids.to_vec();
        by_key.sort_by_key(|id| index_key("u", Some(&ts), id));

        let mut by_string: Vec<&str> = ids.to_vec();
        by_string.sort();
        assert_eq!(by_key, by_string);
    }

    #[test]
    fn newest_first_orders_descending() {
        let mut values = vec![json!(1), json!(3), json!(2)];
        values.sort_by(|a, b| newest_first(Some(a), Some(b)));
        assert_eq!(values, vec![json!(3), json!(2), json!(1)]);
    }
}
