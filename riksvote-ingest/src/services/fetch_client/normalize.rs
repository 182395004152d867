//! Shape normalization for the upstream JSON
//!
//! The upstream API returns a collection field as an array when it holds
//! several items, as a bare object when it holds exactly one, and omits it
//! (or sends `null`) when it holds none. Everything downstream of the fetch
//! client only ever sees a `Vec`.
//!
//! Scalars are loosely typed as well: numbers usually arrive as strings and
//! absent values as empty strings.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Follow `path` through nested objects
pub fn value_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

/// Normalize a collection field into a list
///
/// Array → its elements, object → one-element list, absent/`null` → empty.
/// Any other scalar is not a collection and also yields an empty list.
pub fn normalize_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
        Some(object @ Value::Object(_)) => vec![object.clone()],
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::warn!(value = %other, "Expected collection, found scalar; treating as empty");
            Vec::new()
        }
    }
}

/// Text value of a scalar field, if any
///
/// Strings are trimmed; numbers are rendered; empty strings count as absent.
pub fn text_at(root: &Value, path: &[&str]) -> Option<String> {
    match value_at(root, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode each item, skipping (and logging) the ones that do not fit `T`
///
/// Returns the decoded records and the number of malformed items skipped.
pub fn decode_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> (Vec<T>, usize) {
    let mut decoded = Vec::with_capacity(items.len());
    let mut malformed = 0;

    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(record) => decoded.push(record),
            Err(e) => {
                malformed += 1;
                tracing::warn!(record = what, error = %e, "Skipping malformed record");
            }
        }
    }

    (decoded, malformed)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// `deserialize_with` helper accepting a single object, an array or null
///
/// Use together with `#[serde(default)]` so an absent field also becomes an
/// empty list.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
    })
}

/// `deserialize_with` helper for integers sent as numbers or strings
///
/// Empty or unparseable strings become `None`.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// `deserialize_with` helper for text fields that may be null, empty or numeric
///
/// Empty strings become `None`; surrounding whitespace is trimmed.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Holder {
        #[serde(default, deserialize_with = "one_or_many")]
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
        #[serde(default, deserialize_with = "lenient_i64")]
        n: Option<i64>,
    }

    #[test]
    fn test_normalize_list_shapes() {
        let single = json!({"id": "a"});
        let array = json!([{"id": "a"}]);

        assert_eq!(normalize_list(Some(&single)), normalize_list(Some(&array)));
        assert_eq!(normalize_list(Some(&json!([{"id": "a"}, {"id": "b"}]))).len(), 2);
        assert!(normalize_list(Some(&Value::Null)).is_empty());
        assert!(normalize_list(None).is_empty());
        assert!(normalize_list(Some(&json!("0"))).is_empty());
    }

    #[test]
    fn test_value_at_nested_path() {
        let doc = json!({"dokumentlista": {"dokument": [{"dok_id": "X"}], "@sidor": "3"}});
        assert!(value_at(&doc, &["dokumentlista", "dokument"]).unwrap().is_array());
        assert!(value_at(&doc, &["dokumentlista", "missing"]).is_none());
        assert_eq!(text_at(&doc, &["dokumentlista", "@sidor"]).as_deref(), Some("3"));
    }

    #[test]
    fn test_one_or_many_decodes_identically() {
        let single: Holder = serde_json::from_value(json!({"items": {"id": "a", "n": "4"}})).unwrap();
        let array: Holder = serde_json::from_value(json!({"items": [{"id": "a", "n": 4}]})).unwrap();
        let absent: Holder = serde_json::from_value(json!({})).unwrap();
        let null: Holder = serde_json::from_value(json!({"items": null})).unwrap();

        assert_eq!(single, array);
        assert_eq!(single.items[0].n, Some(4));
        assert!(absent.items.is_empty());
        assert!(null.items.is_empty());
    }

    #[test]
    fn test_lenient_i64() {
        let empty: Item = serde_json::from_value(json!({"id": "a", "n": ""})).unwrap();
        let junk: Item = serde_json::from_value(json!({"id": "a", "n": "n/a"})).unwrap();
        let missing: Item = serde_json::from_value(json!({"id": "a"})).unwrap();

        assert_eq!(empty.n, None);
        assert_eq!(junk.n, None);
        assert_eq!(missing.n, None);
    }

    #[test]
    fn test_decode_items_skips_malformed() {
        let items = vec![json!({"id": "a"}), json!({"no_id": true}), json!({"id": "c"})];
        let (decoded, malformed): (Vec<Item>, usize) = decode_items(items, "item");
        assert_eq!(decoded.len(), 2);
        assert_eq!(malformed, 1);
    }
}
