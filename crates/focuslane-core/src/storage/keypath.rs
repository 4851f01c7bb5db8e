//! Dot-path access into serde-serializable settings.
//!
//! `get("storage.session_retention")` walks the JSON projection of a value.
//! `set` parses the new text according to the type of the value already at
//! that path, so keys cannot be invented and types cannot drift.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ConfigError;

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return None;
    }

    let mut current = root;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn parse_like(existing: &Value, key: &str, value: &str) -> Result<Value, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    match existing {
        Value::Bool(_) => value
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|e| invalid(e.to_string())),
        Value::Number(_) => {
            if let Ok(n) = value.parse::<u64>() {
                Ok(Value::Number(n.into()))
            } else if let Ok(n) = value.parse::<f64>() {
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))
            } else {
                Err(invalid(format!("cannot parse '{value}' as number")))
            }
        }
        Value::Object(_) | Value::Array(_) => {
            serde_json::from_str(value).map_err(|e| invalid(e.to_string()))
        }
        _ => Ok(Value::String(value.into())),
    }
}

fn assign(root: &mut Value, key: &str, value: &str) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_string());
    let mut parts = key.split('.').peekable();
    if parts.peek().map_or(true, |p| p.is_empty()) {
        return Err(unknown());
    }

    let mut current = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = parse_like(existing, key, value)?;
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }
        current = current.get_mut(part).ok_or_else(unknown)?;
    }

    Err(unknown())
}

/// Read a value as display text. Strings come back unquoted.
pub fn get<T: Serialize>(target: &T, key: &str) -> Option<String> {
    let json = serde_json::to_value(target).ok()?;
    match lookup(&json, key)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Return a copy of `target` with `key` set to `value`.
///
/// # Errors
/// Returns an error if the key is unknown or the value does not parse as the
/// existing value's type.
pub fn set<T>(target: &T, key: &str, value: &str) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let mut json = serde_json::to_value(target).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    assign(&mut json, key, value)?;
    serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Every leaf key with its display value, in lexical order.
pub fn list<T: Serialize>(target: &T) -> Vec<(String, String)> {
    fn walk(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    walk(&key, v, out);
                }
            }
            Value::String(s) => out.push((prefix.to_string(), s.clone())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    let mut out = Vec::new();
    if let Ok(json) = serde_json::to_value(target) {
        walk("", &json, &mut out);
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Inner {
        flag: bool,
        count: u32,
        name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Outer {
        inner: Inner,
        top: u32,
    }

    fn sample() -> Outer {
        Outer {
            inner: Inner {
                flag: true,
                count: 3,
                name: "x".into(),
            },
            top: 9,
        }
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let s = sample();
        assert_eq!(get(&s, "inner.flag").as_deref(), Some("true"));
        assert_eq!(get(&s, "inner.name").as_deref(), Some("x"));
        assert_eq!(get(&s, "top").as_deref(), Some("9"));
        assert!(get(&s, "inner.missing").is_none());
        assert!(get(&s, "").is_none());
    }

    #[test]
    fn set_updates_nested_values_by_type() {
        let s = sample();
        let s = set(&s, "inner.flag", "false").unwrap();
        let s = set(&s, "inner.count", "12").unwrap();
        let s = set(&s, "inner.name", "renamed").unwrap();
        assert_eq!(
            s.inner,
            Inner {
                flag: false,
                count: 12,
                name: "renamed".into()
            }
        );
    }

    #[test]
    fn set_rejects_unknown_key() {
        let err = set(&sample(), "inner.nope", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let err = set(&sample(), "inner.flag", "not_a_bool").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn set_rejects_value_that_does_not_fit_target_type() {
        // Parses as a JSON number but not as u32.
        let err = set(&sample(), "top", "-4").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn list_flattens_leaves() {
        let keys: Vec<String> = list(&sample()).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["inner.count", "inner.flag", "inner.name", "top"]);
    }
}
