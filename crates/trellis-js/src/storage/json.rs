//! JSON form of values
//!
//! Null, booleans, numbers, strings, arrays and string maps have a JSON form.
//! Non-finite numbers become `null`. Objects read back as string maps, with
//! non-string members kept as JSON text.

use serde_json::{Map, Number};

use super::StorageError;
use crate::{StringMap, Value};

/// Convert to JSON
pub fn to_json(value: &Value) -> Result<serde_json::Value, StorageError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number(*n),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(
            items.iter().map(to_json).collect::<Result<_, _>>()?,
        ),
        Value::StringMap(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect::<Map<_, _>>(),
        ),
        Value::Undefined => return Err(StorageError::Unserializable("undefined")),
        Value::Node(_) | Value::NodeList(_) => return Err(StorageError::Unserializable("node")),
        Value::Func(_) => return Err(StorageError::Unserializable("function")),
        Value::Window(_) | Value::DocumentImplementation(_) => {
            return Err(StorageError::Unserializable("host object"));
        }
    })
}

fn number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Convert from JSON
pub fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(members) => Value::StringMap(
            members
                .into_iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect::<StringMap>(),
        ),
    }
}

/// `JSON.stringify`
pub fn stringify(value: &Value) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&to_json(value)?)?)
}

/// `JSON.parse`
pub fn parse(text: &str) -> Result<Value, StorageError> {
    Ok(from_json(serde_json::from_str(text)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify() {
        let value = Value::Array(vec![
            Value::from(1),
            Value::from(1.5),
            Value::Null,
            Value::from("a\"b"),
            Value::Number(f64::INFINITY),
        ]);
        assert_eq!(stringify(&value).unwrap(), r#"[1,1.5,null,"a\"b",null]"#);
    }

    #[test]
    fn test_map_round_trip() {
        let map: StringMap = [("z", "1"), ("a", "2")].into_iter().collect();
        let text = stringify(&Value::StringMap(map.clone())).unwrap();
        assert_eq!(parse(&text).unwrap(), Value::StringMap(map));
    }

    #[test]
    fn test_object_members_kept_as_json_text() {
        let value = parse(r#"{"n":3,"nested":{"x":true}}"#).unwrap();
        assert_eq!(value.get("n").string(), "3");
        assert_eq!(value.get("nested").string(), r#"{"x":true}"#);
    }

    #[test]
    fn test_unserializable() {
        assert!(matches!(
            stringify(&Value::Undefined),
            Err(StorageError::Unserializable("undefined"))
        ));
        let nested = Value::Array(vec![crate::Environment::new().document()]);
        assert!(matches!(stringify(&nested), Err(StorageError::Unserializable("node"))));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(parse("{oops"), Err(StorageError::Json(_))));
    }
}
