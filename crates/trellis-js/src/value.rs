//! JS host values
//!
//! [`Value`] is the "any JS value" of the host API. Reads are lenient:
//! unknown properties, unknown methods and out-of-range indices resolve to
//! `Undefined` instead of failing. The strict accessor [`Value::node`] is the
//! one place that fails fast.

use std::fmt;

use crate::environment::Environment;
use crate::{Func, HostError, NodeHandle, host};

/// Result of `typeof`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Undefined,
    Boolean,
    Number,
    String,
    Object,
    Function,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Null => "null",
            Type::Undefined => "undefined",
            Type::Boolean => "boolean",
            Type::Number => "number",
            Type::String => "string",
            Type::Object => "object",
            Type::Function => "function",
        };
        f.write_str(name)
    }
}

/// Insertion-ordered string to string map. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct StringMap {
    entries: Vec<(String, String)>,
}

impl StringMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite in place. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl PartialEq for StringMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for StringMap {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = StringMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Any JS-like value
#[derive(Debug, Clone, Default)]
pub enum Value {
    Null,
    #[default]
    Undefined,
    Bool(bool),
    Number(f64),
    Str(String),
    Node(NodeHandle),
    NodeList(Vec<NodeHandle>),
    Array(Vec<Value>),
    StringMap(StringMap),
    Func(Func),
    /// The window of an environment
    Window(Environment),
    /// `document.implementation` of an environment
    DocumentImplementation(Environment),
}

/// Shared `Undefined` for missing arguments
pub(crate) static UNDEFINED: Value = Value::Undefined;

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    pub fn undefined() -> Self {
        Value::Undefined
    }

    // === Type checks ===

    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Undefined => Type::Undefined,
            Value::Bool(_) => Type::Boolean,
            Value::Number(_) => Type::Number,
            Value::Str(_) => Type::String,
            Value::Func(_) => Type::Function,
            Value::Node(_)
            | Value::NodeList(_)
            | Value::Array(_)
            | Value::StringMap(_)
            | Value::Window(_)
            | Value::DocumentImplementation(_) => Type::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Value::Node(_))
    }

    // === Coercions ===

    /// ToNumber. Unparsable strings and objects give NaN.
    pub fn float(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.string()),
            _ => f64::NAN,
        }
    }

    /// ToNumber truncated towards zero; NaN gives 0
    pub fn int(&self) -> i64 {
        let n = self.float();
        if n.is_nan() { 0 } else { n.trunc() as i64 }
    }

    /// ToString
    pub fn string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::Str(s) => s.clone(),
            Value::Node(handle) => host::object_name(handle),
            Value::NodeList(_) => "[object NodeList]".to_string(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::Null | Value::Undefined => String::new(),
                    other => other.string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::StringMap(_) => "[object Object]".to_string(),
            Value::Func(_) => "function () { [native code] }".to_string(),
            Value::Window(_) => "[object Window]".to_string(),
            Value::DocumentImplementation(_) => "[object DOMImplementation]".to_string(),
        }
    }

    /// ToBoolean
    pub fn bool(&self) -> bool {
        self.truthy()
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null | Value::Undefined => false,
            Value::Window(_) | Value::DocumentImplementation(_) => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Node(_)
            | Value::NodeList(_)
            | Value::Array(_)
            | Value::StringMap(_)
            | Value::Func(_) => true,
        }
    }

    /// Strict node accessor. The caller guarantees the value is node-backed.
    ///
    /// # Panics
    /// If the value is not a node (including `Null` and `Undefined`).
    pub fn node(&self) -> NodeHandle {
        match self {
            Value::Node(handle) => handle.clone(),
            other => panic!(
                "Value::node: expected a node-backed value, got {}",
                other.type_name()
            ),
        }
    }

    pub fn try_node(&self) -> Option<NodeHandle> {
        match self {
            Value::Node(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Func> {
        match self {
            Value::Func(f) => Some(f),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Node(_) => "node",
            Value::NodeList(_) => "node list",
            Value::Array(_) => "array",
            Value::StringMap(_) => "string map",
            Value::Func(_) => "function",
            Value::Window(_) => "window",
            Value::DocumentImplementation(_) => "DOMImplementation",
        }
    }

    /// Strict equality (`===`). NaN is unequal to itself; nodes, functions
    /// and stubs compare by identity; arrays and maps by contents.
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::NodeList(a), Value::NodeList(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equal(y))
            }
            (Value::StringMap(a), Value::StringMap(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => a == b,
            (Value::Window(a), Value::Window(b))
            | (Value::DocumentImplementation(a), Value::DocumentImplementation(b)) => a.same(b),
            _ => false,
        }
    }

    // === Properties ===

    /// Property read. Never panics.
    pub fn get(&self, prop: &str) -> Value {
        match self {
            Value::Node(handle) => host::get(handle, prop),
            Value::Str(_) | Value::Array(_) | Value::NodeList(_) if prop == "length" => {
                Value::Number(self.length() as f64)
            }
            Value::StringMap(map) => map.get(prop).map_or(Value::Undefined, Value::from),
            Value::Window(env) => env.window_get(prop),
            _ => Value::Undefined,
        }
    }

    /// Property write. Unknown properties are ignored.
    pub fn set(&mut self, prop: &str, value: Value) {
        match self {
            Value::Node(handle) => host::set(handle, prop, &value),
            Value::StringMap(map) => {
                map.insert(prop, value.string());
            }
            _ => tracing::trace!(prop, "ignoring property write on a primitive"),
        }
    }

    /// `delete value[prop]`
    pub fn delete(&mut self, prop: &str) {
        match self {
            Value::Node(handle) => host::delete(handle, prop),
            Value::StringMap(map) => {
                map.remove(prop);
            }
            _ => {}
        }
    }

    // === Calls ===

    /// Method call. Unknown methods return `Undefined`.
    ///
    /// # Panics
    /// When the DOM rejects the call (hierarchy violation, node of another
    /// document, non-node argument to a structural method), like a thrown
    /// exception. Use [`Value::try_call`] to handle these.
    pub fn call(&self, method: &str, args: &[Value]) -> Value {
        self.try_call(method, args)
            .unwrap_or_else(|err| panic!("{method}: {err}"))
    }

    /// Method call returning DOM errors instead of panicking
    pub fn try_call(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match self {
            Value::Node(handle) => host::call(handle, method, args),
            Value::DocumentImplementation(env) => Ok(env.implementation_call(method, args)),
            Value::Func(f) if method == "call" => {
                let this = args.first().unwrap_or(&UNDEFINED);
                Ok(f.call(this, args.get(1..).unwrap_or_default()))
            }
            _ => {
                tracing::warn!(method, on = self.type_name(), "unknown method");
                Ok(Value::Undefined)
            }
        }
    }

    /// Call a function value with `this = undefined`
    pub fn invoke(&self, args: &[Value]) -> Value {
        match self {
            Value::Func(f) => f.call(&Value::Undefined, args),
            _ => Value::Undefined,
        }
    }

    /// `value instanceof ctor` for the window's interface constructors
    pub fn instance_of(&self, ctor: &Value) -> bool {
        let Some(interface) = ctor.as_func().and_then(Func::as_interface) else {
            return false;
        };
        match self {
            Value::Node(handle) => handle
                .with(|doc| doc.tree().kind(handle.id()))
                .is_some_and(|kind| interface.matches(kind)),
            _ => false,
        }
    }

    // === Array-like access ===

    pub fn length(&self) -> usize {
        match self {
            Value::NodeList(nodes) => nodes.len(),
            Value::Array(items) => items.len(),
            Value::Str(s) => s.chars().count(),
            _ => 0,
        }
    }

    pub fn index(&self, i: usize) -> Value {
        match self {
            Value::NodeList(nodes) => nodes.get(i).cloned().map_or(Value::Undefined, Value::Node),
            Value::Array(items) => items.get(i).cloned().unwrap_or_default(),
            Value::Str(s) => s
                .chars()
                .nth(i)
                .map_or(Value::Undefined, |c| Value::Str(c.to_string())),
            _ => Value::Undefined,
        }
    }

    /// Indexed write. Out-of-range writes and writes to strings are ignored.
    pub fn set_index(&mut self, i: usize, value: Value) {
        match self {
            Value::Array(items) => {
                if let Some(slot) = items.get_mut(i) {
                    *slot = value;
                }
            }
            Value::NodeList(nodes) => {
                if let (Some(slot), Value::Node(handle)) = (nodes.get_mut(i), value) {
                    *slot = handle;
                }
            }
            _ => {}
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string())
    }
}

// === Conversions ===

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NodeHandle> for Value {
    fn from(handle: NodeHandle) -> Self {
        Value::Node(handle)
    }
}

impl From<Option<NodeHandle>> for Value {
    /// `None` becomes `Null`, as DOM accessors return
    fn from(handle: Option<NodeHandle>) -> Self {
        handle.map_or(Value::Null, Value::Node)
    }
}

impl From<Func> for Value {
    fn from(f: Func) -> Self {
        Value::Func(f)
    }
}

impl From<StringMap> for Value {
    fn from(map: StringMap) -> Self {
        Value::StringMap(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// JS `Number.prototype.toString()` for the common cases
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // `{:e}` prints `1e21`; positive exponents carry an explicit sign
        let formatted = format!("{n:e}");
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        }
    } else {
        format!("{n}")
    }
}

/// JS `Number(string)`
fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    // Rust accepts "inf" and "nan" spellings that JS does not
    if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    t.parse().unwrap_or(f64::NAN)
}
