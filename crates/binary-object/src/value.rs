//! [`Value`]: the value tree accepted by the encoder and produced by the
//! decoder.

use std::any::Any;
use std::fmt;
use std::mem;
use std::slice;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;

/// A caller-defined domain object carried inside [`Value::Custom`].
///
/// Implemented automatically for every `'static` type that is `Debug`,
/// `PartialEq`, `Send` and `Sync`, so any such struct can be wrapped with
/// [`Value::custom`] and recovered with [`Value::downcast_ref`].
pub trait CustomValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    /// Equality across the type-erased boundary; values of different
    /// concrete types are never equal.
    fn dyn_eq(&self, other: &dyn CustomValue) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T> CustomValue for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn CustomValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Every shape the codec knows how to put on the wire.
///
/// Dropping, cloning and comparing walk the tree with a heap stack, so a
/// decoded tree of any depth is safe to use.
#[derive(Debug)]
pub enum Value {
    /// Absent value. Distinct from `Null` on the wire.
    Undefined,
    Null,
    Bool(bool),
    /// Double-precision number. NaN has no wire form and is written as
    /// `Null`, so it decodes as `Value::Null`.
    Number(f64),
    Str(String),
    /// Opaque bytes, preserved exactly.
    Bytes(Vec<u8>),
    /// Milliseconds since the Unix epoch.
    Timestamp(f64),
    Array(Vec<Value>),
    /// String-keyed entries in insertion order.
    Object(Vec<(String, Value)>),
    /// A domain object handled by a [`TypeProcessor`](crate::TypeProcessor).
    Custom(Arc<dyn CustomValue>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some(pair) = pending.pop() {
            match pair {
                (Value::Array(a), Value::Array(b)) => {
                    if a.len() != b.len() {
                        return false;
                    }
                    pending.extend(a.iter().zip(b));
                }
                (Value::Object(a), Value::Object(b)) => {
                    if a.len() != b.len() {
                        return false;
                    }
                    for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                        if ka != kb {
                            return false;
                        }
                        pending.push((va, vb));
                    }
                }
                (a, b) => {
                    if !a.scalar_eq(b) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        rebuild(self, Value::shallow_clone, Value::Array, Value::Object)
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = match self {
            Value::Array(items) if !items.is_empty() => mem::take(items),
            Value::Object(entries) if !entries.is_empty() => {
                entries.drain(..).map(|(_, v)| v).collect()
            }
            _ => return,
        };
        // Children are detached before each value drops, so no drop nests.
        while let Some(mut value) = pending.pop() {
            match &mut value {
                Value::Array(items) => pending.append(items),
                Value::Object(entries) => pending.extend(entries.drain(..).map(|(_, v)| v)),
                _ => {}
            }
        }
    }
}

/// A container whose children are still being rebuilt.
enum RebuildFrame<'v, T> {
    Array {
        out: Vec<T>,
        rest: slice::Iter<'v, Value>,
    },
    Object {
        out: Vec<(String, T)>,
        rest: slice::Iter<'v, (String, Value)>,
        key: String,
    },
}

impl<'v, T> RebuildFrame<'v, T> {
    fn open(value: &'v Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(RebuildFrame::Array {
                out: Vec::with_capacity(items.len()),
                rest: items.iter(),
            }),
            Value::Object(entries) => Some(RebuildFrame::Object {
                out: Vec::with_capacity(entries.len()),
                rest: entries.iter(),
                key: String::new(),
            }),
            _ => None,
        }
    }

    fn next_child(&mut self) -> Option<&'v Value> {
        match self {
            RebuildFrame::Array { rest, .. } => rest.next(),
            RebuildFrame::Object { rest, key, .. } => {
                let (k, v) = rest.next()?;
                key.clone_from(k);
                Some(v)
            }
        }
    }

    fn push(&mut self, value: T) {
        match self {
            RebuildFrame::Array { out, .. } => out.push(value),
            RebuildFrame::Object { out, key, .. } => out.push((mem::take(key), value)),
        }
    }
}

/// Maps a tree bottom-up with an explicit stack. `scalar` handles every
/// non-container; `array` and `object` assemble finished children.
fn rebuild<T>(
    root: &Value,
    scalar: impl Fn(&Value) -> T,
    array: impl Fn(Vec<T>) -> T,
    object: impl Fn(Vec<(String, T)>) -> T,
) -> T {
    let close = |frame: RebuildFrame<'_, T>| match frame {
        RebuildFrame::Array { out, .. } => array(out),
        RebuildFrame::Object { out, .. } => object(out),
    };
    let Some(first) = RebuildFrame::open(root) else {
        return scalar(root);
    };
    let mut stack = vec![first];
    while let Some(frame) = stack.last_mut() {
        match frame.next_child() {
            Some(child) => match RebuildFrame::open(child) {
                Some(inner) => stack.push(inner),
                None => frame.push(scalar(child)),
            },
            None => {
                let Some(done) = stack.pop() else { break };
                let done = close(done);
                match stack.last_mut() {
                    Some(parent) => parent.push(done),
                    None => return done,
                }
            }
        }
    }
    unreachable!("the root frame returns before the stack empties")
}

impl Value {
    // Containers on either side compare unequal; callers expand them first.
    fn scalar_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => (**a).dyn_eq(&**b),
            _ => false,
        }
    }

    // Containers come back empty.
    fn shallow_clone(&self) -> Value {
        match self {
            Value::Undefined => Value::Undefined,
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::Str(s) => Value::Str(s.clone()),
            Value::Bytes(b) => Value::Bytes(b.clone()),
            Value::Timestamp(ms) => Value::Timestamp(*ms),
            Value::Array(_) => Value::Array(Vec::new()),
            Value::Object(_) => Value::Object(Vec::new()),
            Value::Custom(custom) => Value::Custom(Arc::clone(custom)),
        }
    }

    /// Number of nested containers on the deepest path; scalars are 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0usize)];
        while let Some((value, level)) = pending.pop() {
            match value {
                Value::Array(items) => {
                    deepest = deepest.max(level + 1);
                    pending.extend(items.iter().map(|v| (v, level + 1)));
                }
                Value::Object(entries) => {
                    deepest = deepest.max(level + 1);
                    pending.extend(entries.iter().map(|(_, v)| (v, level + 1)));
                }
                _ => {}
            }
        }
        deepest
    }

    /// Wraps a domain object.
    pub fn custom<T: CustomValue>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    /// Builds an object from `(key, value)` pairs, keeping their order.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The current wall-clock time, truncated to whole milliseconds.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0);
        Value::Timestamp(ms)
    }

    /// Short name of the value's shape; custom values report their Rust type.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Custom(custom) => (**custom).type_name(),
        }
    }

    /// Returns `true` when this is a custom value of concrete type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(custom) => (**custom).as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Looks up the first entry named `key` in an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<f64> {
        match self {
            Value::Timestamp(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }
}

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
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// Integral doubles in the safe range print as JSON integers.
fn json_number(n: f64) -> serde_json::Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        rebuild(v, json_scalar, serde_json::Value::Array, |entries| {
            serde_json::Value::Object(entries.into_iter().collect())
        })
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        serde_json::Value::from(&v)
    }
}

fn json_scalar(v: &Value) -> serde_json::Value {
    match v {
        Value::Undefined | Value::Null | Value::Custom(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) | Value::Timestamp(n) => json_number(*n),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(b);
            serde_json::Value::String(format!("data:application/octet-stream;base64,{b64}"))
        }
        Value::Array(_) => serde_json::Value::Array(Vec::new()),
        Value::Object(_) => serde_json::Value::Object(serde_json::Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Debug, PartialEq)]
    struct Other(i32);

    #[test]
    fn custom_values_compare_by_concrete_type() {
        let a = Value::custom(Point { x: 1, y: 2 });
        let b = Value::custom(Point { x: 1, y: 2 });
        let c = Value::custom(Point { x: 9, y: 2 });
        let d = Value::custom(Other(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.is::<Point>());
        assert!(!a.is::<Other>());
        assert_eq!(a.downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
    }

    #[test]
    fn kind_names_shapes() {
        assert_eq!(Value::Undefined.kind(), "undefined");
        assert_eq!(Value::Timestamp(0.0).kind(), "timestamp");
        assert_eq!(Value::bytes(vec![1u8]).kind(), "bytes");
        assert!(Value::custom(Other(3)).kind().ends_with("Other"));
    }

    #[test]
    fn undefined_and_null_differ() {
        assert_ne!(Value::Undefined, Value::Null);
        assert!(Value::Undefined.is_undefined());
        assert!(Value::Null.is_null());
    }

    #[test]
    fn object_lookup_preserves_order() {
        let v = Value::object([("b", Value::from(1)), ("a", Value::from("x"))]);
        assert_eq!(v.get("a"), Some(&Value::Str("x".into())));
        assert_eq!(v.get("missing"), None);
        let keys: Vec<&str> = v
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn from_json_keeps_key_order() {
        let v = Value::from(json!({"z": 1, "a": [true, null, "s"], "m": 2.5}));
        assert_eq!(
            v,
            Value::object([
                ("z", Value::Number(1.0)),
                (
                    "a",
                    Value::Array(vec![Value::Bool(true), Value::Null, Value::from("s")])
                ),
                ("m", Value::Number(2.5)),
            ])
        );
    }

    #[test]
    fn to_json_maps_non_json_shapes() {
        let v = Value::object([
            ("n", Value::Number(3.0)),
            ("f", Value::Number(0.5)),
            ("nan", Value::Number(f64::NAN)),
            ("u", Value::Undefined),
            ("t", Value::Timestamp(1_700_000_000_000.0)),
            ("b", Value::bytes(vec![1u8, 2, 3])),
            ("c", Value::custom(Other(1))),
        ]);
        assert_eq!(
            serde_json::Value::from(v),
            json!({
                "n": 3,
                "f": 0.5,
                "nan": null,
                "u": null,
                "t": 1_700_000_000_000i64,
                "b": "data:application/octet-stream;base64,AQID",
                "c": null,
            })
        );
    }

    fn nested_arrays(depth: usize) -> Value {
        let mut value = Value::Null;
        for _ in 0..depth {
            value = Value::Array(vec![value, Value::from(1)]);
        }
        value
    }

    #[test]
    fn deep_trees_drop_clone_and_compare() {
        let value = nested_arrays(200_000);
        let copy = value.clone();
        assert!(copy == value);
        assert!(copy != nested_arrays(10));
        assert_eq!(copy.depth(), 200_000);
        drop(value);
        drop(copy);
    }

    #[test]
    fn equality_checks_every_level() {
        let a = Value::object([("k", Value::Array(vec![Value::from(1), Value::from("x")]))]);
        let b = Value::object([("k", Value::Array(vec![Value::from(1), Value::from("y")]))]);
        let c = Value::object([("j", Value::Array(vec![Value::from(1), Value::from("x")]))]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(Value::Array(vec![]), Value::Object(vec![]));
        assert_ne!(Value::Array(vec![Value::Null]), Value::Array(vec![]));
    }

    #[test]
    fn clone_keeps_shape_and_custom_identity() {
        let custom = Value::custom(Other(5));
        let v = Value::object([
            ("a", Value::Array(vec![Value::Object(vec![]), custom.clone()])),
            ("b", Value::bytes(vec![1u8])),
        ]);
        let copy = v.clone();
        assert_eq!(copy, v);
        match (&v.get("a").unwrap().as_array().unwrap()[1], &copy.get("a").unwrap().as_array().unwrap()[1]) {
            (Value::Custom(x), Value::Custom(y)) => assert!(Arc::ptr_eq(x, y)),
            other => panic!("unexpected shapes: {other:?}"),
        }
    }

    #[test]
    fn depth_counts_containers() {
        assert_eq!(Value::Null.depth(), 0);
        assert_eq!(Value::Array(vec![]).depth(), 1);
        assert_eq!(
            Value::object([("a", Value::Array(vec![Value::Object(vec![])])), ("b", Value::Null)])
                .depth(),
            3
        );
    }

    #[test]
    fn deep_tree_converts_to_json() {
        let json = serde_json::Value::from(&nested_arrays(100_000));
        let mut levels = 0;
        let mut cur = &json;
        while let serde_json::Value::Array(items) = cur {
            levels += 1;
            cur = &items[0];
        }
        assert_eq!(levels, 100_000);
        assert_eq!(cur, &serde_json::Value::Null);
        // serde_json drops its own trees recursively.
        std::mem::forget(json);
    }

    #[test]
    fn now_is_whole_milliseconds() {
        let ms = Value::now().as_timestamp().unwrap();
        assert!(ms > 0.0);
        assert_eq!(ms.fract(), 0.0);
    }
}
