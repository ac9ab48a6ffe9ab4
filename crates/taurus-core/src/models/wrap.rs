use std::fmt;
use std::ops::{BitOr, Deref};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// A field of a wrapped object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    /// A nested JSON object, itself wrapped
    Object(JsonWrap),
    /// Any other JSON value, kept as-is
    Value(Value),
}

impl Field {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Field::Object(JsonWrap::new(map)),
            other => Field::Value(other),
        }
    }

    pub fn as_object(&self) -> Option<&JsonWrap> {
        match self {
            Field::Object(obj) => Some(obj),
            Field::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Field::Object(obj) => obj.to_dict(),
            Field::Value(value) => value.clone(),
        }
    }
}

/// A JSON object whose fields can be read by name.
///
/// Objects nested directly in a field are wrapped recursively; arrays and
/// scalars are stored unchanged.
#[derive(Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct JsonWrap {
    fields: IndexMap<String, Field>,
}

impl JsonWrap {
    pub fn new(entries: Map<String, Value>) -> Self {
        Self {
            fields: entries
                .into_iter()
                .map(|(k, v)| (k, Field::from_value(v)))
                .collect(),
        }
    }

    /// Wrap `value` if it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::new(map)),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Non-object field
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Field::as_value)
    }

    /// Nested object field
    pub fn object(&self, name: &str) -> Option<&JsonWrap> {
        self.get(name).and_then(Field::as_object)
    }

    /// Walk nested objects, e.g. `["account", "balance"]`
    pub fn path(&self, names: &[&str]) -> Option<&Field> {
        let (last, parents) = names.split_last()?;
        let mut current = self;
        for name in parents {
            current = current.object(name)?;
        }
        current.get(last)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), Field::from_value(value));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain JSON form, nested wrappers included
    pub fn to_dict(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

impl From<JsonWrap> for Value {
    fn from(wrap: JsonWrap) -> Self {
        wrap.to_dict()
    }
}

impl fmt::Debug for JsonWrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dict())
    }
}

impl fmt::Display for JsonWrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dict())
    }
}

/// Audience behavior definition.
///
/// `a | b` nests both sides into a `components` list, the right-hand side
/// tagged with `"operator": "OR"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Behavior(JsonWrap);

impl Behavior {
    pub fn new(entries: Map<String, Value>) -> Self {
        Self(JsonWrap::new(entries))
    }

    pub fn from_value(value: Value) -> Option<Self> {
        JsonWrap::from_value(value).map(Self)
    }

    pub fn into_inner(self) -> JsonWrap {
        self.0
    }
}

impl Deref for Behavior {
    type Target = JsonWrap;

    fn deref(&self) -> &JsonWrap {
        &self.0
    }
}

impl BitOr for Behavior {
    type Output = Behavior;

    fn bitor(self, other: Behavior) -> Behavior {
        let mut out = Map::new();
        out.insert(
            "components".to_string(),
            json!([
                { "complexAudienceBehavior": self.to_dict() },
                { "complexAudienceBehavior": other.to_dict(), "operator": "OR" },
            ]),
        );
        Behavior::new(out)
    }
}
