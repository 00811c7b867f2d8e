use std::collections::BTreeMap;
use std::collections::btree_map;

/// Canonical value of a single field.
///
/// Variants line up with the wire types:
/// - `String`, `I32`, `I64`, `Double`, `Bool`: scalars
/// - `Struct`: nested record, keyed by field name
/// - `List`, `Map`: homogeneous containers; map keys are always strings
/// - `Empty`: placeholder for an object, enum or timestamp field with no
///   value. It is never written.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    String(String),
    I32(i32),
    I64(i64),
    Double(f64),
    Bool(bool),
    Struct(StructValue),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    #[default]
    Empty,
}

impl Value {
    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::Struct(_) => "struct",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Empty => "empty",
        }
    }

    pub fn is_empty_placeholder(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(n) => Some(*n),
            Self::I32(n) => Some(i64::from(*n)),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<StructValue> for Value {
    fn from(v: StructValue) -> Self {
        Self::Struct(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

/// Field values of one record, keyed by field name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    fields: BTreeMap<String, Value>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.fields
    }
}

impl FromIterator<(String, Value)> for StructValue {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StructValue {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a StructValue {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let person = StructValue::new()
            .with("name", "Nicolas")
            .with("age", 26i64)
            .with("tags", vec![Value::from("a"), Value::from("b")]);

        assert_eq!(person.get("name").and_then(Value::as_str), Some("Nicolas"));
        assert_eq!(person.get("age").and_then(Value::as_i64), Some(26));
        assert_eq!(person.len(), 3);
        assert!(person.get("missing").is_none());
    }

    #[test]
    fn set_returns_previous() {
        let mut v = StructValue::new().with("flag", true);
        assert_eq!(v.set("flag", false), Some(Value::Bool(true)));
        assert_eq!(v.remove("flag"), Some(Value::Bool(false)));
        assert!(v.is_empty());
    }

    #[test]
    fn default_value_is_empty_placeholder() {
        assert!(Value::default().is_empty_placeholder());
        assert_eq!(Value::from(1.5).kind(), "double");
    }
}
