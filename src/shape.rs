//! Schema tree built from per-document type samples.
//!
//! A [`SchemaNode`] maps field names to the [`TypeSet`] observed for that
//! field. Sets are deduplicated by deep structural equality (see
//! [`equality`]), never by identity, and compare equal regardless of the
//! order their elements were observed in.
//!
//! Serialized form is the same token-list shape the sampler produces:
//! - `Scalar(tag)`  → `"tag"`
//! - `Object(node)` → `{ "field": [tokens...] }`
//! - `Array(ats)`   → `[tokens...]` of the element set (`[]` when unknown)
pub mod equality;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

/// Sentinel tag: the field was absent from at least one merged source.
pub const UNDEFINED: &str = "Undefined";

// ------------------------------- Types ----------------------------------- //

#[derive(Clone, Debug, Default)]
pub struct SchemaNode {
    fields: IndexMap<String, TypeSet>,
}

#[derive(Clone, Debug, Default)]
pub struct TypeSet {
    values: Vec<TypeValue>,
}

#[derive(Clone, Debug)]
pub enum TypeValue {
    Scalar(String),
    Object(SchemaNode),
    Array(ArrayTypeSet),
}

/// Element type of an array-valued field. `None` means no element was ever
/// observed (only empty arrays were sampled).
#[derive(Clone, Debug, Default)]
pub struct ArrayTypeSet {
    inner: Option<TypeSet>,
}

// ------------------------------ SchemaNode -------------------------------- //

impl SchemaNode {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn get(&self, name: &str) -> Option<&TypeSet> { self.fields.get(name) }

    pub fn contains_field(&self, name: &str) -> bool { self.fields.contains_key(name) }

    /// Insert or replace the type set of a field.
    pub fn insert(&mut self, name: impl Into<String>, set: TypeSet) -> Option<TypeSet> {
        self.fields.insert(name.into(), set)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, TypeSet> { self.fields.iter() }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Same tree with field names sorted and sets in canonical order.
    pub fn canonicalize(&self) -> SchemaNode {
        let mut fields: Vec<(&String, &TypeSet)> = self.fields.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        fields
            .into_iter()
            .map(|(name, set)| (name.clone(), set.canonicalize()))
            .collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, set)| (name.clone(), set.to_value()))
                .collect(),
        )
    }
}

impl FromIterator<(String, TypeSet)> for SchemaNode {
    fn from_iter<I: IntoIterator<Item = (String, TypeSet)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a SchemaNode {
    type Item = (&'a String, &'a TypeSet);
    type IntoIter = indexmap::map::Iter<'a, String, TypeSet>;
    fn into_iter(self) -> Self::IntoIter { self.fields.iter() }
}

// ------------------------------- TypeSet ---------------------------------- //

impl TypeSet {
    pub fn new() -> Self { Self::default() }

    /// Set of plain scalar tags, mostly handy for building expectations.
    pub fn of_scalars<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter().map(|tag| TypeValue::Scalar(tag.into())).collect()
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeValue> { self.values.iter() }

    pub fn as_slice(&self) -> &[TypeValue] { &self.values }

    pub fn contains(&self, value: &TypeValue) -> bool {
        equality::contains(self, value)
    }

    /// Add `value` unless a structurally equal element is already present.
    /// Returns whether the set grew.
    pub fn insert(&mut self, value: TypeValue) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    pub fn with_undefined(mut self) -> Self {
        self.insert(TypeValue::undefined());
        self
    }

    pub fn has_undefined(&self) -> bool {
        self.values.iter().any(TypeValue::is_undefined)
    }

    /// First nested object type, if any.
    pub fn object(&self) -> Option<&SchemaNode> {
        self.values.iter().find_map(TypeValue::as_object)
    }

    /// First nested array type, if any.
    pub fn array(&self) -> Option<&ArrayTypeSet> {
        self.values.iter().find_map(TypeValue::as_array)
    }

    pub(crate) fn object_index(&self) -> Option<usize> {
        self.values.iter().position(TypeValue::is_object)
    }

    pub(crate) fn array_index(&self) -> Option<usize> {
        self.values.iter().position(TypeValue::is_array)
    }

    /// Swap the element at `index`; callers keep the set free of duplicates.
    pub(crate) fn replace(&mut self, index: usize, value: TypeValue) {
        self.values[index] = value;
    }

    pub fn canonicalize(&self) -> TypeSet {
        let mut values: Vec<TypeValue> = self.values.iter().map(TypeValue::canonicalize).collect();
        values.sort_by(equality::compare);
        Self { values }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.values.iter().map(TypeValue::to_value).collect())
    }
}

impl FromIterator<TypeValue> for TypeSet {
    fn from_iter<I: IntoIterator<Item = TypeValue>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TypeSet {
    type Item = &'a TypeValue;
    type IntoIter = std::slice::Iter<'a, TypeValue>;
    fn into_iter(self) -> Self::IntoIter { self.values.iter() }
}

// ------------------------------ TypeValue --------------------------------- //

impl TypeValue {
    pub fn scalar(tag: impl Into<String>) -> Self { Self::Scalar(tag.into()) }

    pub fn undefined() -> Self { Self::Scalar(UNDEFINED.to_string()) }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Scalar(tag) if tag == UNDEFINED)
    }

    pub fn is_object(&self) -> bool { matches!(self, Self::Object(_)) }

    pub fn is_array(&self) -> bool { matches!(self, Self::Array(_)) }

    pub fn as_object(&self) -> Option<&SchemaNode> {
        match self {
            Self::Object(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayTypeSet> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn canonicalize(&self) -> TypeValue {
        match self {
            Self::Scalar(tag) => Self::Scalar(tag.clone()),
            Self::Object(node) => Self::Object(node.canonicalize()),
            Self::Array(arr) => Self::Array(arr.canonicalize()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(tag) => Value::String(tag.clone()),
            Self::Object(node) => node.to_value(),
            Self::Array(arr) => arr.to_value(),
        }
    }
}

// ---------------------------- ArrayTypeSet -------------------------------- //

impl ArrayTypeSet {
    /// Array whose element type was never observed.
    pub fn empty() -> Self { Self::default() }

    /// Array with the given element types; an empty set means "unknown".
    pub fn of(inner: TypeSet) -> Self {
        if inner.is_empty() {
            Self::empty()
        } else {
            Self { inner: Some(inner) }
        }
    }

    pub fn inner(&self) -> Option<&TypeSet> { self.inner.as_ref() }

    pub fn is_empty(&self) -> bool { self.inner.is_none() }

    pub fn canonicalize(&self) -> ArrayTypeSet {
        Self { inner: self.inner.as_ref().map(TypeSet::canonicalize) }
    }

    pub fn to_value(&self) -> Value {
        match &self.inner {
            Some(set) => set.to_value(),
            None => Value::Array(Vec::new()),
        }
    }
}

// ------------------------------- Serde ------------------------------------ //

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, set) in &self.fields {
            map.serialize_entry(name, set)?;
        }
        map.end()
    }
}

impl Serialize for TypeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for TypeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(tag) => serializer.serialize_str(tag),
            Self::Object(node) => node.serialize(serializer),
            Self::Array(arr) => arr.serialize(serializer),
        }
    }
}

impl Serialize for ArrayTypeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.inner {
            Some(set) => set.serialize(serializer),
            None => serializer.serialize_seq(Some(0))?.end(),
        }
    }
}

/// Reads the token-list shape back through the parser, so the same
/// structural checks apply to stored schemas as to fresh samples.
impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        crate::parse::parse(&value).map_err(serde::de::Error::custom)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use serde_json::json;

    #[test]
    fn insert_deduplicates_structurally() {
        let mut set = TypeSet::of_scalars(["String"]);
        assert!(!set.insert(TypeValue::scalar("String")));
        assert!(set.insert(TypeValue::scalar("Int32")));

        let a = parse(&json!({"x": ["Int32", "String"]})).unwrap();
        let b = parse(&json!({"x": ["String", "Int32"]})).unwrap();
        assert!(set.insert(TypeValue::Object(a)));
        assert!(!set.insert(TypeValue::Object(b)));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn undefined_is_added_once() {
        let set = TypeSet::of_scalars(["String"]).with_undefined().with_undefined();
        assert_eq!(set.len(), 2);
        assert!(set.has_undefined());
    }

    #[test]
    fn empty_element_set_means_unknown_array() {
        assert!(ArrayTypeSet::of(TypeSet::new()).is_empty());
        assert!(!ArrayTypeSet::of(TypeSet::of_scalars(["Int32"])).is_empty());
    }

    #[test]
    fn serializes_back_to_token_lists() {
        let sample = json!({
            "name": ["String"],
            "tags": ["Null", ["String", "Int32"]],
            "empty": [[]],
            "owner": [{"id": ["ObjectId"], "roles": [["String"]]}]
        });
        let node = parse(&sample).unwrap();
        assert_eq!(serde_json::to_value(&node).unwrap(), sample);
        assert_eq!(node.to_value(), sample);
        assert_eq!(parse(&node.to_value()).unwrap(), node);
    }

    #[test]
    fn deserialize_runs_the_parser() {
        let node: SchemaNode = serde_json::from_str(r#"{"a": ["String", {"b": ["Int32"]}]}"#).unwrap();
        assert_eq!(node.get("a").unwrap().object().unwrap().len(), 1);

        let err = serde_json::from_str::<SchemaNode>(r#"{"a": "String"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid schema at `a`"));
    }

    #[test]
    fn canonical_form_sorts_fields_and_sets() {
        let node = parse(&json!({
            "b": ["String", ["Int64", "Int32"], {"z": ["Null"], "y": ["Double"]}],
            "a": ["Int32", "Boolean"]
        }))
        .unwrap();
        let canonical = node.canonicalize();
        assert_eq!(canonical, node);
        assert_eq!(
            serde_json::to_string(&canonical).unwrap(),
            r#"{"a":["Boolean","Int32"],"b":["String",{"y":["Double"],"z":["Null"]},["Int32","Int64"]]}"#
        );
    }
}
