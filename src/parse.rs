//! Raw per-document type sample → [`SchemaNode`].
//!
//! A sample maps field names to token lists. A token is a type tag string, a
//! nested sample (object), or a nested token list (array elements).
use serde_json::{Map, Value};

use crate::error::{FieldPath, Result, ShapeError};
use crate::shape::{ArrayTypeSet, SchemaNode, TypeSet, TypeValue};

/// Build a [`SchemaNode`] from one raw sample.
///
/// A sample may itself carry the `Undefined` tag (the sampler writes it for
/// BSON undefined values, and previously merged schemas are full of it). It is
/// kept as an ordinary scalar, so such a node equals the one the merger would
/// produce and re-injecting the marker later is a no-op.
pub fn parse(sample: &Value) -> Result<SchemaNode> {
    match sample {
        Value::Object(map) => parse_object(map, &FieldPath::root()),
        other => Err(ShapeError::invalid(
            FieldPath::root(),
            "a sample must map field names to token lists",
            other,
        )),
    }
}

impl TryFrom<&Value> for SchemaNode {
    type Error = ShapeError;
    fn try_from(sample: &Value) -> Result<Self> { parse(sample) }
}

fn parse_object(map: &Map<String, Value>, path: &FieldPath) -> Result<SchemaNode> {
    let mut node = SchemaNode::new();
    for (name, value) in map {
        let field = path.field(name);
        let Value::Array(tokens) = value else {
            let reason = "a field value must be a list of type tokens";
            return Err(ShapeError::invalid(field, reason, value));
        };
        let set = parse_tokens(tokens, &field)?;
        node.insert(name.clone(), set);
    }
    Ok(node)
}

fn parse_tokens(tokens: &[Value], path: &FieldPath) -> Result<TypeSet> {
    let mut set = TypeSet::new();
    for token in tokens {
        set.insert(parse_token(token, path)?);
    }
    Ok(set)
}

fn parse_token(token: &Value, path: &FieldPath) -> Result<TypeValue> {
    match token {
        Value::String(tag) => Ok(TypeValue::Scalar(tag.clone())),
        Value::Object(map) => Ok(TypeValue::Object(parse_object(map, path)?)),
        Value::Array(items) => {
            let inner = parse_tokens(items, &path.items())?;
            Ok(TypeValue::Array(ArrayTypeSet::of(inner)))
        }
        other => Err(ShapeError::invalid(
            path.clone(),
            "a type token must be a tag string, a mapping or a list",
            other,
        )),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_scalar_tags() {
        let node = parse(&json!({"field1": ["String", "Int32"]})).unwrap();
        assert_eq!(node.len(), 1);
        assert_eq!(node.get("field1").unwrap(), &TypeSet::of_scalars(["String", "Int32"]));
    }

    #[test]
    fn parses_nested_objects() {
        let node = parse(&json!({
            "field1": ["String", {"field2": ["Int32", {"field3": ["String"]}]}]
        }))
        .unwrap();
        let field1 = node.get("field1").unwrap();
        assert_eq!(field1.len(), 2);
        assert!(field1.contains(&TypeValue::scalar("String")));

        let field2 = field1.object().unwrap().get("field2").unwrap();
        assert!(field2.contains(&TypeValue::scalar("Int32")));
        let field3 = field2.object().unwrap().get("field3").unwrap();
        assert_eq!(field3, &TypeSet::of_scalars(["String"]));
    }

    #[test]
    fn parses_arrays_including_empty_ones() {
        let node = parse(&json!({
            "field1": ["String", []],
            "field2": ["String", "Int32", ["String"]]
        }))
        .unwrap();

        let arr1 = node.get("field1").unwrap().array().unwrap();
        assert!(arr1.is_empty());

        let arr2 = node.get("field2").unwrap().array().unwrap();
        assert_eq!(arr2.inner().unwrap(), &TypeSet::of_scalars(["String"]));
    }

    #[test]
    fn undefined_tag_is_kept_as_a_scalar() {
        let node = parse(&json!({"f": ["Undefined", "String", "Undefined"]})).unwrap();
        let f = node.get("f").unwrap();
        assert_eq!(f.len(), 2);
        assert!(f.has_undefined());
        assert_eq!(f, &TypeSet::of_scalars(["String"]).with_undefined());
    }

    #[test]
    fn duplicate_tokens_collapse() {
        let node = parse(&json!({
            "f": ["String", "String", {"a": ["Int32"]}, {"a": ["Int32"]}, ["Null"], ["Null"]]
        }))
        .unwrap();
        assert_eq!(node.get("f").unwrap().len(), 3);
    }

    #[test]
    fn distinct_nested_objects_are_kept_for_the_merger_to_reject() {
        let node = parse(&json!({"f": [{"a": ["String"]}, {"b": ["Int32"]}]})).unwrap();
        assert_eq!(node.get("f").unwrap().len(), 2);
    }

    #[test]
    fn empty_field_list_is_an_empty_set() {
        let node = parse(&json!({"f": []})).unwrap();
        assert!(node.get("f").unwrap().is_empty());
    }

    #[test]
    fn object_field_that_is_not_a_list_is_invalid() {
        let err = parse(&json!({"f": ["String", {"g": "Int32"}]})).unwrap_err();
        match err {
            ShapeError::InvalidSchema { path, found, .. } => {
                assert_eq!(path.to_string(), "f.g");
                assert_eq!(found, json!("Int32"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn top_level_shape_errors() {
        assert_eq!(parse(&json!(["String"])).unwrap_err().kind(), "InvalidSchema");
        assert_eq!(parse(&json!({"f": "String"})).unwrap_err().path().to_string(), "f");
        let err = parse(&json!({"f": [["String", 1]]})).unwrap_err();
        assert_eq!(err.kind(), "InvalidSchema");
        assert_eq!(err.path().to_string(), "f[]");
    }
}
