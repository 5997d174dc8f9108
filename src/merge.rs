//! Pairwise merge of schema trees.
//!
//! `merge(a, b)` is a pure fold: neither input is touched, a new tree comes
//! back. Per field:
//! - present on one side only → that side's set plus `Undefined`
//! - present on both → `merge_type_sets`, which folds the nested object and
//!   array types together instead of keeping two of either
//!
//! A type set holds at most one `Object` and at most one `Array` element.
//! Inputs that already break this are rejected, never silently resolved.
pub mod arr;

use crate::error::{FieldPath, Result, ShapeError};
use crate::shape::{SchemaNode, TypeSet, TypeValue};

pub use arr::merge_array_type_sets;

// ------------------------------- Front API -------------------------------- //

pub fn merge(a: &SchemaNode, b: &SchemaNode) -> Result<SchemaNode> {
    validate(a)?;
    validate(b)?;
    merge_at(a, b, &FieldPath::root())
}

pub fn merge_type_sets(a: &TypeSet, b: &TypeSet) -> Result<TypeSet> {
    let root = FieldPath::root();
    validate_set(a, &root)?;
    validate_set(b, &root)?;
    merge_type_sets_at(a, b, &root)
}

/// Check the one-object/one-array rule on every set of the tree.
pub fn validate(node: &SchemaNode) -> Result<()> {
    validate_node(node, &FieldPath::root())
}

// ------------------------------- Merge ------------------------------------ //

pub(crate) fn merge_at(a: &SchemaNode, b: &SchemaNode, path: &FieldPath) -> Result<SchemaNode> {
    let mut out = SchemaNode::new();

    // keys from a, in a's order
    for (name, set_a) in a {
        let field = path.field(name);
        let merged = match b.get(name) {
            Some(set_b) => merge_type_sets_at(set_a, set_b, &field)?,
            None => absent_on_one_side(set_a, &field)?,
        };
        out.insert(name.clone(), merged);
    }
    // keys only in b
    for (name, set_b) in b {
        if a.contains_field(name) {
            continue;
        }
        out.insert(name.clone(), absent_on_one_side(set_b, &path.field(name))?);
    }

    Ok(out)
}

fn absent_on_one_side(set: &TypeSet, path: &FieldPath) -> Result<TypeSet> {
    check_singletons(set, path)?;
    Ok(set.clone().with_undefined())
}

pub(crate) fn merge_type_sets_at(
    set_a: &TypeSet,
    set_b: &TypeSet,
    path: &FieldPath,
) -> Result<TypeSet> {
    check_singletons(set_a, path)?;
    check_singletons(set_b, path)?;

    let mut merged = set_a.clone();
    for value in set_b {
        let slot = match value {
            TypeValue::Object(_) => merged.object_index(),
            TypeValue::Array(_) => merged.array_index(),
            TypeValue::Scalar(_) => None,
        };
        match slot {
            Some(index) => {
                let combined = merge_values(&merged.as_slice()[index], value, path)?;
                merged.replace(index, combined);
            }
            None => {
                merged.insert(value.clone());
            }
        }
    }
    Ok(merged)
}

fn merge_values(a: &TypeValue, b: &TypeValue, path: &FieldPath) -> Result<TypeValue> {
    match (a, b) {
        (TypeValue::Object(x), TypeValue::Object(y)) => {
            Ok(TypeValue::Object(merge_at(x, y, path)?))
        }
        (TypeValue::Array(x), TypeValue::Array(y)) => {
            Ok(TypeValue::Array(arr::merge_array_type_sets_at(x, y, path)?))
        }
        _ => Err(ShapeError::IncompatibleSchemaValues {
            path: path.clone(),
            left: a.to_value(),
            right: b.to_value(),
        }),
    }
}

// ------------------------------ Invariants -------------------------------- //

fn check_singletons(set: &TypeSet, path: &FieldPath) -> Result<()> {
    let mut object: Option<&TypeValue> = None;
    let mut array: Option<&TypeValue> = None;
    for value in set {
        match value {
            TypeValue::Object(_) => match object {
                Some(first) => {
                    return Err(ShapeError::MultipleObjectTypes {
                        path: path.clone(),
                        first: first.to_value(),
                        second: value.to_value(),
                    });
                }
                None => object = Some(value),
            },
            TypeValue::Array(_) => match array {
                Some(first) => {
                    return Err(ShapeError::MultipleArrayTypes {
                        path: path.clone(),
                        first: first.to_value(),
                        second: value.to_value(),
                    });
                }
                None => array = Some(value),
            },
            TypeValue::Scalar(_) => {}
        }
    }
    Ok(())
}

fn validate_node(node: &SchemaNode, path: &FieldPath) -> Result<()> {
    for (name, set) in node {
        validate_set(set, &path.field(name))?;
    }
    Ok(())
}

fn validate_set(set: &TypeSet, path: &FieldPath) -> Result<()> {
    check_singletons(set, path)?;
    for value in set {
        match value {
            TypeValue::Object(node) => validate_node(node, path)?,
            TypeValue::Array(arr) => {
                if let Some(inner) = arr.inner() {
                    validate_set(inner, &path.items())?;
                }
            }
            TypeValue::Scalar(_) => {}
        }
    }
    Ok(())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::shape::UNDEFINED;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn node(sample: Value) -> SchemaNode {
        parse(&sample).unwrap()
    }

    fn merged(a: Value, b: Value) -> SchemaNode {
        merge(&node(a), &node(b)).unwrap()
    }

    #[test]
    fn merges_two_simple_schemas() {
        assert_eq!(
            merged(json!({"field1": ["String", "Int32"]}), json!({"field1": ["String", "Int64"]})),
            node(json!({"field1": ["String", "Int32", "Int64"]}))
        );
    }

    #[test]
    fn typed_array_absorbs_empty_array() {
        let expected = node(json!({"field1": ["String", ["Int32"]]}));
        assert_eq!(
            merged(json!({"field1": ["String", []]}), json!({"field1": ["String", ["Int32"]]})),
            expected
        );
        assert_eq!(
            merged(json!({"field1": ["String", ["Int32"]]}), json!({"field1": ["String", []]})),
            expected
        );
    }

    #[test]
    fn does_not_duplicate_array_types() {
        let out = merged(json!({"field1": ["String", ["Int32"]]}), json!({"field1": ["String", ["Int32"]]}));
        assert_eq!(out.get("field1").unwrap().len(), 2);
        assert_eq!(out, node(json!({"field1": ["String", ["Int32"]]})));
    }

    #[test]
    fn array_element_types_are_unioned() {
        assert_eq!(
            merged(
                json!({"tags": [["String"]]}),
                json!({"tags": [["Int32", {"k": ["String"]}]]})
            ),
            node(json!({"tags": [["String", "Int32", {"k": ["String"]}]]}))
        );
    }

    #[test]
    fn objects_inside_arrays_are_merged_not_replaced() {
        assert_eq!(
            merged(
                json!({"items": [[{"id": ["Int32"]}]]}),
                json!({"items": [[{"id": ["Int64"], "sku": ["String"]}]]})
            ),
            node(json!({"items": [[{"id": ["Int32", "Int64"], "sku": ["String", UNDEFINED]}]]}))
        );
    }

    #[test]
    fn injects_undefined_for_one_sided_fields() {
        assert_eq!(
            merged(
                json!({"field1": ["String", "Int32"], "field2": ["String", "Int64"]}),
                json!({"field2": ["String", "Int64"], "field3": ["Another"]})
            ),
            node(json!({
                "field1": ["String", "Int32", UNDEFINED],
                "field2": ["String", "Int64"],
                "field3": ["Another", UNDEFINED]
            }))
        );
    }

    #[test]
    fn merges_nested_objects() {
        assert_eq!(
            merged(
                json!({"field1": ["String", {"field2": ["Int32"]}]}),
                json!({"field1": ["String", {"field2": ["Int64"]}]})
            ),
            node(json!({"field1": ["String", {"field2": ["Int32", "Int64"]}]}))
        );
    }

    #[test]
    fn injects_undefined_inside_nested_objects() {
        assert_eq!(
            merged(json!({"f": [{"a": ["String"]}]}), json!({"f": [{"b": ["Int32"]}]})),
            node(json!({"f": [{"a": ["String", UNDEFINED], "b": ["Int32", UNDEFINED]}]}))
        );
    }

    #[test]
    fn object_on_one_side_of_a_shared_field_is_kept_as_is() {
        assert_eq!(
            merged(json!({"f": ["Null"]}), json!({"f": [{"a": ["String"]}]})),
            node(json!({"f": ["Null", {"a": ["String"]}]}))
        );
    }

    #[test]
    fn inputs_are_left_untouched() {
        let a = node(json!({"f": ["String", {"x": ["Int32"]}]}));
        let b = node(json!({"f": [{"y": ["Int32"]}], "g": ["Null"]}));
        let (a0, b0) = (a.clone(), b.clone());
        let _ = merge(&a, &b).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&a0).unwrap());
        assert_eq!(serde_json::to_string(&b).unwrap(), serde_json::to_string(&b0).unwrap());
    }

    #[test]
    fn merge_laws_idempotent_commutative_associative() {
        let a = node(json!({"x": ["String", {"n": ["Int32"]}], "t": [["Int32"]]}));
        let b = node(json!({"x": ["Null", {"m": ["Double"]}], "y": ["Boolean"]}));
        let c = node(json!({"t": [[], "Null"], "z": [{"deep": [[{"k": ["String"]}]]}]}));

        // idempotent
        let ab = merge(&a, &b).unwrap();
        assert_eq!(merge(&ab, &ab).unwrap(), ab);
        assert_eq!(merge(&a, &a).unwrap(), a);

        // commutative
        assert_eq!(merge(&b, &a).unwrap(), ab);

        // associative
        let ab_c = merge(&ab, &c).unwrap();
        let a_bc = merge(&a, &merge(&b, &c).unwrap()).unwrap();
        assert_eq!(ab_c, a_bc);
        assert_eq!(ab_c.canonicalize().to_value(), a_bc.canonicalize().to_value());
    }

    #[test]
    fn undefined_injection_is_exact() {
        let a = node(json!({"only_a": ["String", {"k": ["Int32"]}], "both": ["Int32"]}));
        let b = node(json!({"both": ["Int64"], "only_b": [["Double"], UNDEFINED]}));
        let out = merge(&a, &b).unwrap();
        assert_eq!(out.get("only_a").unwrap(), &a.get("only_a").unwrap().clone().with_undefined());
        assert_eq!(out.get("only_b").unwrap(), b.get("only_b").unwrap());
        assert!(!out.get("both").unwrap().has_undefined());
    }

    #[test]
    fn rejects_two_object_types_in_one_set() {
        let bad = node(json!({"f": [{"a": ["String"]}, {"b": ["Int32"]}]}));
        let good = node(json!({"f": ["String"]}));
        for err in [merge(&bad, &good).unwrap_err(), merge(&good, &bad).unwrap_err()] {
            match err {
                ShapeError::MultipleObjectTypes { path, first, second } => {
                    assert_eq!(path.to_string(), "f");
                    assert_eq!(first, json!({"a": ["String"]}));
                    assert_eq!(second, json!({"b": ["Int32"]}));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn rejects_two_array_types_in_one_set() {
        let bad = node(json!({"f": [["String"], ["Int32"]]}));
        let err = merge(&bad, &node(json!({}))).unwrap_err();
        assert_eq!(err.kind(), "MultipleArrayTypes");
        assert_eq!(err.path().to_string(), "f");
    }

    #[test]
    fn rejects_violations_deep_inside_one_sided_fields() {
        let bad = node(json!({"f": [[{"a": ["String"]}, {"b": ["Int32"]}]]}));
        let err = merge(&node(json!({"g": ["Null"]})), &bad).unwrap_err();
        assert_eq!(err.kind(), "MultipleObjectTypes");
        assert_eq!(err.path().to_string(), "f[]");
    }

    #[test]
    fn merged_sets_keep_one_object_and_one_array() {
        let out = merged(
            json!({"f": ["String", {"a": ["Int32"]}, ["Int32"]]}),
            json!({"f": [{"b": ["Int32"]}, ["Double"], "Null"]}),
        );
        let f = out.get("f").unwrap();
        assert_eq!(f.iter().filter(|v| v.is_object()).count(), 1);
        assert_eq!(f.iter().filter(|v| v.is_array()).count(), 1);
        assert!(validate(&out).is_ok());
    }

    #[test]
    fn merge_type_sets_is_a_plain_union() {
        let a = TypeSet::of_scalars(["String", "Int32"]);
        let b = TypeSet::of_scalars(["Int32", "Null"]);
        assert_eq!(merge_type_sets(&a, &b).unwrap(), TypeSet::of_scalars(["String", "Int32", "Null"]));
    }

    #[test]
    fn mismatched_value_kinds_are_incompatible() {
        let err = merge_values(
            &TypeValue::scalar("String"),
            &TypeValue::Object(SchemaNode::new()),
            &FieldPath::root().field("f"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ShapeError::IncompatibleSchemaValues {
                path: FieldPath::root().field("f"),
                left: json!("String"),
                right: json!({}),
            }
        );
    }
}
