//! Deep structural equality and a canonical total order over schema trees.
//!
//! Equality ignores field order and set element order. `compare` agrees with
//! `equal` (`Ordering::Equal` iff structurally equal) and ranks scalars
//! before objects before arrays.
use std::cmp::Ordering;

use super::{ArrayTypeSet, SchemaNode, TypeSet, TypeValue};

pub fn equal(a: &TypeValue, b: &TypeValue) -> bool {
    match (a, b) {
        (TypeValue::Scalar(x), TypeValue::Scalar(y)) => x == y,
        (TypeValue::Object(x), TypeValue::Object(y)) => nodes_equal(x, y),
        (TypeValue::Array(x), TypeValue::Array(y)) => arrays_equal(x, y),
        _ => false,
    }
}

pub fn contains(set: &TypeSet, value: &TypeValue) -> bool {
    set.iter().any(|x| equal(x, value))
}

pub fn sets_equal(a: &TypeSet, b: &TypeSet) -> bool {
    // insertion dedups, so equal size + inclusion is set equality
    a.len() == b.len() && a.iter().all(|x| contains(b, x))
}

pub fn nodes_equal(a: &SchemaNode, b: &SchemaNode) -> bool {
    a.len() == b.len()
        && a.iter().all(|(name, x)| b.get(name).is_some_and(|y| sets_equal(x, y)))
}

fn arrays_equal(a: &ArrayTypeSet, b: &ArrayTypeSet) -> bool {
    match (a.inner(), b.inner()) {
        (None, None) => true,
        (Some(x), Some(y)) => sets_equal(x, y),
        _ => false,
    }
}

// ------------------------------- Order ----------------------------------- //

fn rank(v: &TypeValue) -> u8 {
    match v {
        TypeValue::Scalar(_) => 0,
        TypeValue::Object(_) => 1,
        TypeValue::Array(_) => 2,
    }
}

pub fn compare(a: &TypeValue, b: &TypeValue) -> Ordering {
    match (a, b) {
        (TypeValue::Scalar(x), TypeValue::Scalar(y)) => x.cmp(y),
        (TypeValue::Object(x), TypeValue::Object(y)) => compare_nodes(x, y),
        (TypeValue::Array(x), TypeValue::Array(y)) => match (x.inner(), y.inner()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare_sets(x, y),
        },
        _ => rank(a).cmp(&rank(b)),
    }
}

pub fn compare_sets(a: &TypeSet, b: &TypeSet) -> Ordering {
    let mut xs: Vec<&TypeValue> = a.iter().collect();
    let mut ys: Vec<&TypeValue> = b.iter().collect();
    xs.sort_by(|x, y| compare(x, y));
    ys.sort_by(|x, y| compare(x, y));
    for (x, y) in xs.iter().zip(ys.iter()) {
        match compare(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    xs.len().cmp(&ys.len())
}

pub fn compare_nodes(a: &SchemaNode, b: &SchemaNode) -> Ordering {
    let mut xs: Vec<(&String, &TypeSet)> = a.iter().collect();
    let mut ys: Vec<(&String, &TypeSet)> = b.iter().collect();
    xs.sort_by(|x, y| x.0.cmp(y.0));
    ys.sort_by(|x, y| x.0.cmp(y.0));
    for ((kx, sx), (ky, sy)) in xs.iter().zip(ys.iter()) {
        let ord = kx.cmp(ky).then_with(|| compare_sets(sx, sy));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    xs.len().cmp(&ys.len())
}

// ----------------------------- PartialEq ---------------------------------- //

impl PartialEq for TypeValue {
    fn eq(&self, other: &Self) -> bool { equal(self, other) }
}
impl Eq for TypeValue {}

impl PartialEq for TypeSet {
    fn eq(&self, other: &Self) -> bool { sets_equal(self, other) }
}
impl Eq for TypeSet {}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool { nodes_equal(self, other) }
}
impl Eq for SchemaNode {}

impl PartialEq for ArrayTypeSet {
    fn eq(&self, other: &Self) -> bool { arrays_equal(self, other) }
}
impl Eq for ArrayTypeSet {}

// ------------------------------- Tests ------------------------------------ //
