use crate::error::{FieldPath, Result};
use crate::shape::ArrayTypeSet;

use super::{merge_type_sets_at, validate_set};

/// Merge the element types of two array values.
///
/// An unknown element type (only empty arrays seen) is absorbed by a known
/// one; two known element sets are unioned with the same rules as field
/// type sets, so nested objects and arrays are merged rather than doubled.
pub fn merge_array_type_sets(a: &ArrayTypeSet, b: &ArrayTypeSet) -> Result<ArrayTypeSet> {
    let path = FieldPath::root();
    for inner in [a.inner(), b.inner()].into_iter().flatten() {
        validate_set(inner, &path.items())?;
    }
    merge_array_type_sets_at(a, b, &path)
}

pub(crate) fn merge_array_type_sets_at(
    a: &ArrayTypeSet,
    b: &ArrayTypeSet,
    path: &FieldPath,
) -> Result<ArrayTypeSet> {
    match (a.inner(), b.inner()) {
        (None, None) => Ok(ArrayTypeSet::empty()),
        (Some(_), None) => Ok(a.clone()),
        (None, Some(_)) => Ok(b.clone()),
        (Some(x), Some(y)) if x == y => Ok(a.clone()),
        (Some(x), Some(y)) => Ok(ArrayTypeSet::of(merge_type_sets_at(x, y, &path.items())?)),
    }
}
