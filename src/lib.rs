//! Merge per-document type samples into one structural schema.
//!
//! Samples come from an external type sampler: each maps a field name to the
//! list of type tokens seen for it. [`parse`] turns one sample into a
//! [`SchemaNode`]; [`merge`] folds two trees together, marking fields that
//! only one side has with `Undefined`; [`fold`] folds whole sequences.
pub mod cli;
pub mod error;
pub mod fold;
pub mod jq_exec;
pub mod merge;
pub mod parse;
pub mod path_de;
pub mod shape;

pub use error::{FieldPath, Result, ShapeError};
pub use fold::{merge_all, merge_all_parallel, Accumulator};
pub use merge::{merge, merge_array_type_sets, merge_type_sets, validate};
pub use parse::parse;
pub use shape::{ArrayTypeSet, SchemaNode, TypeSet, TypeValue, UNDEFINED};
