//! Structural errors raised while parsing samples and merging schema trees.
//!
//! Every error names the field path where it happened and carries the
//! offending values re-serialized to their token-list form, so a malformed
//! sample can be tracked down without re-running anything.
use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub type Result<T, E = ShapeError> = std::result::Result<T, E>;

// ------------------------------- Path ------------------------------------ //

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    /// Element slot of an array-typed value.
    Items,
}

/// Location of a type set inside a schema tree, e.g. `tags[].name`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root() -> Self { Self::default() }

    pub fn field(&self, name: &str) -> Self {
        self.push(PathSegment::Field(name.to_string()))
    }

    pub fn items(&self) -> Self {
        self.push(PathSegment::Items)
    }

    pub fn is_root(&self) -> bool { self.segments.is_empty() }

    pub fn segments(&self) -> &[PathSegment] { &self.segments }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Items => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

// ------------------------------- Errors ---------------------------------- //

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("invalid schema at `{path}`: {reason}, found {found}")]
    InvalidSchema {
        path: FieldPath,
        reason: &'static str,
        found: Value,
    },

    #[error("multiple object types at `{path}`: {first} and {second}")]
    MultipleObjectTypes {
        path: FieldPath,
        first: Value,
        second: Value,
    },

    #[error("multiple array types at `{path}`: {first} and {second}")]
    MultipleArrayTypes {
        path: FieldPath,
        first: Value,
        second: Value,
    },

    #[error("incompatible schema values at `{path}`: {left} and {right}")]
    IncompatibleSchemaValues {
        path: FieldPath,
        left: Value,
        right: Value,
    },
}

impl ShapeError {
    pub(crate) fn invalid(path: FieldPath, reason: &'static str, found: &Value) -> Self {
        Self::InvalidSchema { path, reason, found: found.clone() }
    }

    pub fn path(&self) -> &FieldPath {
        match self {
            Self::InvalidSchema { path, .. }
            | Self::MultipleObjectTypes { path, .. }
            | Self::MultipleArrayTypes { path, .. }
            | Self::IncompatibleSchemaValues { path, .. } => path,
        }
    }

    /// Stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSchema { .. } => "InvalidSchema",
            Self::MultipleObjectTypes { .. } => "MultipleObjectTypes",
            Self::MultipleArrayTypes { .. } => "MultipleArrayTypes",
            Self::IncompatibleSchemaValues { .. } => "IncompatibleSchemaValues",
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
