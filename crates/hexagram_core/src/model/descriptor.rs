//! Persistence-class descriptors.
//!
//! # Responsibility
//! - Describe one storage collection: qualified name, table and typed fields.
//! - Reject identifiers that cannot be safely used as storage names.
//!
//! # Invariants
//! - The identifier column is implicit and always named `id`.
//! - Field names are unique and never `id`.
//! - Descriptors are immutable once built.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name of the implicit identifier attribute/column.
pub const ID_FIELD: &str = "id";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Storage type of one descriptor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    /// Stored as `0`/`1` by SQL backends.
    Boolean,
}

/// One declared field of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// Descriptor construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    EmptyName,
    InvalidIdentifier(String),
    ReservedField(String),
    DuplicateField(String),
}

impl Display for DescriptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "descriptor name must not be empty"),
            Self::InvalidIdentifier(value) => write!(f, "invalid storage identifier: `{value}`"),
            Self::ReservedField(value) => {
                write!(f, "field name `{value}` is reserved for the record identifier")
            }
            Self::DuplicateField(value) => write!(f, "field declared twice: `{value}`"),
        }
    }
}

impl Error for DescriptorError {}

/// Persistence-class descriptor bound to a repository for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    table: String,
    fields: Vec<FieldSpec>,
}

impl Descriptor {
    /// Starts a descriptor for the qualified `name` stored in `table`.
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// Fully qualified name, e.g. `Persisters::Campus`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last `::` segment of the qualified name, e.g. `Campus`.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(self.name.as_str())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared fields in declaration order, without `id`.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns whether `name` addresses `id` or a declared field.
    pub fn has_attribute(&self, name: &str) -> bool {
        name == ID_FIELD || self.field(name).is_some()
    }
}

/// Validating builder for [`Descriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    table: String,
    fields: Vec<FieldSpec>,
}

impl DescriptorBuilder {
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn build(self) -> Result<Descriptor, DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        for segment in self.name.split("::") {
            ensure_identifier(segment)?;
        }
        ensure_identifier(&self.table)?;

        for (index, field) in self.fields.iter().enumerate() {
            ensure_identifier(&field.name)?;
            if field.name == ID_FIELD {
                return Err(DescriptorError::ReservedField(field.name.clone()));
            }
            if self.fields[..index]
                .iter()
                .any(|earlier| earlier.name == field.name)
            {
                return Err(DescriptorError::DuplicateField(field.name.clone()));
            }
        }

        Ok(Descriptor {
            name: self.name,
            table: self.table,
            fields: self.fields,
        })
    }
}

fn ensure_identifier(value: &str) -> Result<(), DescriptorError> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(DescriptorError::InvalidIdentifier(value.to_string()))
    }
}
