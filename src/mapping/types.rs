//! Mapping table types

use crate::error::{Error, Result};
use crate::types::{FieldType, MissingFieldPolicy};
use arrow::datatypes::{Field, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// One projection/rename/cast entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Column name in the source table
    pub source: String,
    /// Type the source column is declared as
    pub source_type: FieldType,
    /// Column name in the output
    pub target: String,
    /// Type written to the output
    pub target_type: FieldType,
}

impl FieldMapping {
    /// Create a mapping entry
    pub fn new(
        source: impl Into<String>,
        source_type: FieldType,
        target: impl Into<String>,
        target_type: FieldType,
    ) -> Self {
        Self {
            source: source.into(),
            source_type,
            target: target.into(),
            target_type,
        }
    }
}

impl fmt::Display for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}:{}",
            self.source, self.source_type, self.target, self.target_type
        )
    }
}

fn parse_side(side: &str, literal: &str) -> Result<(String, FieldType)> {
    let (name, ty) = side
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| Error::config(format!("Mapping '{literal}' is missing a ':type'")))?;
    let (name, ty) = (name.trim(), ty.trim());
    if name.is_empty() {
        return Err(Error::config(format!("Mapping '{literal}' has an empty column name")));
    }
    let ty = ty
        .parse()
        .map_err(|e: String| Error::config(format!("Mapping '{literal}': {e}")))?;
    Ok((name.to_string(), ty))
}

impl FromStr for FieldMapping {
    type Err = Error;

    /// Parse `source:type->target:type` (`→` is accepted as the arrow)
    fn from_str(literal: &str) -> Result<Self> {
        let (left, right) = literal
            .split_once("->")
            .or_else(|| literal.split_once('→'))
            .ok_or_else(|| Error::config(format!("Mapping '{literal}' has no '->'")))?;

        let (source, source_type) = parse_side(left, literal)?;
        let (target, target_type) = parse_side(right, literal)?;
        Ok(Self::new(source, source_type, target, target_type))
    }
}

/// Ordered list of mapping entries applied to every record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable {
    entries: Vec<FieldMapping>,
}

impl MappingTable {
    /// Build a validated mapping table
    pub fn new(entries: Vec<FieldMapping>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::config("Mapping table must have at least one entry"));
        }

        let mut targets = HashSet::new();
        for entry in &entries {
            if !targets.insert(entry.target.as_str()) {
                return Err(Error::config(format!(
                    "Mapping table has duplicate target '{}'",
                    entry.target
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Parse a list of mapping literals
    pub fn parse<S: AsRef<str>>(literals: &[S]) -> Result<Self> {
        let entries = literals
            .iter()
            .map(|l| l.as_ref().parse())
            .collect::<Result<Vec<FieldMapping>>>()?;
        Self::new(entries)
    }

    /// The card-transaction scoring mapping
    ///
    /// Raw feature columns 1-28 are dropped; only the event time, amount,
    /// location and model outputs are kept.
    pub fn fraud_scoring() -> Self {
        Self {
            entries: vec![
                FieldMapping::new("col0", FieldType::Long, "timestamp", FieldType::Long),
                FieldMapping::new("col29", FieldType::Double, "amount", FieldType::Double),
                FieldMapping::new("col30", FieldType::Double, "latitude", FieldType::Double),
                FieldMapping::new("col31", FieldType::Double, "longitude", FieldType::Double),
                FieldMapping::new("col32", FieldType::Long, "fraud", FieldType::Long),
                FieldMapping::new("col33", FieldType::Double, "score", FieldType::Double),
            ],
        }
    }

    /// Entries in output order
    pub fn entries(&self) -> &[FieldMapping] {
        &self.entries
    }

    /// Number of output fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty (never true for a validated table)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Output schema produced under a missing-field policy
    pub fn output_schema(&self, policy: MissingFieldPolicy) -> Schema {
        let nullable = policy == MissingFieldPolicy::Null;
        Schema::new(
            self.entries
                .iter()
                .map(|e| Field::new(&e.target, e.target_type.data_type(), nullable))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::fraud_scoring()
    }
}
