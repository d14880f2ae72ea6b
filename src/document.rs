//! Typed, validated view over one row of the main table.
//!
//! A [`RowDocument`] is a transient projection: constructed from a raw
//! key-value row at load time or at mutation-event time, validated against
//! the fixed schema in [`crate::schema`], and handed to the harvesting and
//! tracking components. It has no persistence of its own.
//!
//! The backing value set is immutable once constructed. "Updating" a
//! document produces a new instance via [`RowDocument::with_values`]; there
//! is no shared mutable state and no parent-notification graph.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::schema::{self, PropertyKind, PROPERTIES};

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Uri(String),
    Float(f64),
    /// Explicit absent marker. Fields missing from a raw row resolve to
    /// `Null`, never to silent omission.
    Null,
}

const NULL: FieldValue = FieldValue::Null;

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) | FieldValue::Uri(v) => Some(v),
            _ => None,
        }
    }
}

/// One table row, validated against the fixed schema.
#[derive(Debug, Clone)]
pub struct RowDocument {
    values: BTreeMap<String, FieldValue>,
    label: Option<String>,
}

impl RowDocument {
    /// Build a document from a raw key-value row.
    ///
    /// All six schema fields must be resolvable; fields absent from the raw
    /// row resolve to [`FieldValue::Null`]. Values are type- and
    /// range-checked against the property definitions. Keys outside the
    /// schema are dropped. Values for computed properties are stripped from
    /// the stored backing set.
    pub fn from_row(mut raw: BTreeMap<String, FieldValue>) -> Result<Self, Error> {
        let mut values = BTreeMap::new();
        for def in &PROPERTIES {
            let value = raw.remove(def.name).unwrap_or(FieldValue::Null);
            let value = coerce(def.kind, value);
            validate(def, &value)?;
            if !def.computed {
                values.insert(def.name.to_string(), value);
            }
        }
        if !raw.is_empty() {
            let extra: Vec<&str> = raw.keys().map(|k| k.as_str()).collect();
            tracing::debug!(?extra, "dropping raw row keys outside the schema");
        }
        Ok(Self {
            values,
            label: None,
        })
    }

    /// Attach a display label (e.g. the salted per-item hash used when
    /// wrapping harvested rows).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Read one property value by name.
    ///
    /// Unknown names are schema violations, never silent nulls. A property
    /// without a stored backing value (e.g. a computed one) reads as `Null`.
    pub fn get(&self, name: &str) -> Result<&FieldValue, Error> {
        if schema::property(name).is_none() {
            return Err(Error::schema(name, "unknown property"));
        }
        Ok(self.values.get(name).unwrap_or(&NULL))
    }

    /// The row identifier.
    ///
    /// An absent or null `id` (malformed table data) is a schema violation.
    pub fn item_id(&self) -> Result<i64, Error> {
        match self.get("id")? {
            FieldValue::Integer(id) => Ok(*id),
            _ => Err(Error::schema("id", "row has no usable identifier")),
        }
    }

    /// Replace the backing value set, producing a new document.
    ///
    /// The new values go through the same validation as construction, and
    /// computed-property values are stripped. The label carries over.
    pub fn with_values(&self, raw: BTreeMap<String, FieldValue>) -> Result<Self, Error> {
        let mut next = Self::from_row(raw)?;
        next.label = self.label.clone();
        Ok(next)
    }

    /// Reconstruct the backing value set from each non-computed property.
    ///
    /// `Null` entries are preserved, so the result always covers the full
    /// schema.
    pub fn get_value(&self) -> BTreeMap<String, FieldValue> {
        let mut out = BTreeMap::new();
        for def in &PROPERTIES {
            if def.computed {
                continue;
            }
            let value = self.values.get(def.name).cloned().unwrap_or(FieldValue::Null);
            out.insert(def.name.to_string(), value);
        }
        out
    }

    /// Enumerate (name, value) pairs in schema order.
    pub fn properties(&self, include_computed: bool) -> Vec<(&'static str, &FieldValue)> {
        PROPERTIES
            .iter()
            .filter(|def| include_computed || !def.computed)
            .map(|def| (def.name, self.values.get(def.name).unwrap_or(&NULL)))
            .collect()
    }
}

/// Lift loosely-typed raw values into the property's declared kind.
///
/// SQLite hands back TEXT for uri columns and INTEGER for whole-number
/// floats; both are acceptable inputs for the stricter schema kinds.
fn coerce(kind: PropertyKind, value: FieldValue) -> FieldValue {
    match (kind, value) {
        (PropertyKind::Uri, FieldValue::Text(s)) => FieldValue::Uri(s),
        (PropertyKind::Float, FieldValue::Integer(i)) => FieldValue::Float(i as f64),
        (_, other) => other,
    }
}

fn validate(def: &schema::PropertyDefinition, value: &FieldValue) -> Result<(), Error> {
    let ok = match (def.kind, value) {
        (_, FieldValue::Null) => true,
        (PropertyKind::Integer, FieldValue::Integer(_)) => true,
        (PropertyKind::Text, FieldValue::Text(_)) => true,
        (PropertyKind::Uri, FieldValue::Uri(_)) => true,
        (PropertyKind::Float, FieldValue::Float(_)) => true,
        _ => false,
    };
    if !ok {
        return Err(Error::schema(
            def.name,
            format!("value {:?} does not match kind {:?}", value, def.kind),
        ));
    }
    if let (Some((min, max)), Some(n)) = (def.range, value.as_f64()) {
        if n < min || n > max {
            return Err(Error::schema(
                def.name,
                format!("value {} outside range [{}, {}]", n, min, max),
            ));
        }
    }
    Ok(())
}
