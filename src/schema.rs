//! The fixed property schema for rows of the main table.
//!
//! Every [`RowDocument`](crate::document::RowDocument) shares this single
//! canonical property-definition set. The schema is known at compile time;
//! the lookup table exists only for generic enumeration and for reporting
//! unknown-property accesses as schema violations instead of silent nulls.

/// Scalar type of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Integer,
    Text,
    Uri,
    Float,
}

/// Definition of one property in the row schema.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub kind: PropertyKind,
    pub required: bool,
    /// Inclusive numeric range constraint, for Integer/Float kinds.
    pub range: Option<(f64, f64)>,
    /// Computed properties never appear in the persisted backing values.
    /// None of the current properties are computed, but stripping logic
    /// must honor the flag for any future addition.
    pub computed: bool,
}

/// The canonical property set, in column order of the main table.
pub const PROPERTIES: [PropertyDefinition; 6] = [
    PropertyDefinition {
        name: "id",
        label: "ID",
        description: "The ID of the item.",
        kind: PropertyKind::Integer,
        required: true,
        range: Some((0.0, 255.0)),
        computed: false,
    },
    PropertyDefinition {
        name: "name",
        label: "Name",
        description: "The name of the item.",
        kind: PropertyKind::Text,
        required: true,
        range: None,
        computed: false,
    },
    PropertyDefinition {
        name: "url",
        label: "URL",
        description: "The URL of the item.",
        kind: PropertyKind::Uri,
        required: true,
        range: None,
        computed: false,
    },
    PropertyDefinition {
        name: "description",
        label: "Description",
        description: "The description of the item.",
        kind: PropertyKind::Text,
        required: true,
        range: None,
        computed: false,
    },
    PropertyDefinition {
        name: "price",
        label: "Price",
        description: "The price of the item.",
        kind: PropertyKind::Float,
        required: true,
        range: Some((0.0, 1_000_000.0)),
        computed: false,
    },
    PropertyDefinition {
        name: "category",
        label: "Category",
        description: "The category of the item.",
        kind: PropertyKind::Text,
        required: true,
        range: None,
        computed: false,
    },
];

/// Look up a property definition by name.
pub fn property(name: &str) -> Option<&'static PropertyDefinition> {
    PROPERTIES.iter().find(|def| def.name == name)
}

/// Names of the columns this datasource reads from the main table.
pub fn column_names() -> Vec<&'static str> {
    PROPERTIES.iter().map(|def| def.name).collect()
}
