// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Avro schema type model.
//!
//! A schema definition file declares one or more named types (`record`, `error`, `enum`,
//! `fixed`) which may refer to other named types by name. Named types are kept flat:
//! when a named type is declared inline inside another schema, the enclosing schema only
//! holds a [`Type::Reference`] to it and the nested declaration becomes a definition in
//! its own right. This keeps definitions acyclic (a record may refer to itself) and lets
//! two declarations of the same name be compared structurally.
//!
//! Mapping between the JSON form and [`Type`]:
//!
//! ```text
//! "int"                                             Primitive { Int }
//! { "type": "long", "logicalType": "timestamp-millis" }
//!                                                   Primitive { Long, TimestampMillis }
//! { "type": "record", "name": "a.b.C", "fields": [...] }
//!                                                   Record { a.b.C, ... }
//! { "type": "enum", "name": "Suit", "symbols": [...] }
//!                                                   Enum { Suit, ... }
//! { "type": "fixed", "name": "Md5", "size": 16 }    Fixed { Md5, 16 }
//! { "type": "array", "items": ... }                 Array
//! { "type": "map", "values": ... }                  Map
//! [ "null", "string" ]                              Union
//! "a.b.C"                                           Reference(a.b.C)
//! ```
//!
//! Attributes outside the schema grammar (`"avro.java.string"`, or `precision` on a
//! non-decimal) are kept as [`Properties`] so that a definition round-trips without loss.
use crate::Rc;

use core::fmt;
use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Full name of a named type: an optional dotted namespace followed by a simple name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    fullname: Rc<str>,
}

impl Name {
    /// Build a full name from `name` and an optional `namespace`.
    ///
    /// A `name` that already contains a `.` is a full name and the namespace is ignored.
    /// Every dotted segment must be a valid identifier.
    pub fn new(name: &str, namespace: Option<&str>) -> Result<Self, String> {
        let fullname = match namespace {
            Some(ns) if !name.contains('.') && !ns.is_empty() => format!("{ns}.{name}"),
            _ => name.to_string(),
        };

        if fullname.split('.').any(|segment| !is_valid_identifier(segment)) {
            return Err(format!("invalid name: {fullname}"));
        }
        if Primitive::from_name(&fullname).is_some() {
            return Err(format!("cannot redefine primitive type: {fullname}"));
        }

        Ok(Self {
            fullname: fullname.into(),
        })
    }

    pub fn fullname(&self) -> &Rc<str> {
        &self.fullname
    }

    pub fn name(&self) -> &str {
        match self.fullname.rfind('.') {
            Some(pos) => &self.fullname[pos + 1..],
            None => &self.fullname,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.fullname.rfind('.').map(|pos| &self.fullname[..pos])
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname)
    }
}

pub(crate) fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => (),
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bytes" => Self::Bytes,
            "string" => Self::String,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
        }
    }
}

/// Logical type annotation on a primitive or fixed schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Uuid,
    Decimal { precision: u32, scale: u32 },
    /// Any other `logicalType` name. Code generators map these through
    /// `CompilerOptions::logical_type_factories`.
    Custom(Rc<str>),
}

impl LogicalType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Date => "date",
            Self::TimeMillis => "time-millis",
            Self::TimeMicros => "time-micros",
            Self::TimestampMillis => "timestamp-millis",
            Self::TimestampMicros => "timestamp-micros",
            Self::Uuid => "uuid",
            Self::Decimal { .. } => "decimal",
            Self::Custom(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ascending" => Self::Ascending,
            "descending" => Self::Descending,
            "ignore" => Self::Ignore,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
            Self::Ignore => "ignore",
        }
    }
}

/// Extra JSON attributes of a schema or field, by key.
pub type Properties = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Rc<str>,
    pub schema: Schema,
    pub doc: Option<Rc<str>>,
    pub default: Option<Value>,
    pub order: FieldOrder,
    pub aliases: Vec<Rc<str>>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive {
        primitive: Primitive,
        logical_type: Option<LogicalType>,
        properties: Properties,
    },
    Record {
        name: Name,
        doc: Option<Rc<str>>,
        aliases: Vec<Name>,
        fields: Vec<Field>,
        // Declared with `"type": "error"`.
        is_error: bool,
        properties: Properties,
    },
    Enum {
        name: Name,
        doc: Option<Rc<str>>,
        aliases: Vec<Name>,
        symbols: Vec<Rc<str>>,
        default: Option<Rc<str>>,
        properties: Properties,
    },
    Fixed {
        name: Name,
        doc: Option<Rc<str>>,
        aliases: Vec<Name>,
        size: usize,
        logical_type: Option<LogicalType>,
        properties: Properties,
    },
    Array {
        items: Schema,
        properties: Properties,
    },
    Map {
        values: Schema,
        properties: Properties,
    },
    Union {
        variants: Vec<Schema>,
    },
    /// Use of a named type declared elsewhere (or earlier in the same file).
    Reference(Name),
}

/// A shared, immutable schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    t: Rc<Type>,
}

impl From<Type> for Schema {
    fn from(t: Type) -> Self {
        Schema::new(t)
    }
}

impl Schema {
    pub fn new(t: Type) -> Self {
        Self { t: Rc::new(t) }
    }

    pub fn primitive(primitive: Primitive) -> Self {
        Self::new(Type::Primitive {
            primitive,
            logical_type: None,
            properties: Properties::new(),
        })
    }

    pub fn as_type(&self) -> &Type {
        &self.t
    }

    /// The declared name of a `record`, `error`, `enum` or `fixed` schema.
    pub fn name(&self) -> Option<&Name> {
        match self.as_type() {
            Type::Record { name, .. } | Type::Enum { name, .. } | Type::Fixed { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// Names of all named types this schema refers to, in first-use order.
    pub fn referenced_names(&self) -> Vec<Name> {
        let mut names = vec![];
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut Vec<Name>) {
        match self.as_type() {
            Type::Reference(name) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Type::Record { fields, .. } => {
                for field in fields {
                    field.schema.collect_references(names);
                }
            }
            Type::Array { items, .. } => items.collect_references(names),
            Type::Map { values, .. } => values.collect_references(names),
            Type::Union { variants } => {
                for variant in variants {
                    variant.collect_references(names);
                }
            }
            Type::Primitive { .. } | Type::Enum { .. } | Type::Fixed { .. } => (),
        }
    }

    /// JSON form of the schema. Named types are written with full names, so the
    /// output does not depend on an enclosing namespace.
    pub fn to_json(&self) -> Value {
        match self.as_type() {
            Type::Primitive {
                primitive,
                logical_type: None,
                properties,
            } if properties.is_empty() => json!(primitive.as_str()),
            Type::Primitive {
                primitive,
                logical_type,
                properties,
            } => {
                let mut obj = Map::new();
                obj.insert("type".into(), json!(primitive.as_str()));
                if let Some(logical_type) = logical_type {
                    insert_logical_type(&mut obj, logical_type);
                }
                insert_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Type::Record {
                name,
                doc,
                aliases,
                fields,
                is_error,
                properties,
            } => {
                let mut obj = named_object(if *is_error { "error" } else { "record" }, name);
                insert_doc_and_aliases(&mut obj, doc, aliases);
                let fields: Vec<Value> = fields.iter().map(field_to_json).collect();
                obj.insert("fields".into(), Value::Array(fields));
                insert_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Type::Enum {
                name,
                doc,
                aliases,
                symbols,
                default,
                properties,
            } => {
                let mut obj = named_object("enum", name);
                insert_doc_and_aliases(&mut obj, doc, aliases);
                obj.insert("symbols".into(), json!(symbols));
                if let Some(default) = default {
                    obj.insert("default".into(), json!(default));
                }
                insert_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Type::Fixed {
                name,
                doc,
                aliases,
                size,
                logical_type,
                properties,
            } => {
                let mut obj = named_object("fixed", name);
                insert_doc_and_aliases(&mut obj, doc, aliases);
                obj.insert("size".into(), json!(size));
                if let Some(logical_type) = logical_type {
                    insert_logical_type(&mut obj, logical_type);
                }
                insert_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Type::Array { items, properties } => {
                let mut obj = Map::new();
                obj.insert("type".into(), json!("array"));
                obj.insert("items".into(), items.to_json());
                insert_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Type::Map { values, properties } => {
                let mut obj = Map::new();
                obj.insert("type".into(), json!("map"));
                obj.insert("values".into(), values.to_json());
                insert_properties(&mut obj, properties);
                Value::Object(obj)
            }
            Type::Union { variants } => {
                Value::Array(variants.iter().map(Schema::to_json).collect())
            }
            Type::Reference(name) => json!(name.fullname()),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

fn named_object(kind: &str, name: &Name) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".into(), json!(kind));
    obj.insert("name".into(), json!(name.fullname()));
    obj
}

fn insert_doc_and_aliases(obj: &mut Map<String, Value>, doc: &Option<Rc<str>>, aliases: &[Name]) {
    if let Some(doc) = doc {
        obj.insert("doc".into(), json!(doc));
    }
    if !aliases.is_empty() {
        let aliases: Vec<&Rc<str>> = aliases.iter().map(Name::fullname).collect();
        obj.insert("aliases".into(), json!(aliases));
    }
}

fn insert_logical_type(obj: &mut Map<String, Value>, logical_type: &LogicalType) {
    obj.insert("logicalType".into(), json!(logical_type.as_str()));
    if let LogicalType::Decimal { precision, scale } = logical_type {
        obj.insert("precision".into(), json!(precision));
        obj.insert("scale".into(), json!(scale));
    }
}

fn insert_properties(obj: &mut Map<String, Value>, properties: &Properties) {
    for (key, value) in properties {
        obj.entry(key.as_str()).or_insert_with(|| value.clone());
    }
}

fn field_to_json(field: &Field) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(field.name));
    obj.insert("type".into(), field.schema.to_json());
    if let Some(doc) = &field.doc {
        obj.insert("doc".into(), json!(doc));
    }
    if let Some(default) = &field.default {
        obj.insert("default".into(), default.clone());
    }
    if field.order != FieldOrder::Ascending {
        obj.insert("order".into(), json!(field.order.as_str()));
    }
    if !field.aliases.is_empty() {
        obj.insert("aliases".into(), json!(field.aliases));
    }
    insert_properties(&mut obj, &field.properties);
    Value::Object(obj)
}
