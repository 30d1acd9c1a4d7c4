// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{ParseError, SchemaParser, TypeBindings};
use crate::schema::{
    is_valid_identifier, Field, FieldOrder, LogicalType, Name, Primitive, Properties, Type,
};
use crate::*;

use std::collections::BTreeSet;

use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// Parser for Avro JSON schema files (`.avsc`).
///
/// A file holds a single schema, or a JSON array (a union) of schemas. Every named type
/// declared anywhere in the document, including inline inside record fields, is
/// returned as a definition of its own.
///
/// Parsing does not depend on any [`CompilerOptions`]: every `logicalType` annotation and
/// every unrecognised attribute is kept in the definition, and code generators apply
/// their settings to the complete schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaParser;

impl JsonSchemaParser {
    pub fn new() -> Self {
        Self
    }

    fn read(source: &Source) -> Result<Value, ParseError> {
        serde_json::from_str(source.contents()).map_err(|e| ParseError::Syntax {
            message: source.message(e.line(), e.column(), "error", &e.to_string()),
        })
    }
}

impl SchemaParser for JsonSchemaParser {
    type Definition = Schema;

    fn declared_type_names(&self, source: &Source) -> Vec<Rc<str>> {
        let mut names = vec![];
        if let Ok(value) = Self::read(source) {
            scan_declarations(&value, None, &mut names);
        }
        names
    }

    fn parse(
        &self,
        source: &Source,
        known: &TypeBindings<Schema>,
    ) -> Result<TypeBindings<Schema>, ParseError> {
        let value = Self::read(source)?;
        let mut ctx = ParseContext {
            known,
            visible: BTreeSet::new(),
            defined: TypeBindings::new(),
        };
        ctx.parse_schema(&value, None)?;
        Ok(ctx.defined)
    }
}

fn scan_declarations(value: &Value, namespace: Option<&str>, names: &mut Vec<Rc<str>>) {
    match value {
        Value::Array(items) => {
            for item in items {
                scan_declarations(item, namespace, names);
            }
        }
        Value::Object(obj) => match obj.get("type") {
            Some(Value::String(t)) => match t.as_str() {
                "record" | "error" | "enum" | "fixed" => {
                    let name = match obj.get("name").and_then(Value::as_str) {
                        Some(name) => Name::new(name, declared_namespace(obj, namespace)).ok(),
                        None => None,
                    };
                    let inner_namespace = match &name {
                        Some(name) => name.namespace(),
                        None => namespace,
                    };
                    if let Some(name) = &name {
                        names.push(name.fullname().clone());
                    }
                    if let Some(Value::Array(fields)) = obj.get("fields") {
                        for field in fields {
                            if let Some(t) = field.get("type") {
                                scan_declarations(t, inner_namespace, names);
                            }
                        }
                    }
                }
                "array" => {
                    if let Some(items) = obj.get("items") {
                        scan_declarations(items, namespace, names);
                    }
                }
                "map" => {
                    if let Some(values) = obj.get("values") {
                        scan_declarations(values, namespace, names);
                    }
                }
                _ => (),
            },
            Some(nested) => scan_declarations(nested, namespace, names),
            None => (),
        },
        _ => (),
    }
}

fn declared_namespace<'a>(obj: &'a Object, enclosing: Option<&'a str>) -> Option<&'a str> {
    match obj.get("namespace") {
        Some(Value::String(ns)) => Some(ns.as_str()),
        _ => enclosing,
    }
}

fn invalid(msg: impl Into<String>) -> ParseError {
    ParseError::InvalidSchema(msg.into())
}

fn optional_str(obj: &Object, key: &str) -> Result<Option<Rc<str>>, ParseError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str().into())),
        Some(v) => Err(invalid(format!("'{key}' must be a string, found {v}"))),
    }
}

fn required_str<'a>(obj: &'a Object, key: &str, what: &str) -> Result<&'a str, ParseError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(v) => Err(invalid(format!("{what} '{key}' must be a string, found {v}"))),
        None => Err(invalid(format!("{what} has no '{key}': {}", Value::Object(obj.clone())))),
    }
}

// Keys of `obj` outside `reserved`, kept verbatim.
fn properties(obj: &Object, reserved: &[&str]) -> Properties {
    obj.iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

const ARRAY_KEYS: &[&str] = &["type", "items"];
const MAP_KEYS: &[&str] = &["type", "values"];
const RECORD_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "fields"];
const ENUM_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "symbols", "default"];
const FIXED_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "size", "logicalType"];
const PRIMITIVE_KEYS: &[&str] = &["type", "logicalType"];
const FIELD_KEYS: &[&str] = &["name", "type", "doc", "default", "order", "aliases"];

fn string_list<'a>(obj: &'a Object, key: &str) -> Result<Vec<&'a str>, ParseError> {
    match obj.get(key) {
        None => Ok(vec![]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| invalid(format!("'{key}' entries must be strings, found {item}")))
            })
            .collect(),
        Some(v) => Err(invalid(format!("'{key}' must be an array, found {v}"))),
    }
}

struct ParseContext<'a> {
    known: &'a TypeBindings<Schema>,
    // Names declared so far in this file, including those still being parsed.
    visible: BTreeSet<Rc<str>>,
    defined: TypeBindings<Schema>,
}

impl ParseContext<'_> {
    fn parse_schema(&mut self, value: &Value, namespace: Option<&str>) -> Result<Schema, ParseError> {
        match value {
            Value::String(name) => match Primitive::from_name(name) {
                Some(primitive) => Ok(Schema::primitive(primitive)),
                None => self.resolve(name, namespace),
            },
            Value::Array(variants) => self.parse_union(variants, namespace),
            Value::Object(obj) => match obj.get("type") {
                Some(Value::String(t)) => match t.as_str() {
                    "record" | "error" => self.parse_record(obj, namespace, t == "error"),
                    "enum" => self.parse_enum(obj, namespace),
                    "fixed" => self.parse_fixed(obj, namespace),
                    "array" => {
                        let items = obj
                            .get("items")
                            .ok_or_else(|| invalid("array has no 'items'"))?;
                        let items = self.parse_schema(items, namespace)?;
                        Ok(Type::Array {
                            items,
                            properties: properties(obj, ARRAY_KEYS),
                        }
                        .into())
                    }
                    "map" => {
                        let values = obj
                            .get("values")
                            .ok_or_else(|| invalid("map has no 'values'"))?;
                        let values = self.parse_schema(values, namespace)?;
                        Ok(Type::Map {
                            values,
                            properties: properties(obj, MAP_KEYS),
                        }
                        .into())
                    }
                    other => match Primitive::from_name(other) {
                        Some(primitive) => {
                            let (logical_type, properties) = annotations(
                                obj,
                                PRIMITIVE_KEYS,
                                LogicalBase::Primitive(primitive),
                            );
                            Ok(Type::Primitive {
                                primitive,
                                logical_type,
                                properties,
                            }
                            .into())
                        }
                        None => self.resolve(other, namespace),
                    },
                },
                Some(nested @ (Value::Object(_) | Value::Array(_))) => {
                    self.parse_schema(nested, namespace)
                }
                Some(v) => Err(invalid(format!("'type' must be a string, object or array, found {v}"))),
                None => Err(invalid(format!("no type: {value}"))),
            },
            _ => Err(invalid(format!("not a schema: {value}"))),
        }
    }

    fn resolve(&self, name: &str, namespace: Option<&str>) -> Result<Schema, ParseError> {
        let qualified = Name::new(name, namespace).map_err(invalid)?;
        let mut candidates = vec![qualified.clone()];
        if qualified.fullname().as_ref() != name {
            candidates.push(Name::new(name, None).map_err(invalid)?);
        }

        for candidate in candidates {
            let fullname = candidate.fullname();
            if self.visible.contains(fullname) || self.known.contains_key(fullname) {
                return Ok(Type::Reference(candidate).into());
            }
        }

        Err(ParseError::UnresolvedReference {
            name: qualified.fullname().clone(),
        })
    }

    fn parse_union(&mut self, variants: &[Value], namespace: Option<&str>) -> Result<Schema, ParseError> {
        let mut seen = BTreeSet::new();
        let mut schemas = Vec::with_capacity(variants.len());
        for variant in variants {
            let schema = self.parse_schema(variant, namespace)?;
            let key: Rc<str> = match schema.as_type() {
                Type::Union { .. } => {
                    return Err(invalid("unions may not immediately contain other unions"))
                }
                Type::Primitive { primitive, .. } => primitive.as_str().into(),
                Type::Array { .. } => "array".into(),
                Type::Map { .. } => "map".into(),
                Type::Reference(name) => name.fullname().clone(),
                Type::Record { name, .. } | Type::Enum { name, .. } | Type::Fixed { name, .. } => {
                    name.fullname().clone()
                }
            };
            if !seen.insert(key.clone()) {
                return Err(invalid(format!("duplicate in union: {key}")));
            }
            schemas.push(schema);
        }
        Ok(Type::Union { variants: schemas }.into())
    }

    fn declare(&mut self, obj: &Object, namespace: Option<&str>) -> Result<Declaration, ParseError> {
        let name = required_str(obj, "name", "named type")?;
        let name = Name::new(name, declared_namespace(obj, namespace)).map_err(invalid)?;
        let aliases = string_list(obj, "aliases")?
            .into_iter()
            .map(|alias| Name::new(alias, name.namespace()).map_err(invalid))
            .collect::<Result<Vec<_>, _>>()?;
        let doc = optional_str(obj, "doc")?;

        self.visible.insert(name.fullname().clone());
        Ok(Declaration { name, doc, aliases })
    }

    fn define(&mut self, schema: Schema) -> Result<Schema, ParseError> {
        let Some(name) = schema.name().cloned() else {
            return Ok(schema);
        };
        let fullname = name.fullname().clone();
        match self.defined.get(&fullname) {
            Some(existing) if existing != &schema => {
                return Err(ParseError::ConflictingDefinition { name: fullname })
            }
            Some(_) => (),
            None => {
                self.defined.insert(fullname, schema);
            }
        }
        Ok(Type::Reference(name).into())
    }

    fn parse_record(
        &mut self,
        obj: &Object,
        namespace: Option<&str>,
        is_error: bool,
    ) -> Result<Schema, ParseError> {
        let Declaration { name, doc, aliases } = self.declare(obj, namespace)?;
        let fields = match obj.get("fields") {
            Some(Value::Array(fields)) => fields,
            Some(v) => return Err(invalid(format!("record '{name}' fields must be an array, found {v}"))),
            None => return Err(invalid(format!("record '{name}' has no fields"))),
        };

        let mut field_names = BTreeSet::new();
        let mut parsed = Vec::with_capacity(fields.len());
        for field in fields {
            let Value::Object(field) = field else {
                return Err(invalid(format!("record '{name}' has a non-object field: {field}")));
            };
            let field_name = required_str(field, "name", "field")?;
            if !is_valid_identifier(field_name) {
                return Err(invalid(format!("invalid field name '{field_name}' in record '{name}'")));
            }
            if !field_names.insert(field_name) {
                return Err(invalid(format!("duplicate field '{field_name}' in record '{name}'")));
            }

            let field_type = field
                .get("type")
                .ok_or_else(|| invalid(format!("field '{field_name}' in record '{name}' has no type")))?;
            let schema = self.parse_schema(field_type, name.namespace())?;

            let order = match optional_str(field, "order")? {
                Some(order) => FieldOrder::from_name(&order)
                    .ok_or_else(|| invalid(format!("invalid order '{order}' for field '{field_name}'")))?,
                None => FieldOrder::default(),
            };

            parsed.push(Field {
                name: field_name.into(),
                schema,
                doc: optional_str(field, "doc")?,
                default: field.get("default").cloned(),
                order,
                aliases: string_list(field, "aliases")?
                    .into_iter()
                    .map(Rc::from)
                    .collect(),
                properties: properties(field, FIELD_KEYS),
            });
        }

        self.define(
            Type::Record {
                name,
                doc,
                aliases,
                fields: parsed,
                is_error,
                properties: properties(obj, RECORD_KEYS),
            }
            .into(),
        )
    }

    fn parse_enum(&mut self, obj: &Object, namespace: Option<&str>) -> Result<Schema, ParseError> {
        let Declaration { name, doc, aliases } = self.declare(obj, namespace)?;
        if !matches!(obj.get("symbols"), Some(Value::Array(_))) {
            return Err(invalid(format!("enum '{name}' has no symbols array")));
        }

        let mut symbols: Vec<Rc<str>> = vec![];
        for symbol in string_list(obj, "symbols")? {
            if !is_valid_identifier(symbol) {
                return Err(invalid(format!("invalid symbol '{symbol}' in enum '{name}'")));
            }
            if symbols.iter().any(|s| s.as_ref() == symbol) {
                return Err(invalid(format!("duplicate symbol '{symbol}' in enum '{name}'")));
            }
            symbols.push(symbol.into());
        }

        let default = optional_str(obj, "default")?;
        if let Some(default) = &default {
            if !symbols.contains(default) {
                return Err(invalid(format!(
                    "default '{default}' is not a symbol of enum '{name}'"
                )));
            }
        }

        self.define(
            Type::Enum {
                name,
                doc,
                aliases,
                symbols,
                default,
                properties: properties(obj, ENUM_KEYS),
            }
            .into(),
        )
    }

    fn parse_fixed(&mut self, obj: &Object, namespace: Option<&str>) -> Result<Schema, ParseError> {
        let Declaration { name, doc, aliases } = self.declare(obj, namespace)?;
        let size = match obj.get("size").and_then(Value::as_u64) {
            Some(size) => usize::try_from(size)
                .map_err(|_| invalid(format!("fixed '{name}' size {size} is too large")))?,
            None => return Err(invalid(format!("fixed '{name}' has no valid size"))),
        };
        let (logical_type, properties) = annotations(obj, FIXED_KEYS, LogicalBase::Fixed(size));

        self.define(
            Type::Fixed {
                name,
                doc,
                aliases,
                size,
                logical_type,
                properties,
            }
            .into(),
        )
    }
}

struct Declaration {
    name: Name,
    doc: Option<Rc<str>>,
    aliases: Vec<Name>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogicalBase {
    Primitive(Primitive),
    Fixed(usize),
}

/// Logical type and extra properties of a primitive or fixed schema. An annotation that
/// is not valid for its underlying type stays in the properties untouched.
fn annotations(
    obj: &Object,
    reserved: &[&str],
    base: LogicalBase,
) -> (Option<LogicalType>, Properties) {
    let mut properties = properties(obj, reserved);
    let logical_type = logical_type(obj, base);
    match &logical_type {
        Some(LogicalType::Decimal { .. }) => {
            properties.remove("precision");
            properties.remove("scale");
        }
        Some(_) => (),
        None => {
            if let Some(annotation) = obj.get("logicalType") {
                properties.insert("logicalType".into(), annotation.clone());
            }
        }
    }
    (logical_type, properties)
}

fn logical_type(obj: &Object, base: LogicalBase) -> Option<LogicalType> {
    let logical_type = match obj.get("logicalType")?.as_str()? {
        "date" => LogicalType::Date,
        "time-millis" => LogicalType::TimeMillis,
        "time-micros" => LogicalType::TimeMicros,
        "timestamp-millis" => LogicalType::TimestampMillis,
        "timestamp-micros" => LogicalType::TimestampMicros,
        "uuid" => LogicalType::Uuid,
        "decimal" => return decimal(obj, base),
        other => return Some(LogicalType::Custom(other.into())),
    };

    let expected = match logical_type {
        LogicalType::Date | LogicalType::TimeMillis => Primitive::Int,
        LogicalType::Uuid => Primitive::String,
        _ => Primitive::Long,
    };
    (base == LogicalBase::Primitive(expected)).then_some(logical_type)
}

fn decimal(obj: &Object, base: LogicalBase) -> Option<LogicalType> {
    let precision = u32::try_from(obj.get("precision")?.as_u64()?).ok()?;
    let scale = match obj.get("scale") {
        Some(scale) => u32::try_from(scale.as_u64()?).ok()?,
        None => 0,
    };
    if precision == 0 || scale > precision {
        return None;
    }

    match base {
        LogicalBase::Primitive(Primitive::Bytes) => (),
        LogicalBase::Fixed(size) if size > 0 && precision <= max_fixed_precision(size) => (),
        _ => return None,
    }
    Some(LogicalType::Decimal { precision, scale })
}

// Number of base-10 digits that fit in a two's complement value of `size` bytes.
fn max_fixed_precision(size: usize) -> u32 {
    let bits = size.saturating_mul(8).saturating_sub(1);
    let digits = (bits as f64 * 2f64.log10()).floor();
    if digits >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        digits as u32
    }
}
