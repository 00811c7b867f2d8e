//! Record types declared in configuration instead of code.
//!
//! Field types are written as expressions:
//!
//! | expression        | meaning                        |
//! |-------------------|--------------------------------|
//! | `string`, `guid`  | text                           |
//! | `integer`         | 64-bit integer                 |
//! | `int32`           | 32-bit integer                 |
//! | `boolean`         | bool                           |
//! | `float`           | double                         |
//! | `datetime`        | epoch seconds                  |
//! | `object:T`        | nested record of type `T`      |
//! | `enum:E`          | member of enumeration `E`      |
//! | `list<X>`         | list of `X`                    |
//! | `dict<X>`         | string-keyed map of `X`        |
//! | `map<K,V>`        | map; `K` must be string-like   |

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use modelwire_api::enumeration::EnumRegistry;
use modelwire_api::schema::{FieldDescriptor, LogicalType, TypeDescriptor};
use modelwire_api::value::Value;

use crate::config::{FieldConfig, ModelwireConfig, TypeConfig};
use crate::error::EngineError;

/// Resolved descriptors of every configured type, keyed by name.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: HashMap<String, Arc<TypeDescriptor>>,
    enums: HashMap<String, Arc<EnumRegistry>>,
}

impl TypeCatalog {
    pub fn from_config(config: &ModelwireConfig) -> Result<Self, EngineError> {
        let mut enums = HashMap::new();
        for e in &config.enums {
            let registry = EnumRegistry::builder(&e.name)
                .members(e.members.iter().cloned())
                .finish()?;
            if enums.insert(e.name.clone(), registry).is_some() {
                return Err(EngineError::Config(format!("enumeration '{}' defined twice", e.name)));
            }
        }

        let mut pending: HashMap<&str, &TypeConfig> = HashMap::new();
        for t in &config.types {
            if pending.insert(t.name.as_str(), t).is_some() {
                return Err(EngineError::Config(format!("type '{}' defined twice", t.name)));
            }
        }

        let mut resolver = Resolver {
            pending,
            enums: &enums,
            done: HashMap::new(),
            in_progress: HashSet::new(),
        };
        for t in &config.types {
            resolver.resolve(&t.name)?;
        }
        let types = resolver.done;
        tracing::debug!(types = types.len(), enums = enums.len(), "loaded type catalog");
        Ok(Self { types, enums })
    }

    pub fn get(&self, name: &str) -> Result<Arc<TypeDescriptor>, EngineError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownType(name.to_owned()))
    }

    pub fn enumeration(&self, name: &str) -> Option<&Arc<EnumRegistry>> {
        self.enums.get(name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

struct Resolver<'a> {
    pending: HashMap<&'a str, &'a TypeConfig>,
    enums: &'a HashMap<String, Arc<EnumRegistry>>,
    done: HashMap<String, Arc<TypeDescriptor>>,
    in_progress: HashSet<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str) -> Result<Arc<TypeDescriptor>, EngineError> {
        if let Some(done) = self.done.get(name) {
            return Ok(Arc::clone(done));
        }
        let config = *self
            .pending
            .get(name)
            .ok_or_else(|| EngineError::UnknownType(name.to_owned()))?;
        if !self.in_progress.insert(name.to_owned()) {
            return Err(EngineError::Config(format!("type '{name}' contains itself")));
        }

        let mut descriptor = TypeDescriptor::new(name);
        for field in &config.fields {
            let logical = self
                .lower(&parse_type(&field.ty)?)
                .map_err(|e| e.with_context(format_args!("{name}.{}", field.name)))?;
            let mut fd = FieldDescriptor::new(&field.name, field.id, logical);
            if let Some(default) = &field.default {
                fd.default = Some(
                    default_value(field, &fd.logical_type, default)
                        .map_err(|e| e.with_context(name))?,
                );
            }
            descriptor = descriptor.with_field(fd);
        }

        self.in_progress.remove(name);
        let descriptor = Arc::new(descriptor);
        self.done.insert(name.to_owned(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    fn lower(&mut self, expr: &TypeExpr) -> Result<LogicalType, EngineError> {
        Ok(match expr {
            TypeExpr::Scalar(logical) => logical.clone(),
            TypeExpr::Object(name) => LogicalType::Object(self.resolve(name)?),
            TypeExpr::Enum(name) => LogicalType::Enumeration(
                self.enums
                    .get(name)
                    .cloned()
                    .ok_or_else(|| EngineError::UnknownType(format!("enum:{name}")))?,
            ),
            TypeExpr::List(element) => LogicalType::list(self.lower(element)?),
            TypeExpr::Map(key, value) => LogicalType::map(self.lower(key)?, self.lower(value)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum TypeExpr {
    Scalar(LogicalType),
    Object(String),
    Enum(String),
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
}

fn parse_type(expr: &str) -> Result<TypeExpr, EngineError> {
    let expr = expr.trim();
    let bad = || EngineError::Config(format!("invalid type expression '{expr}'"));

    if let Some(inner) = generic_arg(expr, "list") {
        return Ok(TypeExpr::List(Box::new(parse_type(inner)?)));
    }
    if let Some(inner) = generic_arg(expr, "dict") {
        return Ok(TypeExpr::Map(
            Box::new(TypeExpr::Scalar(LogicalType::String)),
            Box::new(parse_type(inner)?),
        ));
    }
    if let Some(inner) = generic_arg(expr, "map") {
        let (key, value) = split_top_level(inner).ok_or_else(bad)?;
        return Ok(TypeExpr::Map(
            Box::new(parse_type(key)?),
            Box::new(parse_type(value)?),
        ));
    }
    if let Some(name) = expr.strip_prefix("object:") {
        return non_empty(name).map(TypeExpr::Object).ok_or_else(bad);
    }
    if let Some(name) = expr.strip_prefix("enum:") {
        return non_empty(name).map(TypeExpr::Enum).ok_or_else(bad);
    }

    let scalar = match expr {
        "string" => LogicalType::String,
        "guid" => LogicalType::Guid,
        "integer" => LogicalType::Integer,
        "int32" => LogicalType::Int32,
        "boolean" => LogicalType::Boolean,
        "float" => LogicalType::Float,
        "datetime" => LogicalType::DateTime,
        _ => return Err(bad()),
    };
    Ok(TypeExpr::Scalar(scalar))
}

/// `list<X>` -> `X` for `generic_arg(.., "list")`.
fn generic_arg<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    expr.strip_prefix(name)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

/// Split `K,V` at the comma that is not nested inside `<...>`.
fn split_top_level(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&inner[..i], &inner[i + 1..])),
            _ => {}
        }
    }
    None
}

fn non_empty(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

fn default_value(
    field: &FieldConfig,
    logical: &LogicalType,
    default: &toml::Value,
) -> Result<Value, EngineError> {
    let value = match (logical, default) {
        (LogicalType::String | LogicalType::Guid, toml::Value::String(s)) => Value::String(s.clone()),
        (LogicalType::Enumeration(registry), toml::Value::String(s)) => {
            registry.check(s)?;
            Value::String(s.clone())
        }
        (LogicalType::Integer | LogicalType::DateTime, toml::Value::Integer(n)) => Value::I64(*n),
        (LogicalType::Int32, toml::Value::Integer(n)) => Value::I32(i32::try_from(*n).map_err(|_| {
            EngineError::Config(format!("field '{}': default {n} does not fit int32", field.name))
        })?),
        (LogicalType::Float, toml::Value::Float(x)) => Value::Double(*x),
        (LogicalType::Float, toml::Value::Integer(n)) => Value::Double(*n as f64),
        (LogicalType::Boolean, toml::Value::Boolean(b)) => Value::Bool(*b),
        _ => {
            return Err(EngineError::Config(format!(
                "field '{}': default {default} does not match type {logical}",
                field.name
            )));
        }
    };
    Ok(value)
}
