//! Runtime values and dummy-data generation for the expression engine.

use super::{ParamType, PrimitiveType};
use std::collections::BTreeSet;

/// A runtime value produced by evaluating an expression, or synthesized as
/// dummy data for a parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn index(&self, i: i64) -> Option<&Value> {
        match self {
            Value::List(items) => {
                if i < 0 {
                    return None;
                }
                items.get(i as usize)
            }
            _ => None,
        }
    }
}

/// Recursively synthesizes a zero-valued instance of `ty`.
///
/// `path` accumulates the dotted key path walked so far; a self-referential
/// declaration (a map that (directly or transitively) contains itself under
/// the same key) would otherwise recurse forever, so a visited set of paths
/// guards against it by substituting `Value::Null` the second time a path
/// is seen.
pub fn dummy_value(ty: &ParamType) -> Value {
    let mut visited = BTreeSet::new();
    dummy_value_inner(ty, "$", &mut visited)
}

fn dummy_value_inner(ty: &ParamType, path: &str, visited: &mut BTreeSet<String>) -> Value {
    if !visited.insert(path.to_string()) {
        return Value::Null;
    }
    let result = match ty {
        ParamType::Primitive(PrimitiveType::Str) => Value::Str(String::new()),
        ParamType::Primitive(PrimitiveType::Int) => Value::Int(0),
        ParamType::Primitive(PrimitiveType::Float) => Value::Float(0.0),
        ParamType::Primitive(PrimitiveType::Bool) => Value::Bool(false),
        ParamType::Primitive(PrimitiveType::Any) => Value::Null,
        ParamType::List(element) => {
            let child_path = format!("{path}[]");
            Value::List(vec![dummy_value_inner(element, &child_path, visited)])
        }
        ParamType::Map(fields) => {
            let mut entries = Vec::with_capacity(fields.len());
            for (name, field_ty) in fields {
                let child_path = format!("{path}.{name}");
                entries.push((name.clone(), dummy_value_inner(field_ty, &child_path, visited)));
            }
            Value::Map(entries)
        }
    };
    visited.remove(path);
    result
}
