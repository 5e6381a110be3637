//! Boundary type checking of descriptor JSON.
//!
//! Runs on the raw [`Value`] before deserialization so a value of the wrong
//! JSON type is reported as [`TypeError::TypeMismatch`] naming the full
//! path of the offending key (`classes[0].fields[2].type`).

use myriad_types::TypeError;
use serde_json::Value;

/// Expected JSON shape of a descriptor value.
#[derive(Debug)]
pub(crate) enum Shape {
    Str,
    Bool,
    List(&'static Shape),
    /// Known keys and their shapes. Missing keys and `null` are left to
    /// deserialization defaults.
    Record(&'static [(&'static str, Shape)]),
}

const QUALIFIERS: Shape = Shape::List(&Shape::Str);

const SCALAR: Shape = Shape::Record(&[
    ("name", Shape::Str),
    ("type", Shape::Str),
    ("qualifiers", QUALIFIERS),
]);

const RETURNS: Shape = Shape::Record(&[("type", Shape::Str), ("qualifiers", QUALIFIERS)]);

const METHOD: Shape = Shape::Record(&[
    ("name", Shape::Str),
    ("params", Shape::List(&SCALAR)),
    ("returns", RETURNS),
    ("qualifiers", QUALIFIERS),
    ("implementation", Shape::Str),
    ("body", Shape::Str),
]);

const CLASS: Shape = Shape::Record(&[
    ("name", Shape::Str),
    ("extends", Shape::List(&Shape::Str)),
    ("abstract", Shape::Bool),
    ("coprocessor", Shape::Bool),
    ("fields", Shape::List(&SCALAR)),
    ("methods", Shape::List(&METHOD)),
]);

/// Shape of a whole descriptor file.
pub(crate) const MODULE: Shape = Shape::Record(&[
    ("module", Shape::Str),
    ("coprocessor", Shape::Bool),
    ("strict", Shape::Bool),
    ("override", Shape::Bool),
    ("lib_includes", Shape::List(&Shape::Str)),
    ("local_includes", Shape::List(&Shape::Str)),
    ("structs", Shape::List(&Shape::Str)),
    ("typedefs", Shape::List(&Shape::Str)),
    ("imports", Shape::List(&Shape::Str)),
    ("classes", Shape::List(&CLASS)),
    ("globals", Shape::List(&SCALAR)),
    ("functions", Shape::List(&METHOD)),
]);

/// Check `value` against `shape`. `path` names `value` in errors; empty for
/// the document root.
pub(crate) fn check(value: &Value, shape: &Shape, path: &str) -> Result<(), TypeError> {
    match shape {
        Shape::Str if value.is_string() => Ok(()),
        Shape::Bool if value.is_boolean() => Ok(()),
        Shape::List(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| mismatch(path, "array", value))?;
            for (i, item) in items.iter().enumerate() {
                check(item, inner, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        Shape::Record(fields) => {
            let object = value
                .as_object()
                .ok_or_else(|| mismatch(path, "object", value))?;
            for (key, field_shape) in fields.iter() {
                match object.get(*key) {
                    None | Some(Value::Null) => {}
                    Some(field) => {
                        let field_path = if path.is_empty() {
                            (*key).to_string()
                        } else {
                            format!("{path}.{key}")
                        };
                        check(field, field_shape, &field_path)?;
                    }
                }
            }
            Ok(())
        }
        Shape::Str => Err(mismatch(path, "string", value)),
        Shape::Bool => Err(mismatch(path, "boolean", value)),
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> TypeError {
    TypeError::TypeMismatch {
        parameter: if path.is_empty() { "descriptor".to_string() } else { path.to_string() },
        expected: expected.to_string(),
        found: kind_of(found).to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
