//! Parameter binding module
//!
//! Turns decoded request input into the positional argument list declared by
//! a route's parameter schema.

mod form;

pub use form::FormData;

use crate::error::{DispatchError, HandlerError};
use crate::session::Value;

/// Declared type of a handler parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Int,
    Float,
    Bool,
    /// Receives the whole decoded input map
    Form,
}

impl ParamType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Int => "an integer",
            Self::Float => "a number",
            Self::Bool => "a boolean",
            Self::Form => "form data",
        }
    }
}

/// Parameter descriptor
///
/// A parameter is optional exactly when it carries a default.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
    pub nullable: bool,
}

impl Param {
    /// Required parameter
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            nullable: false,
        }
    }

    /// Whole-form capture
    pub fn form(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Form)
    }

    /// Make the parameter optional, falling back to `value` when absent
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Bind an absent value to `Value::Null` instead of failing
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// A bound argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Form(FormData),
}

/// Bound arguments in schema order, also addressable by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    names: Vec<String>,
    values: Vec<Arg>,
}

impl Args {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&Arg> {
        self.values.get(index)
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Scalar value of `name`; `Value::Null` for unknown names and forms
    pub fn value(&self, name: &str) -> Value {
        match self.get(name) {
            Some(Arg::Value(v)) => v.clone(),
            _ => Value::Null,
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, HandlerError> {
        self.opt_text(name)?.ok_or_else(|| null_argument(name))
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<&str>, HandlerError> {
        self.typed(name, "text", Value::as_str)
    }

    pub fn int(&self, name: &str) -> Result<i64, HandlerError> {
        self.opt_int(name)?.ok_or_else(|| null_argument(name))
    }

    pub fn opt_int(&self, name: &str) -> Result<Option<i64>, HandlerError> {
        self.typed(name, "an integer", Value::as_int)
    }

    pub fn float(&self, name: &str) -> Result<f64, HandlerError> {
        self.opt_float(name)?.ok_or_else(|| null_argument(name))
    }

    pub fn opt_float(&self, name: &str) -> Result<Option<f64>, HandlerError> {
        self.typed(name, "a number", Value::as_float)
    }

    pub fn bool(&self, name: &str) -> Result<bool, HandlerError> {
        self.opt_bool(name)?.ok_or_else(|| null_argument(name))
    }

    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>, HandlerError> {
        self.typed(name, "a boolean", Value::as_bool)
    }

    pub fn form(&self, name: &str) -> Result<&FormData, HandlerError> {
        match self.get(name) {
            Some(Arg::Form(form)) => Ok(form),
            Some(Arg::Value(_)) => Err(HandlerError::new(format!(
                "argument `{name}` is not a form capture"
            ))),
            None => Err(unknown_argument(name)),
        }
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &str,
        extract: impl Fn(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, HandlerError> {
        let value = match self.get(name) {
            Some(Arg::Value(v)) => v,
            Some(Arg::Form(_)) => {
                return Err(HandlerError::new(format!(
                    "argument `{name}` is a form capture, not {expected}"
                )))
            }
            None => return Err(unknown_argument(name)),
        };
        if value.is_null() {
            return Ok(None);
        }
        extract(value).map(Some).ok_or_else(|| {
            HandlerError::new(format!(
                "argument `{name}` is {}, not {expected}",
                value.type_name()
            ))
        })
    }

    fn push(&mut self, name: &str, arg: Arg) {
        self.names.push(name.to_string());
        self.values.push(arg);
    }
}

fn null_argument(name: &str) -> HandlerError {
    HandlerError::new(format!("argument `{name}` is null"))
}

fn unknown_argument(name: &str) -> HandlerError {
    HandlerError::new(format!("no argument named `{name}`"))
}

/// Bind `input` against `schema`
///
/// Absent (or empty) inputs resolve in this order: declared default, then
/// null for nullable parameters, otherwise `MissingParameter`. Present inputs
/// are converted to the declared type.
pub fn bind(schema: &[Param], input: &FormData) -> Result<Args, DispatchError> {
    let mut args = Args::default();

    for param in schema {
        if param.ty == ParamType::Form {
            args.push(&param.name, Arg::Form(input.clone()));
            continue;
        }

        let value = match input.get(&param.name) {
            Some(raw) => convert(param, raw)?,
            None => match &param.default {
                Some(default) => default.clone(),
                None if param.nullable => Value::Null,
                None => return Err(DispatchError::MissingParameter(param.name.clone())),
            },
        };
        args.push(&param.name, Arg::Value(value));
    }

    Ok(args)
}

fn convert(param: &Param, raw: &str) -> Result<Value, DispatchError> {
    let invalid = || DispatchError::InvalidParameterValue {
        name: param.name.clone(),
        value: raw.to_string(),
        expected: param.ty.name(),
    };

    match param.ty {
        ParamType::Text => Ok(Value::Str(raw.to_string())),
        ParamType::Int => raw.trim().parse().map(Value::Int).map_err(|_| invalid()),
        ParamType::Float => raw.trim().parse().map(Value::Float).map_err(|_| invalid()),
        ParamType::Bool => parse_bool(raw.trim()).map(Value::Bool).ok_or_else(invalid),
        ParamType::Form => Err(invalid()),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}
