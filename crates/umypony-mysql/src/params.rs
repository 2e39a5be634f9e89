//! `format`-style parameter substitution.
//!
//! The transport has no placeholder protocol, so parameters are escaped
//! and spliced into the statement text in a single pass:
//!
//! - `%s` takes the next positional parameter
//! - `%(name)s` takes a named parameter
//! - `%%` is a literal `%`
//!
//! Without parameters the template is sent verbatim and `%%` stays as
//! written. Templates that carry parameters must double any literal `%`.

use std::collections::HashMap;

use umypony_core::{Error, Result, Value};

/// Parameters for one `execute` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// Run the template verbatim
    #[default]
    None,
    /// Values for `%s` placeholders, in order
    Positional(Vec<Value>),
    /// Values for `%(name)s` placeholders
    Named(HashMap<String, Value>),
}

impl Params {
    pub fn is_none(&self) -> bool {
        matches!(self, Params::None)
    }

    /// Build named parameters from `(name, value)` pairs.
    pub fn named<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl From<&[Value]> for Params {
    fn from(values: &[Value]) -> Self {
        Params::Positional(values.to_vec())
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Params::Positional(values.into())
    }
}

impl From<HashMap<String, Value>> for Params {
    fn from(values: HashMap<String, Value>) -> Self {
        Params::Named(values)
    }
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Params::None
    }
}

/// Splice escaped parameters into `template`.
///
/// `literal` turns each referenced value into SQL text.
pub(crate) fn substitute<F>(template: &str, params: &Params, mut literal: F) -> Result<String>
where
    F: FnMut(&Value) -> Result<String>,
{
    if params.is_none() {
        return Ok(template.to_string());
    }

    let mut result = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();
    let mut next_positional = 0;

    while let Some(ch) = chars.next() {
        if ch != '%' {
            result.push(ch);
            continue;
        }

        match chars.next() {
            Some('%') => result.push('%'),
            Some('s') => {
                let Params::Positional(values) = params else {
                    return Err(Error::parameter(
                        "positional placeholder %s used with named parameters",
                    ));
                };
                let value = values.get(next_positional).ok_or_else(|| {
                    Error::parameter("not enough arguments for format string")
                })?;
                result.push_str(&literal(value)?);
                next_positional += 1;
            }
            Some('(') => {
                let Params::Named(values) = params else {
                    return Err(Error::parameter(
                        "named placeholder used with positional parameters",
                    ));
                };
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(Error::parameter(format!(
                                "unterminated placeholder name %({name}"
                            )));
                        }
                    }
                }
                if chars.next() != Some('s') {
                    return Err(Error::parameter(format!(
                        "placeholder %({name}) must be followed by `s`"
                    )));
                }
                let value = values
                    .get(&name)
                    .ok_or_else(|| Error::parameter(format!("no parameter named `{name}`")))?;
                result.push_str(&literal(value)?);
            }
            Some(other) => {
                return Err(Error::parameter(format!(
                    "unsupported format character `{other}`"
                )));
            }
            None => return Err(Error::parameter("incomplete format: trailing `%`")),
        }
    }

    if let Params::Positional(values) = params {
        if next_positional < values.len() {
            return Err(Error::parameter(format!(
                "not all arguments converted: {} given, {next_positional} used",
                values.len()
            )));
        }
    }

    Ok(result)
}
