//! Path template interpolation.
//!
//! Templates use two placeholder forms: `:name` and `{dotted.path}`. Values
//! are resolved from the request's option variables; a missing variable fails
//! the call before any network I/O happens. A template may also start with a
//! `"METHOD path"` shorthand that overrides the configured HTTP method.

use http::Method;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::options::ResolvedOptions;
use crate::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_-]+)|\{(.+?)\}").expect("placeholder regex"));

/// A template resolved into a concrete request target.
#[derive(Debug)]
pub(crate) struct ResolvedPath {
    /// Method override from the `"METHOD path"` shorthand, if present.
    pub method: Option<Method>,
    /// The fully-resolved absolute URL.
    pub url: String,
}

/// Resolves a path template into the URL a request will be issued against.
///
/// Applies, in order: the method shorthand, placeholder interpolation, and
/// host prefixing for relative paths.
pub(crate) fn resolve_path(template: &str, options: &ResolvedOptions) -> Result<ResolvedPath> {
    let mut method = None;
    let mut path = template;

    let tokens: Vec<&str> = template.split(' ').collect();
    if tokens.len() == 2 {
        method = Some(parse_method(tokens[0])?);
        path = tokens[1];
    }

    let mut url = interpolate(path, &options.vars)?;
    if !url.starts_with("http") {
        url = format!("{}{}", options.host, url);
    }
    Ok(ResolvedPath { method, url })
}

/// Parses an HTTP method name, normalizing case.
pub(crate) fn parse_method(name: &str) -> Result<Method> {
    Method::from_bytes(name.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::ConfigurationError(format!("invalid HTTP method \"{name}\"")))
}

/// Substitutes every placeholder in `template` from `vars`.
///
/// Dotted placeholders descend into nested objects; every path segment must
/// exist, otherwise the call fails naming the variable and the template.
pub(crate) fn interpolate(template: &str, vars: &BTreeMap<String, Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .expect("one alternative always matches")
            .as_str();

        out.push_str(&template[last..whole.start()]);
        out.push_str(&lookup(name, vars, template)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Resolves a (possibly dotted) variable path against the option variables.
fn lookup(name: &str, vars: &BTreeMap<String, Value>, template: &str) -> Result<String> {
    let missing = || Error::Template {
        variable: name.to_string(),
        template: template.to_string(),
    };

    let mut segments = name.split('.');
    let first = segments.next().ok_or_else(missing)?;
    let mut value = vars.get(first).ok_or_else(missing)?;
    for segment in segments {
        value = value.get(segment).ok_or_else(missing)?;
    }
    Ok(render(value))
}

/// Renders a variable value into its path form.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
