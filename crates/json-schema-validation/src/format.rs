//! Semantic checks for the `format` keyword.
//!
//! A [`FormatChecker`] maps format names to check functions. Each check
//! declares which error types it "raises": those are translated into a
//! [`FormatError`] carrying the original error as its cause. Any other
//! error escapes as [`FormatCheckError::Unhandled`].
//!
//! Unknown formats always conform, and checks only constrain the JSON
//! types they are written for.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::net::{AddrParseError, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::draft::Draft;
use crate::error::{BoxError, SharedError};

/// A format check: `Ok(true)` conforms, `Ok(false)` or a declared error does not.
pub type FormatFn = Arc<dyn Fn(&Value) -> Result<bool, BoxError> + Send + Sync>;

/// Recognizes an error type a check is allowed to raise.
pub type ErrorMatcher = fn(&(dyn std::error::Error + Send + Sync + 'static)) -> bool;

/// Matcher for errors of type `E`
pub fn raises<E: std::error::Error + 'static>() -> ErrorMatcher {
    |error| error.is::<E>()
}

/// An instance did not conform to its format.
#[derive(Debug, Clone)]
pub struct FormatError {
    pub message: String,
    pub cause: Option<SharedError>,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Clone, Error)]
pub enum FormatCheckError {
    #[error(transparent)]
    Invalid(FormatError),

    /// The check raised an error it did not declare.
    #[error("format checker for '{format}' raised an undeclared error: {source}")]
    Unhandled { format: String, source: SharedError },
}

#[derive(Clone)]
struct Check {
    function: FormatFn,
    raises: Vec<ErrorMatcher>,
}

/// Registry of format name to check function.
#[derive(Clone, Default)]
pub struct FormatChecker {
    checkers: HashMap<String, Check>,
}

impl fmt::Debug for FormatChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatChecker")
            .field("formats", &self.formats())
            .finish()
    }
}

impl FormatChecker {
    /// Create a checker that knows no formats
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in format, under every draft's name for it
    pub fn all() -> Self {
        let mut checker = Self::new();
        for draft in Draft::ALL {
            for (name, check) in builtins(draft) {
                checker.checkers.insert(name.to_string(), check);
            }
        }
        checker
    }

    /// The built-in formats of one draft
    pub fn for_draft(draft: Draft) -> Self {
        let checkers = builtins(draft)
            .into_iter()
            .map(|(name, check)| (name.to_string(), check))
            .collect();
        Self { checkers }
    }

    /// Built-in checks restricted to the given names
    pub fn with_formats<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut all = Self::all();
        let checkers = formats
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                all.checkers.remove(name).map(|check| (name.to_string(), check))
            })
            .collect();
        Self { checkers }
    }

    /// Return a new checker with `format` bound to `check`.
    ///
    /// Errors matched by `raises` mark the instance as non-conforming.
    pub fn checks<F>(&self, format: impl Into<String>, raises: &[ErrorMatcher], check: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        let mut checkers = self.checkers.clone();
        checkers.insert(
            format.into(),
            Check {
                function: Arc::new(check),
                raises: raises.to_vec(),
            },
        );
        Self { checkers }
    }

    /// Known format names, sorted
    pub fn formats(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.checkers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn knows(&self, format: &str) -> bool {
        self.checkers.contains_key(format)
    }

    /// Check `instance` against `format`
    pub fn check(&self, instance: &Value, format: &str) -> Result<(), FormatCheckError> {
        let Some(check) = self.checkers.get(format) else {
            return Ok(());
        };

        let not_a = || format!("{} is not a {}", instance, Value::String(format.to_string()));
        match (check.function)(instance) {
            Ok(true) => Ok(()),
            Ok(false) => Err(FormatCheckError::Invalid(FormatError {
                message: not_a(),
                cause: None,
            })),
            Err(error) => {
                if check.raises.iter().any(|matches| matches(&*error)) {
                    Err(FormatCheckError::Invalid(FormatError {
                        message: not_a(),
                        cause: Some(Arc::from(error)),
                    }))
                } else {
                    Err(FormatCheckError::Unhandled {
                        format: format.to_string(),
                        source: Arc::from(error),
                    })
                }
            }
        }
    }

    /// Whether `instance` conforms to `format`.
    ///
    /// Undeclared errors from the check still propagate.
    pub fn conforms(&self, instance: &Value, format: &str) -> Result<bool, FormatCheckError> {
        match self.check(instance, format) {
            Ok(()) => Ok(true),
            Err(FormatCheckError::Invalid(_)) => Ok(false),
            Err(error) => Err(error),
        }
    }
}

fn builtin(function: fn(&str) -> Result<bool, BoxError>, raises: Vec<ErrorMatcher>) -> Check {
    Check {
        function: Arc::new(move |instance: &Value| match instance.as_str() {
            Some(text) => function(text),
            None => Ok(true),
        }),
        raises,
    }
}

fn builtins(draft: Draft) -> Vec<(&'static str, Check)> {
    let mut checks = vec![
        ("email", builtin(is_email, vec![])),
        ("ipv6", builtin(is_ipv6, vec![raises::<AddrParseError>()])),
        ("uri", builtin(is_uri, vec![raises::<url::ParseError>()])),
        (
            "date-time",
            builtin(is_date_time, vec![raises::<chrono::ParseError>()]),
        ),
        ("regex", builtin(is_regex, vec![raises::<regex::Error>()])),
    ];
    match draft {
        Draft::Draft3 => checks.extend([
            ("ip-address", builtin(is_ipv4, vec![raises::<AddrParseError>()])),
            ("host-name", builtin(is_host_name, vec![])),
            ("date", builtin(is_date, vec![raises::<chrono::ParseError>()])),
            ("time", builtin(is_time, vec![raises::<chrono::ParseError>()])),
            ("color", builtin(is_css21_color, vec![])),
        ]),
        Draft::Draft4 => checks.extend([
            ("ipv4", builtin(is_ipv4, vec![raises::<AddrParseError>()])),
            ("hostname", builtin(is_host_name, vec![])),
        ]),
        Draft::Draft6 => checks.extend([
            ("ipv4", builtin(is_ipv4, vec![raises::<AddrParseError>()])),
            ("hostname", builtin(is_host_name, vec![])),
            (
                "uri-reference",
                builtin(is_uri_reference, vec![raises::<url::ParseError>()]),
            ),
            ("json-pointer", builtin(is_json_pointer, vec![])),
            ("uri-template", builtin(is_uri_template, vec![])),
        ]),
    }
    checks
}

static HOST_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.\-]{1,255}$").expect("host name pattern is valid")
});

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("color pattern is valid")
});

const CSS21_COLOR_NAMES: &[&str] = &[
    "aqua", "black", "blue", "fuchsia", "gray", "green", "lime", "maroon", "navy", "olive",
    "orange", "purple", "red", "silver", "teal", "white", "yellow",
];

fn is_email(text: &str) -> Result<bool, BoxError> {
    Ok(text.contains('@'))
}

fn is_ipv4(text: &str) -> Result<bool, BoxError> {
    text.parse::<Ipv4Addr>()?;
    Ok(true)
}

fn is_ipv6(text: &str) -> Result<bool, BoxError> {
    text.parse::<Ipv6Addr>()?;
    Ok(true)
}

fn is_host_name(text: &str) -> Result<bool, BoxError> {
    Ok(HOST_NAME.is_match(text) && text.split('.').all(|component| component.len() <= 63))
}

fn is_uri(text: &str) -> Result<bool, BoxError> {
    Url::parse(text)?;
    Ok(true)
}

fn is_uri_reference(text: &str) -> Result<bool, BoxError> {
    if text.chars().any(char::is_whitespace) {
        return Ok(false);
    }
    match Url::parse(text) {
        Ok(_) => Ok(true),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(crate::resolver::DEFAULT_BASE_URI)?.join(text)?;
            Ok(true)
        }
        Err(error) => Err(error.into()),
    }
}

fn is_date_time(text: &str) -> Result<bool, BoxError> {
    chrono::DateTime::parse_from_rfc3339(text)?;
    Ok(true)
}

fn is_date(text: &str) -> Result<bool, BoxError> {
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")?;
    Ok(true)
}

fn is_time(text: &str) -> Result<bool, BoxError> {
    chrono::NaiveTime::parse_from_str(text, "%H:%M:%S")?;
    Ok(true)
}

fn is_regex(text: &str) -> Result<bool, BoxError> {
    Regex::new(text)?;
    Ok(true)
}

fn is_json_pointer(text: &str) -> Result<bool, BoxError> {
    if text.is_empty() {
        return Ok(true);
    }
    if !text.starts_with('/') {
        return Ok(false);
    }
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_uri_template(text: &str) -> Result<bool, BoxError> {
    let mut open = false;
    for c in text.chars() {
        match c {
            '{' if open => return Ok(false),
            '{' => open = true,
            '}' if !open => return Ok(false),
            '}' => open = false,
            _ => {}
        }
    }
    Ok(!open)
}

fn is_css21_color(text: &str) -> Result<bool, BoxError> {
    Ok(CSS21_COLOR_NAMES.contains(&text.to_lowercase().as_str()) || HEX_COLOR.is_match(text))
}
