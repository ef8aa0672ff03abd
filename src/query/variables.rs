//! # Dynamic Filter Variables
//!
//! Comparands may reference request-scoped values:
//! - `$NOW` (current time, RFC 3339), optionally adjusted: `$NOW(-2 days)`
//! - `$CURRENT_USER` / `$CURRENT_ROLE` (identifiers of the requester)
//!
//! A variable with no value in the context resolves to an *undefined*
//! comparand, so the leaf using it is skipped rather than compared to NULL.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;

/// Request-scoped values available to filters
#[derive(Debug, Clone, PartialEq)]
pub struct FilterContext {
    pub user: Option<String>,
    pub role: Option<String>,
    pub now: DateTime<Utc>,
}

impl Default for FilterContext {
    fn default() -> Self {
        Self {
            user: None,
            role: None,
            now: Utc::now(),
        }
    }
}

fn now_adjustment() -> &'static Regex {
    static SYNTAX: OnceLock<Regex> = OnceLock::new();
    SYNTAX.get_or_init(|| {
        Regex::new(r"^\$NOW\(\s*([+-]?\d+)\s*(second|minute|hour|day|week)s?\s*\)$")
            .expect("$NOW adjustment regex is valid")
    })
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Pin `$NOW` to a fixed instant
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Substitute a variable reference; `None` means undefined.
    ///
    /// Values that are not variable references are returned unchanged.
    pub fn resolve(&self, value: &Value) -> Option<Value> {
        let Value::String(text) = value else {
            return Some(value.clone());
        };

        match text.as_str() {
            "$CURRENT_USER" => self.user.clone().map(Value::String),
            "$CURRENT_ROLE" => self.role.clone().map(Value::String),
            "$NOW" => Some(Value::String(format_instant(self.now))),
            other if other.starts_with("$NOW(") => match self.adjusted_now(other) {
                Some(instant) => Some(Value::String(format_instant(instant))),
                None => Some(value.clone()),
            },
            _ => Some(value.clone()),
        }
    }

    fn adjusted_now(&self, expression: &str) -> Option<DateTime<Utc>> {
        let captures = now_adjustment().captures(expression)?;
        let amount: i64 = captures.get(1)?.as_str().parse().ok()?;
        let offset = match captures.get(2)?.as_str() {
            "second" => Duration::try_seconds(amount)?,
            "minute" => Duration::try_minutes(amount)?,
            "hour" => Duration::try_hours(amount)?,
            "day" => Duration::try_days(amount)?,
            _ => Duration::try_weeks(amount)?,
        };
        self.now.checked_add_signed(offset)
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}
