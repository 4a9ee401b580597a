//! Value-range checks and per-symbol logging options

use std::collections::BTreeMap;

/// Outcome of checking one decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeCheckResult {
    pub passed: bool,
    pub message: String,
}

impl RangeCheckResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// A single value predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Inclusive range
    Range { min: i64, max: i64 },
    /// Value must be at least this
    Min(i64),
    /// Value must be at most this
    Max(i64),
    /// Value must equal this
    Equal(i64),
}

impl Check {
    pub fn check_value(&self, value: i64) -> RangeCheckResult {
        match *self {
            Check::Range { min, max } if value < min || value > max => RangeCheckResult::fail(
                format!("Value {} must be in the range [{}, {}]", value, min, max),
            ),
            Check::Min(min) if value < min => {
                RangeCheckResult::fail(format!("Value {} must be at least {}", value, min))
            }
            Check::Max(max) if value > max => {
                RangeCheckResult::fail(format!("Value {} must be at most {}", value, max))
            }
            Check::Equal(expected) if value != expected => {
                RangeCheckResult::fail(format!("Value {} must be equal to {}", value, expected))
            }
            _ => RangeCheckResult::pass(),
        }
    }
}

/// Logging and validation options for one symbol read
///
/// All parts are optional and compose freely: a fixed meaning string, a
/// value to meaning lookup that takes precedence over it, and an ordered list
/// of checks evaluated until the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub meaning: String,
    pub meaning_map: BTreeMap<i64, String>,
    pub checks: Vec<Check>,
}

impl Options {
    /// No checks, no meaning
    pub const NONE: Options = Options::new();

    pub const fn new() -> Self {
        Self {
            meaning: String::new(),
            meaning_map: BTreeMap::new(),
            checks: Vec::new(),
        }
    }

    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = meaning.into();
        self
    }

    pub fn with_meaning_map<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        self.meaning_map
            .extend(entries.into_iter().map(|(k, v)| (k, v.into())));
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_range(self, min: i64, max: i64) -> Self {
        self.with_check(Check::Range { min, max })
    }

    pub fn with_min(self, min: i64) -> Self {
        self.with_check(Check::Min(min))
    }

    pub fn with_max(self, max: i64) -> Self {
        self.with_check(Check::Max(max))
    }

    pub fn with_equal(self, expected: i64) -> Self {
        self.with_check(Check::Equal(expected))
    }

    /// Run the checks in order, stopping at the first failure
    pub fn validate(&self, value: i64) -> RangeCheckResult {
        for check in &self.checks {
            let result = check.check_value(value);
            if !result.passed {
                return result;
            }
        }
        RangeCheckResult::pass()
    }

    /// Meaning for a value: the lookup entry if present, else the fixed string
    pub fn meaning_for(&self, value: i64) -> String {
        self.meaning_map
            .get(&value)
            .cloned()
            .unwrap_or_else(|| self.meaning.clone())
    }
}
