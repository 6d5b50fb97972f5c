//! Solver ordering options.
//!
//! # How to Add a New Option
//!
//! 1. Add an entry to the `OPTION_DEFS` array below:
//!    ```ignore
//!    OptionDef {
//!        name: "myoption",
//!        description: "What this option controls",
//!        default: OptionValue::Float(1.0),
//!        range: OptionRange::FloatRange(0.0, 100.0),
//!    },
//!    ```
//!
//! 2. Access it anywhere you have a `SolverOptions` reference:
//!    ```ignore
//!    let val = options.get_float("myoption");
//!    if options.is_set("myoption") { /* user explicitly set it */ }
//!    ```
//!
//! Parsing, validation, range checking, and duplicate warnings are all
//! handled here. Options are read once while configuring an ordering run,
//! never inside a hot loop, so the `HashMap` store is fine at this scale.

use std::collections::HashMap;

/// Typed value for a solver option.
#[derive(Debug, Clone)]
pub enum OptionValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Str(v) => write!(f, "{}", v),
            OptionValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Range constraint for validating option values.
#[derive(Debug, Clone)]
pub enum OptionRange {
    /// No constraint.
    None,
    /// Inclusive range for integers: [min, max].
    IntRange(i64, i64),
    /// Inclusive range for floats: [min, max].
    FloatRange(f64, f64),
    /// Enumerated set of allowed string values.
    StringEnum(&'static [&'static str]),
}

/// Static definition of one solver option.
#[derive(Debug, Clone)]
pub struct OptionDef {
    pub name: &'static str,
    pub description: &'static str,
    pub default: OptionValue,
    pub range: OptionRange,
}

/// All recognized ordering options. To add a new option, add one entry here.
const OPTION_DEFS: &[OptionDef] = &[
    OptionDef {
        name: "btf",
        description: "Enable block-triangular ordering",
        default: OptionValue::Bool(true),
        range: OptionRange::None,
    },
    OptionDef {
        name: "btf_large",
        description: "Block size above which a block never joins the trailing region",
        default: OptionValue::Int(500),
        range: OptionRange::IntRange(1, 1_000_000_000),
    },
    OptionDef {
        name: "btf_max_percent",
        description: "Maximum fraction of columns in the trailing region",
        default: OptionValue::Float(0.5),
        range: OptionRange::FloatRange(0.0, 1.0),
    },
    OptionDef {
        name: "btf_part_method",
        description: "Partition stopping rule",
        default: OptionValue::Str(String::new()),
        range: OptionRange::StringEnum(&["threshold", "work"]),
    },
    OptionDef {
        name: "imbalance_tolerance",
        description: "Imbalance tolerance for the work-balanced partition rule",
        default: OptionValue::Float(0.1),
        range: OptionRange::FloatRange(0.0, 10.0),
    },
    OptionDef {
        name: "thread_count",
        description: "Worker count targeted by the work-balanced partition rule",
        default: OptionValue::Int(1),
        range: OptionRange::IntRange(1, 4096),
    },
    OptionDef {
        name: "btf_amd",
        description: "Reorder each diagonal block by approximate minimum degree",
        default: OptionValue::Bool(true),
        range: OptionRange::None,
    },
];

/// A stored option entry with its current value and whether the user set it.
#[derive(Debug, Clone)]
struct OptionEntry {
    value: OptionValue,
    is_set: bool,
}

/// Container for all ordering options.
///
/// Constructed with defaults from `OPTION_DEFS`. Call `set()` to apply
/// user-specified values.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    entries: HashMap<String, OptionEntry>,
}

impl SolverOptions {
    /// Create a new `SolverOptions` populated with defaults from `OPTION_DEFS`.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for def in OPTION_DEFS {
            entries.insert(
                def.name.to_string(),
                OptionEntry {
                    value: option_default(def),
                    is_set: false,
                },
            );
        }
        Self { entries }
    }

    /// Set an option by name from a raw string value.
    ///
    /// Parses the value according to the option's type, validates against
    /// its range, and stores it. Warns on unknown options, parse errors,
    /// and out-of-range values. If the option was already set, warns about
    /// the redefinition.
    pub fn set(&mut self, key: &str, raw_value: &str) {
        let key_lower = key.to_ascii_lowercase();

        let def = match OPTION_DEFS.iter().find(|d| d.name == key_lower) {
            Some(d) => d,
            None => {
                eprintln!("warning: unknown option '{}' ignored", key);
                return;
            }
        };

        let parsed = match &def.default {
            OptionValue::Float(_) => match raw_value.parse::<f64>() {
                Ok(v) => OptionValue::Float(v),
                Err(_) => {
                    eprintln!(
                        "warning: option '{}' value '{}' is not a valid number, ignored",
                        key_lower, raw_value
                    );
                    return;
                }
            },
            OptionValue::Int(_) => match raw_value.parse::<i64>() {
                Ok(v) => OptionValue::Int(v),
                Err(_) => {
                    eprintln!(
                        "warning: option '{}' value '{}' is not a valid integer, ignored",
                        key_lower, raw_value
                    );
                    return;
                }
            },
            OptionValue::Str(_) => OptionValue::Str(raw_value.to_ascii_lowercase()),
            OptionValue::Bool(_) => {
                let v = matches!(
                    raw_value.to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                );
                OptionValue::Bool(v)
            }
        };

        if !validate_range(&parsed, &def.range) {
            eprintln!(
                "warning: option '{}' value {} out of range ({}), using default {}",
                key_lower,
                parsed,
                format_range(&def.range),
                option_default(def)
            );
            return;
        }

        if let Some(entry) = self.entries.get(&key_lower) {
            if entry.is_set {
                eprintln!(
                    "warning: option '{}' redefined (was {}), using new value {}",
                    key_lower, entry.value, parsed
                );
            }
        }

        self.entries.insert(
            key_lower,
            OptionEntry {
                value: parsed,
                is_set: true,
            },
        );
    }

    /// Get a float option value (returns 0.0 if not found).
    pub fn get_float(&self, key: &str) -> f64 {
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                OptionValue::Float(v) => *v,
                _ => 0.0,
            },
            None => 0.0,
        }
    }

    /// Get an integer option value (returns 0 if not found).
    pub fn get_int(&self, key: &str) -> i64 {
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                OptionValue::Int(v) => *v,
                _ => 0,
            },
            None => 0,
        }
    }

    /// Get a string option value (returns "" if not found).
    pub fn get_string(&self, key: &str) -> &str {
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                OptionValue::Str(v) => v.as_str(),
                _ => "",
            },
            None => "",
        }
    }

    /// Get a boolean option value (returns false if not found).
    pub fn get_bool(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                OptionValue::Bool(v) => *v,
                _ => false,
            },
            None => false,
        }
    }

    /// Check whether the user explicitly set this option.
    pub fn is_set(&self, key: &str) -> bool {
        self.entries.get(key).map_or(false, |e| e.is_set)
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Default value for a definition. String defaults are the first allowed
/// enum value, since a const table cannot carry an owned `String`.
fn option_default(def: &OptionDef) -> OptionValue {
    match (&def.default, &def.range) {
        (OptionValue::Str(_), OptionRange::StringEnum(allowed)) => {
            OptionValue::Str(allowed[0].to_string())
        }
        _ => def.default.clone(),
    }
}

fn validate_range(value: &OptionValue, range: &OptionRange) -> bool {
    match (value, range) {
        (_, OptionRange::None) => true,
        (OptionValue::Int(v), OptionRange::IntRange(lo, hi)) => v >= lo && v <= hi,
        (OptionValue::Float(v), OptionRange::FloatRange(lo, hi)) => v >= lo && v <= hi,
        (OptionValue::Str(v), OptionRange::StringEnum(allowed)) => {
            allowed.contains(&v.as_str())
        }
        _ => true,
    }
}

fn format_range(range: &OptionRange) -> String {
    match range {
        OptionRange::None => "unconstrained".to_string(),
        OptionRange::IntRange(lo, hi) => format!("[{}, {}]", lo, hi),
        OptionRange::FloatRange(lo, hi) => format!("[{}, {}]", lo, hi),
        OptionRange::StringEnum(allowed) => format!("one of {:?}", allowed),
    }
}
