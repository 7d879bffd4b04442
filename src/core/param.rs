//! Parameter definitions and constraints for steps.
//!
//! Each step declares an ordered parameter schema. A definition carries the
//! semantic type, the default used when the caller omits the parameter, and
//! the constraints a supplied value must satisfy.

use crate::core::types::{ParamType, Value};
use serde::{Deserialize, Serialize};

/// Definition of a step parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterDefinition {
    /// Unique name within the step
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Type of the parameter
    pub param_type: ParamType,
    /// Value used when the caller omits this parameter
    pub default_value: Value,
    /// Description for documentation
    pub description: String,
    /// Constraints for validation
    pub constraints: Vec<Constraint>,
}

/// Constraints that can be applied to numeric parameter values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "params")]
pub enum Constraint {
    /// Numeric value must be within range [min, max]
    Range { min: f64, max: f64 },
    /// Numeric value must be >= min
    MinValue(f64),
    /// Numeric value must be <= max
    MaxValue(f64),
    /// Numeric value must be >= 0
    NonNegative,
}

// ============================================================================
// ParameterDefinition Builder Pattern
// ============================================================================

impl ParameterDefinition {
    /// Create a new parameter definition.
    pub fn new(name: impl Into<String>, param_type: ParamType, default_value: impl Into<Value>) -> Self {
        let name = name.into();
        Self {
            display_name: name_to_display(&name),
            name,
            param_type,
            default_value: default_value.into(),
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Shorthand for a float parameter.
    pub fn float(name: impl Into<String>, default_value: f64) -> Self {
        Self::new(name, ParamType::Float, Value::Float(default_value))
    }

    /// Shorthand for an integer parameter.
    pub fn integer(name: impl Into<String>, default_value: i64) -> Self {
        Self::new(name, ParamType::Integer, Value::Integer(default_value))
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a range constraint.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        self
    }

    /// Add a minimum value constraint.
    pub fn with_min(mut self, min: f64) -> Self {
        self.constraints.push(Constraint::MinValue(min));
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Resolve the value this parameter takes: the supplied one, or the
    /// default when omitted, coerced to the declared type and checked against
    /// every constraint.
    pub fn normalize(&self, supplied: Option<&Value>) -> Result<Value, String> {
        let value = supplied.unwrap_or(&self.default_value);
        let value = self.param_type.coerce(value)?;
        for constraint in &self.constraints {
            constraint.validate(&value)?;
        }
        Ok(value)
    }

    /// Smallest accepted value, if bounded below.
    pub fn min_value(&self) -> Option<f64> {
        self.constraints
            .iter()
            .filter_map(|c| c.bounds().0)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    /// Largest accepted value, if bounded above.
    pub fn max_value(&self) -> Option<f64> {
        self.constraints
            .iter()
            .filter_map(|c| c.bounds().1)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
    }
}

/// Convert snake_case name to Title Case display name.
pub(crate) fn name_to_display(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Constraint Validation
// ============================================================================

impl Constraint {
    /// Validate a value against this constraint.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(num) = value.as_float() else {
            return Ok(());
        };
        match self {
            Constraint::Range { min, max } => {
                if num < *min || num > *max {
                    return Err(format!("value {} is out of range [{}, {}]", num, min, max));
                }
            }
            Constraint::MinValue(min) => {
                if num < *min {
                    return Err(format!("value {} is below minimum {}", num, min));
                }
            }
            Constraint::MaxValue(max) => {
                if num > *max {
                    return Err(format!("value {} is above maximum {}", num, max));
                }
            }
            Constraint::NonNegative => {
                if num < 0.0 {
                    return Err(format!("value {} must be non-negative", num));
                }
            }
        }
        Ok(())
    }

    /// Inclusive lower and upper bounds implied by this constraint.
    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        match self {
            Constraint::Range { min, max } => (Some(*min), Some(*max)),
            Constraint::MinValue(min) => (Some(*min), None),
            Constraint::MaxValue(max) => (None, Some(*max)),
            Constraint::NonNegative => (Some(0.0), None),
        }
    }

    /// Get a human-readable description of this constraint.
    pub fn description(&self) -> String {
        match self {
            Constraint::Range { min, max } => format!("Must be between {} and {}", min, max),
            Constraint::MinValue(min) => format!("Must be at least {}", min),
            Constraint::MaxValue(max) => format!("Must be at most {}", max),
            Constraint::NonNegative => "Must be non-negative".to_string(),
        }
    }
}
