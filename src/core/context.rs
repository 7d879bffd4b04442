//! Validation context and normalized parameter sets.
//!
//! A [`ValidationContext`] carries what a step may look at while validating:
//! the parameters the caller supplied and, when known, the dimensions of the
//! image it will receive. Validation produces [`Parameters`], the
//! fully-populated record that `apply` consumes.

use crate::core::error::StepError;
use crate::core::param::ParameterDefinition;
use crate::core::types::{Dimensions, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Context provided during step validation.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    supplied: &'a IndexMap<String, Value>,
    input: Option<Dimensions>,
}

impl<'a> ValidationContext<'a> {
    /// Create a context over caller-supplied parameters.
    pub fn new(supplied: &'a IndexMap<String, Value>) -> Self {
        Self {
            supplied,
            input: None,
        }
    }

    /// Record the dimensions of the image the step will receive.
    pub fn with_input(mut self, input: Option<Dimensions>) -> Self {
        self.input = input;
        self
    }

    /// Parameters as supplied by the caller, possibly partial.
    pub fn supplied(&self) -> &IndexMap<String, Value> {
        self.supplied
    }

    /// Dimensions of the incoming image, when known ahead of execution.
    pub fn input(&self) -> Option<Dimensions> {
        self.input
    }

    /// Fill defaults, coerce and constraint-check every declared parameter.
    ///
    /// Supplied names that the schema does not declare are rejected.
    pub fn normalize(&self, schema: &[ParameterDefinition]) -> Result<Parameters, StepError> {
        if let Some(unknown) = self
            .supplied
            .keys()
            .find(|name| !schema.iter().any(|p| &p.name == *name))
        {
            return Err(StepError::invalid(unknown.as_str(), "unknown parameter"));
        }

        let mut params = Parameters::new();
        for def in schema {
            let value = def
                .normalize(self.supplied.get(&def.name))
                .map_err(|reason| StepError::invalid(def.name.as_str(), reason))?;
            params.insert(def.name.clone(), value);
        }
        Ok(params)
    }
}

/// Normalized parameters for one step: every declared parameter present,
/// coerced to its declared type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(IndexMap<String, Value>);

impl Parameters {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Set a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Get a parameter value by name.
    pub fn get(&self, name: &str) -> Result<&Value, StepError> {
        self.0
            .get(name)
            .ok_or_else(|| StepError::execution(format!("missing parameter '{}'", name)))
    }

    /// Get an integer parameter.
    pub fn get_integer(&self, name: &str) -> Result<i64, StepError> {
        let value = self.get(name)?;
        value.as_integer().ok_or_else(|| {
            StepError::execution(format!(
                "parameter '{}' should be an integer, got {}",
                name,
                value.kind()
            ))
        })
    }

    /// Get a float parameter (integers are converted).
    pub fn get_float(&self, name: &str) -> Result<f64, StepError> {
        let value = self.get(name)?;
        value.as_float().ok_or_else(|| {
            StepError::execution(format!(
                "parameter '{}' should be a number, got {}",
                name,
                value.kind()
            ))
        })
    }

    /// Check if a parameter is present.
    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate parameters in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.0
    }

    /// Take the underlying map.
    pub fn into_map(self) -> IndexMap<String, Value> {
        self.0
    }
}

impl From<IndexMap<String, Value>> for Parameters {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::integer("radius", 5).with_min(0.0),
            ParameterDefinition::float("amount", 1.0).with_min(0.0),
        ]
    }

    #[test]
    fn test_normalize_fills_defaults_in_schema_order() {
        let mut supplied = IndexMap::new();
        supplied.insert("amount".to_string(), Value::Integer(2));
        let params = ValidationContext::new(&supplied).normalize(&schema()).unwrap();

        let names: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["radius", "amount"]);
        assert_eq!(params.get_integer("radius").unwrap(), 5);
        assert_eq!(params.get("amount").unwrap(), &Value::Float(2.0));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut supplied = IndexMap::new();
        supplied.insert("sigma".to_string(), Value::Float(1.0));
        let err = ValidationContext::new(&supplied).normalize(&schema()).unwrap_err();
        assert!(matches!(err, StepError::InvalidParameter { parameter, .. } if parameter == "sigma"));
    }

    #[test]
    fn test_constraint_failure_names_parameter() {
        let mut supplied = IndexMap::new();
        supplied.insert("radius".to_string(), Value::Integer(-1));
        let err = ValidationContext::new(&supplied).normalize(&schema()).unwrap_err();
        assert!(matches!(err, StepError::InvalidParameter { parameter, .. } if parameter == "radius"));
    }

    #[test]
    fn test_missing_parameter_is_execution_error() {
        let params = Parameters::new();
        assert!(matches!(params.get_float("factor"), Err(StepError::Execution(_))));
    }

    #[test]
    fn test_input_dimensions_round_trip() {
        let supplied = IndexMap::new();
        let ctx = ValidationContext::new(&supplied).with_input(Some(Dimensions::new(4, 3, 3)));
        assert_eq!(ctx.input(), Some(Dimensions::new(4, 3, 3)));
    }
}
