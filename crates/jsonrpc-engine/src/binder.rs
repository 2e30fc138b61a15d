//! Argument binding: request params onto a handler's declared parameters.
//!
//! Binding runs in two steps. [`bind_params`] lines the raw JSON values up
//! with the declared parameter list (positional or by name, filling omitted
//! optional parameters with `null`). [`Arguments`] then converts each value
//! into the handler's argument type and runs the validator over it.

use std::vec;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BindError;
use crate::registry::Parameter;
use crate::request::RequestParams;
use crate::validate::{self, Validator};

/// Line up request params with the declared parameters.
///
/// `declared` excludes the context argument. The result always has exactly
/// `declared.len()` entries; `Value::Null` stands for "bind the zero value".
pub fn bind_params(
    declared: &[Parameter],
    params: Option<&RequestParams>,
) -> Result<Vec<Value>, BindError> {
    match params {
        None => {
            if !declared.iter().all(|p| p.optional) {
                return Err(BindError::MissingParams);
            }
            Ok(vec![Value::Null; declared.len()])
        }
        Some(RequestParams::Array(list)) => {
            if list.len() != declared.len() {
                return Err(BindError::ListLength {
                    expected: declared.len(),
                    actual: list.len(),
                });
            }
            Ok(list.clone())
        }
        Some(RequestParams::Object(map)) => declared
            .iter()
            .map(|param| match map.get(&param.name) {
                Some(value) => Ok(value.clone()),
                None if param.optional => Ok(Value::Null),
                None => Err(BindError::MissingParam(param.name.clone())),
            })
            .collect(),
    }
}

/// Cursor over bound values, handing them out as typed arguments in order.
pub struct Arguments<'a> {
    values: vec::IntoIter<Value>,
    declared: &'a [Parameter],
    position: usize,
    validator: Option<&'a dyn Validator>,
}

impl<'a> Arguments<'a> {
    pub fn new(
        values: Vec<Value>,
        declared: &'a [Parameter],
        validator: Option<&'a dyn Validator>,
    ) -> Self {
        Self {
            values: values.into_iter(),
            declared,
            position: 0,
            validator,
        }
    }

    /// Convert the next value into `T` by deserializing it, then validate it.
    pub fn next<T>(&mut self) -> Result<T, BindError>
    where
        T: DeserializeOwned + Serialize,
    {
        let param = self.param_name();
        self.position += 1;
        let value = self.values.next().unwrap_or(Value::Null);

        let arg: T = serde_json::from_value(value)
            .map_err(|source| BindError::Conversion {
                param: param.clone(),
                source,
            })?;

        if let Some(validator) = self.validator {
            validate::validate(validator, &arg).map_err(|err| BindError::Validation {
                param,
                message: err.to_string(),
            })?;
        }
        Ok(arg)
    }

    fn param_name(&self) -> String {
        self.declared
            .get(self.position)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("#{}", self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn declared() -> Vec<Parameter> {
        vec![Parameter::required("block_id"), Parameter::optional("full")]
    }

    fn object(value: Value) -> RequestParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_absent_params_need_all_optional() {
        let err = bind_params(&declared(), None).unwrap_err();
        assert!(matches!(err, BindError::MissingParams));

        let optional = vec![Parameter::optional("a"), Parameter::optional("b")];
        assert_eq!(bind_params(&optional, None).unwrap(), vec![Value::Null, Value::Null]);
        assert!(bind_params(&[], None).unwrap().is_empty());
    }

    #[test]
    fn test_positional_must_match_exactly() {
        let params = object(json!([1]));
        let err = bind_params(&declared(), Some(&params)).unwrap_err();
        assert!(matches!(err, BindError::ListLength { expected: 2, actual: 1 }));

        let params = object(json!([1, true, "extra"]));
        assert!(bind_params(&declared(), Some(&params)).is_err());

        let params = object(json!([1, true]));
        assert_eq!(bind_params(&declared(), Some(&params)).unwrap(), vec![json!(1), json!(true)]);
    }

    #[test]
    fn test_named_params() {
        let params = object(json!({"full": true, "block_id": 7, "ignored": 1}));
        assert_eq!(bind_params(&declared(), Some(&params)).unwrap(), vec![json!(7), json!(true)]);

        let params = object(json!({"block_id": 7}));
        assert_eq!(bind_params(&declared(), Some(&params)).unwrap(), vec![json!(7), Value::Null]);

        let params = object(json!({"full": false}));
        let err = bind_params(&declared(), Some(&params)).unwrap_err();
        assert!(matches!(err, BindError::MissingParam(name) if name == "block_id"));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Range {
        from: u64,
        to: u64,
    }

    struct OrderedRange;

    impl Validator for OrderedRange {
        fn validate_struct(&self, name: &'static str, value: &Value) -> Result<(), String> {
            if name == "Range" && value["from"].as_u64() > value["to"].as_u64() {
                return Err("from must not exceed to".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_arguments_convert_in_order() {
        let declared = vec![Parameter::required("range"), Parameter::optional("limit")];
        let mut args = Arguments::new(vec![json!({"from": 1, "to": 2}), Value::Null], &declared, None);

        assert_eq!(args.next::<Range>().unwrap(), Range { from: 1, to: 2 });
        assert_eq!(args.next::<Option<u32>>().unwrap(), None);
    }

    #[test]
    fn test_arguments_run_validator() {
        let declared = vec![Parameter::required("ranges")];
        let validator = OrderedRange;
        let mut args = Arguments::new(
            vec![json!([{"from": 1, "to": 2}, {"from": 5, "to": 3}])],
            &declared,
            Some(&validator),
        );

        let err = args.next::<Vec<Range>>().unwrap_err();
        match err {
            BindError::Validation { param, message } => {
                assert_eq!(param, "ranges");
                assert!(message.contains("from must not exceed to"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_into_required_type_fails() {
        let declared = vec![Parameter::required("name")];
        let mut args = Arguments::new(vec![Value::Null], &declared, None);
        assert!(matches!(args.next::<String>(), Err(BindError::Conversion { .. })));
    }
}
