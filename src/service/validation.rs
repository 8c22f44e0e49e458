//! Request validation from per-field rules.

use crate::entity::{Record, ValidationRule};
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body. All required fields must be present and non-empty.
    pub fn validate(body: &Record, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        let mut fields: Vec<&String> = rules.keys().collect();
        fields.sort();
        for field in fields {
            let rule = &rules[field];
            let val = body.get(field.as_str());
            if rule.required == Some(true) && val.map_or(true, is_blank) {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for updates). A required field may be
    /// omitted but not blanked.
    pub fn validate_partial(body: &Record, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        for (field, v) in body {
            if let Some(rule) = rules.get(field) {
                if rule.required == Some(true) && is_blank(v) {
                    return Err(AppError::Validation(format!("{} is required", field)));
                }
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if is_blank(v) {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(field, v, format)?;
    }
    if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            return Err(AppError::Validation(format!("{} must be at most {} characters", field, max)));
        }
    }
    if let (Some(min), Some(s)) = (rule.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            return Err(AppError::Validation(format!("{} must be at least {} characters", field, min)));
        }
    }
    if let Some(pattern) = &rule.pattern {
        let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", field)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", field)));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let names: Vec<String> = allowed
                .iter()
                .map(|a| a.as_str().map(str::to_string).unwrap_or_else(|| a.to_string()))
                .collect();
            return Err(AppError::Validation(format!("{} must be one of: {}", field, names.join(", "))));
        }
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        let n = as_number(v).ok_or_else(|| AppError::Validation(format!("{} must be a number", field)))?;
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", field, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", field, max)));
            }
        }
    }
    Ok(())
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else { return Ok(()) };
    let ok = match format.to_lowercase().as_str() {
        "email" => s.is_empty() || Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").map(|re| re.is_match(s)).unwrap_or(false),
        "date" => s.is_empty() || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "datetime" => s.is_empty() || chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a valid {}", field, format)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> HashMap<String, ValidationRule> {
        let mut r = HashMap::new();
        r.insert("name".to_string(), ValidationRule::required());
        r.insert("type".to_string(), ValidationRule::one_of(&["raw_material", "sheet"]));
        r.insert("current_stock".to_string(), ValidationRule::at_least(0.0));
        r
    }

    fn body(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn create_requires_fields() {
        let err = RequestValidator::validate(&body(json!({"type": "sheet"})), &rules()).unwrap_err();
        assert_eq!(err.to_string(), "name is required");
        let err = RequestValidator::validate(&body(json!({"name": "  "})), &rules()).unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn enum_and_minimum_are_enforced() {
        let err = RequestValidator::validate(&body(json!({"name": "a", "type": "gold"})), &rules()).unwrap_err();
        assert_eq!(err.to_string(), "type must be one of: raw_material, sheet");
        let err = RequestValidator::validate(&body(json!({"name": "a", "current_stock": -1})), &rules()).unwrap_err();
        assert_eq!(err.to_string(), "current_stock must be at least 0");
        assert!(RequestValidator::validate(&body(json!({"name": "a", "current_stock": "5"})), &rules()).is_ok());
    }

    #[test]
    fn partial_skips_missing_required() {
        assert!(RequestValidator::validate_partial(&body(json!({"type": "sheet"})), &rules()).is_ok());
        assert!(RequestValidator::validate_partial(&body(json!({"name": null})), &rules()).is_err());
    }

    #[test]
    fn email_format() {
        let mut r = HashMap::new();
        r.insert(
            "email".to_string(),
            ValidationRule { format: Some("email".into()), ..Default::default() },
        );
        assert!(RequestValidator::validate(&body(json!({"email": "a@b.com"})), &r).is_ok());
        assert!(RequestValidator::validate(&body(json!({"email": "nope"})), &r).is_err());
    }
}
