use email_address::EmailAddress;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::{
    errors::{ValidationError, ValidationIssue, ValidationResult},
    types::{EntityDescriptor, FieldDescriptor, FieldType, ValidationRule, ValidationScope},
};

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Checks a full document against its collection's field rules.
pub fn validate_entity_json(descriptor: &EntityDescriptor, value: &Value) -> ValidationResult<()> {
    let object = value.as_object().ok_or_else(|| {
        ValidationError::single("__entity", "validation.invalid_type", "expected object for entity payload")
    })?;

    let mut issues = Vec::new();
    for field in descriptor.fields {
        match object.get(field.name) {
            Some(field_value) => issues.extend(validate_field_assignment(field, field_value)),
            None if field.optional => {}
            None => issues.push(ValidationIssue::new(field.name, "validation.required", "field is required")),
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Checks a single value about to be stored in `field`.
pub fn validate_field_assignment(field: &FieldDescriptor, value: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if value.is_null() {
        if !field.optional {
            issues.push(ValidationIssue::new(field.name, "validation.required", "field is required"));
        }
        return issues;
    }
    if !type_matches(field.field_type, value) {
        issues.push(ValidationIssue::new(
            field.name,
            "validation.invalid_type",
            format!("expected {}", type_name(field.field_type)),
        ));
        return issues;
    }

    for descriptor in field.validations {
        match descriptor.scope {
            ValidationScope::Field => {
                validate_rule_on_value(field.name, field.field_type, &descriptor.rule, value, &mut issues);
            }
            ValidationScope::EachElement => {
                if let Some(array) = value.as_array() {
                    for element in array {
                        validate_rule_on_value(field.name, FieldType::String, &descriptor.rule, element, &mut issues);
                    }
                }
            }
        }
    }
    issues
}

fn type_matches(field_type: FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::String | FieldType::DateTime => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
    }
}

fn type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "string",
        FieldType::DateTime => "RFC 3339 timestamp",
        FieldType::Number => "number",
        FieldType::Boolean => "boolean",
        FieldType::Array => "array",
        FieldType::Object => "object",
    }
}

fn validate_rule_on_value(
    field_name: &str,
    field_type: FieldType,
    rule: &ValidationRule,
    value: &Value,
    issues: &mut Vec<ValidationIssue>,
) {
    match rule {
        ValidationRule::Length { min, max } => {
            if let Some(len) = length_for_value(field_type, value) {
                if let Some(min_len) = min
                    && len < *min_len
                {
                    issues.push(ValidationIssue::new(
                        field_name,
                        "validation.length",
                        format!("length must be at least {}", min_len),
                    ));
                }
                if let Some(max_len) = max
                    && len > *max_len
                {
                    issues.push(ValidationIssue::new(
                        field_name,
                        "validation.length",
                        format!("length must be at most {}", max_len),
                    ));
                }
            }
        }
        ValidationRule::Range { min, max } => {
            if let Some(candidate) = value.as_f64() {
                if let Some(min) = min
                    && candidate < *min
                {
                    issues.push(ValidationIssue::new(
                        field_name,
                        "validation.range",
                        format!("value must be at least {}", min),
                    ));
                }
                if let Some(max) = max
                    && candidate > *max
                {
                    issues.push(ValidationIssue::new(
                        field_name,
                        "validation.range",
                        format!("value must be at most {}", max),
                    ));
                }
            }
        }
        ValidationRule::Integer => {
            if let Some(candidate) = value.as_f64()
                && candidate.fract() != 0.0
            {
                issues.push(ValidationIssue::new(field_name, "validation.integer", "value must be a whole number"));
            }
        }
        ValidationRule::Regex { pattern } => {
            if let Some(candidate) = value.as_str()
                && Regex::new(pattern).map(|regex| !regex.is_match(candidate)).unwrap_or(false)
            {
                issues.push(ValidationIssue::new(
                    field_name,
                    "validation.regex",
                    format!("value does not match pattern {}", pattern),
                ));
            }
        }
        ValidationRule::Enum { allowed } => {
            if let Some(candidate) = value.as_str()
                && !allowed.contains(&candidate)
            {
                issues.push(ValidationIssue::new(
                    field_name,
                    "validation.enum",
                    format!("value must be one of {:?}", allowed),
                ));
            }
        }
        ValidationRule::Email => {
            if let Some(candidate) = value.as_str()
                && !is_valid_email(candidate)
            {
                issues.push(ValidationIssue::new(
                    field_name,
                    "validation.email",
                    "value must be a valid email address",
                ));
            }
        }
        ValidationRule::Url => {
            if let Some(candidate) = value.as_str()
                && !is_valid_url(candidate)
            {
                issues.push(ValidationIssue::new(field_name, "validation.url", "value must be a valid URL"));
            }
        }
    }
}

fn length_for_value(field_type: FieldType, value: &Value) -> Option<usize> {
    match field_type {
        FieldType::String | FieldType::DateTime => value.as_str().map(|s| s.chars().count()),
        FieldType::Array => value.as_array().map(|arr| arr.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationDescriptor;
    use serde_json::json;

    const NAME_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(ValidationRule::Length {
        min: Some(1),
        max: Some(5),
    })];
    const PRICE_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::field(ValidationRule::Range {
        min: Some(0.0),
        max: None,
    })];
    const RATING_RULES: &[ValidationDescriptor] = &[
        ValidationDescriptor::field(ValidationRule::Integer),
        ValidationDescriptor::field(ValidationRule::Range {
            min: Some(1.0),
            max: Some(5.0),
        }),
    ];
    const IMAGE_RULES: &[ValidationDescriptor] = &[ValidationDescriptor::each(ValidationRule::Url)];

    #[test]
    fn email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("invalid"));
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://example.com"));
        assert!(!is_valid_url("not-a-url"));
    }

    #[test]
    fn length_and_range_rules() {
        let name = FieldDescriptor::required("name", FieldType::String).rules(NAME_RULES);
        assert!(validate_field_assignment(&name, &json!("abc")).is_empty());
        assert_eq!(validate_field_assignment(&name, &json!("")).len(), 1);
        assert_eq!(validate_field_assignment(&name, &json!("abcdef"))[0].code, "validation.length");

        let price = FieldDescriptor::required("price", FieldType::Number).rules(PRICE_RULES);
        assert!(validate_field_assignment(&price, &json!(0)).is_empty());
        assert_eq!(validate_field_assignment(&price, &json!(-1.5))[0].code, "validation.range");
    }

    #[test]
    fn integer_rule_rejects_fractions() {
        let rating = FieldDescriptor::required("rating", FieldType::Number).rules(RATING_RULES);
        assert!(validate_field_assignment(&rating, &json!(4)).is_empty());
        let issues = validate_field_assignment(&rating, &json!(4.5));
        assert_eq!(issues[0].code, "validation.integer");
        assert_eq!(validate_field_assignment(&rating, &json!(6))[0].code, "validation.range");
    }

    #[test]
    fn each_element_rules_apply_to_arrays() {
        let images = FieldDescriptor::optional("images", FieldType::Array).rules(IMAGE_RULES);
        assert!(validate_field_assignment(&images, &json!(["https://a.example/x.png"])).is_empty());
        assert_eq!(validate_field_assignment(&images, &json!(["https://ok.example", "nope"])).len(), 1);
    }

    #[test]
    fn type_and_null_checks() {
        let name = FieldDescriptor::required("name", FieldType::String);
        assert_eq!(validate_field_assignment(&name, &json!(12))[0].code, "validation.invalid_type");
        assert_eq!(validate_field_assignment(&name, &Value::Null)[0].code, "validation.required");

        let avatar = FieldDescriptor::optional("avatar", FieldType::String);
        assert!(validate_field_assignment(&avatar, &Value::Null).is_empty());
    }
}
