use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

use crate::chain::accounts::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_PROPOSAL_LEN, MAX_URL_LEN};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: serde_json::Value,
}

/// Creates a configured JsonConfig with standardized error handling for the entire project
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default().error_handler(reject)
}

/// Same error rendering for query strings
pub fn query_config() -> actix_web_validator::QueryConfig {
    actix_web_validator::QueryConfig::default().error_handler(reject)
}

/// On-chain string limits are in UTF-8 bytes, not characters.
fn within_bytes(value: &str, min: usize, max: usize, message: String) -> Result<(), ValidationError> {
    if (min..=max).contains(&value.len()) {
        return Ok(());
    }
    let mut error = ValidationError::new("length");
    error.message = Some(Cow::Owned(message));
    error.add_param(Cow::Borrowed("max_bytes"), &max);
    error.add_param(Cow::Borrowed("bytes"), &value.len());
    Err(error)
}

pub fn name_bytes(name: &str) -> Result<(), ValidationError> {
    within_bytes(name, 1, MAX_NAME_LEN, format!("Name must be between 1 and {} bytes", MAX_NAME_LEN))
}

pub fn proposal_bytes(proposal: &str) -> Result<(), ValidationError> {
    within_bytes(
        proposal,
        1,
        MAX_PROPOSAL_LEN,
        format!("Proposal must be between 1 and {} bytes", MAX_PROPOSAL_LEN),
    )
}

pub fn url_bytes(url: &str) -> Result<(), ValidationError> {
    within_bytes(url, 1, MAX_URL_LEN, format!("Submission URL is too long (max {} bytes)", MAX_URL_LEN))
}

pub fn description_bytes(description: &str) -> Result<(), ValidationError> {
    within_bytes(
        description,
        1,
        MAX_DESCRIPTION_LEN,
        format!("Description must be between 1 and {} bytes", MAX_DESCRIPTION_LEN),
    )
}

/// Flatten validation errors into one line, ordered by field name.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| errors.iter().map(move |e| field_message(&field, e)))
        .collect();
    messages.sort();
    messages.join("; ")
}

fn field_message(field: &str, error: &validator::ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("Validation error in field: {}", field))
}

fn reject(err: actix_web_validator::Error, _req: &HttpRequest) -> actix_web::Error {
    let mut fields = serde_json::Map::new();

    let error = match err {
        actix_web_validator::Error::Validate(validation_errors) => {
            for (field, errors) in validation_errors.field_errors() {
                let messages: Vec<String> = errors.iter().map(|e| field_message(&field, e)).collect();
                fields.insert(field.to_string(), serde_json::json!({"errors": messages}));
            }
            "Validation failed"
        }
        actix_web_validator::Error::Deserialize(de_err) => {
            let err_string = de_err.to_string();

            let message = if err_string.contains("EOF while parsing") {
                "Request body is empty. Expected JSON payload".to_string()
            } else if err_string.contains("unknown variant") {
                "Invalid enum value. Check allowed values for this field".to_string()
            } else {
                format!("Invalid request: {}", err_string)
            };
            fields.insert("message".to_string(), serde_json::json!(message));
            "Request validation failed"
        }
        _ => {
            fields.insert("message".to_string(), serde_json::json!("Validation error"));
            "Validation failed"
        }
    };

    let error_response = ErrorResponse {
        error: error.to_string(),
        fields: serde_json::Value::Object(fields),
    };
    actix_web::error::InternalError::from_response("", HttpResponse::BadRequest().json(error_response)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::job::models::BidRequest;
    use validator::Validate;

    #[test]
    fn describe_errors_lists_every_field() {
        let bid = BidRequest {
            amount: 0,
            proposal: String::new(),
        };
        let errors = bid.validate().unwrap_err();

        assert_eq!(
            describe_errors(&errors),
            "Bid amount must be greater than zero; Proposal must be between 1 and 1000 bytes"
        );
    }

    #[test]
    fn limits_count_utf8_bytes() {
        // 100 characters, 200 bytes
        assert!(name_bytes(&"é".repeat(100)).is_err());
        assert!(name_bytes(&"é".repeat(50)).is_ok());
        assert!(name_bytes(&"a".repeat(100)).is_ok());
        assert!(name_bytes("").is_err());

        assert!(proposal_bytes(&"€".repeat(334)).is_err());
        assert!(proposal_bytes(&"€".repeat(333)).is_ok());
        assert!(description_bytes(&"é".repeat(501)).is_err());
        assert!(url_bytes(&format!("https://example.com/{}", "é".repeat(240))).is_err());
    }

    #[test]
    fn byte_limit_error_carries_message() {
        let err = name_bytes(&"é".repeat(100)).unwrap_err();
        assert_eq!(err.code, "length");
        assert_eq!(err.message.as_deref(), Some("Name must be between 1 and 100 bytes"));
    }
}
