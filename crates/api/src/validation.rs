use crate::error::ApiError;
use validator::{Validate, ValidationErrors};

/// Rejects the payload with one sorted `field is invalid (codes)` clause per
/// failing field, so clients see which request field to fix.
pub fn validate<T: Validate>(value: &T) -> Result<(), ApiError> {
    value
        .validate()
        .map_err(|err| ApiError::Validation(describe(&err)))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, failures)| {
            let codes: Vec<&str> = failures
                .iter()
                .map(|failure| failure.code.as_ref())
                .collect();
            format!("{field} is invalid ({})", codes.join(", "))
        })
        .collect();
    if fields.is_empty() {
        return errors.to_string();
    }
    fields.sort();
    fields.join("; ")
}
