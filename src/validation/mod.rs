use bigdecimal::BigDecimal;
use std::fmt;

pub const CURRENCY_CODE_LEN: usize = 3;
pub const GATEWAY_NAME_MAX_LEN: usize = 64;
/// Decimal places stored for an amount (NUMERIC(20,2)).
pub const AMOUNT_SCALE: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Checks a currency code and returns its sanitized form.
pub fn validate_currency(currency: &str) -> Result<String, ValidationError> {
    let currency = sanitize_string(currency);
    validate_required("currency", &currency)?;

    if currency.len() != CURRENCY_CODE_LEN || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            "currency",
            format!("must be {} uppercase letters", CURRENCY_CODE_LEN),
        ));
    }

    Ok(currency)
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

/// Returns the amount at the stored scale, rejecting extra precision.
///
/// JSON numbers arrive through a float and carry noise digits
/// (`100.10` becomes `100.1000000000000`), so trailing zeros are dropped
/// before the scale is checked.
pub fn normalize_amount(amount: &BigDecimal) -> Result<BigDecimal, ValidationError> {
    let normalized = amount.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    if scale > AMOUNT_SCALE {
        return Err(ValidationError::new(
            "amount",
            format!("must have at most {} decimal places", AMOUNT_SCALE),
        ));
    }

    Ok(normalized.with_scale(AMOUNT_SCALE))
}

pub fn validate_user_id(user_id: i64) -> ValidationResult {
    if user_id <= 0 {
        return Err(ValidationError::new("user_id", "must be a positive integer"));
    }

    Ok(())
}

pub fn validate_gateway_name(name: &str) -> ValidationResult {
    validate_required("gateway", name)?;
    validate_max_len("gateway", name, GATEWAY_NAME_MAX_LEN)
}
