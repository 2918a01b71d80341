use super::{AddCartItemRequest, CredentialsRequest, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_CART_QUANTITY: i64 = 1000;
pub const MIN_CART_QUANTITY: i64 = 1;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;

impl Validate for AddCartItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        match self.product_id {
            Some(product_id) => validate_entity_id("productId", product_id)?,
            None => {
                return Err(ValidationError::RequiredField {
                    field: "productId".to_string(),
                })
            }
        };

        match self.quantity {
            Some(quantity) => validate_cart_quantity(quantity).map(|_| ()),
            None => Err(ValidationError::RequiredField {
                field: "quantity".to_string(),
            }),
        }
    }
}

/// Signup rules. Login only needs [`require_credentials`].
impl Validate for CredentialsRequest {
    fn validate(&self) -> ValidationResult<()> {
        let (username, password) = require_credentials(self)?;
        validate_username(username)?;
        validate_password(password)?;
        Ok(())
    }
}

/// Both credential fields must be present and non-blank
pub fn require_credentials(request: &CredentialsRequest) -> ValidationResult<(&str, &str)> {
    let username = request
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ValidationError::RequiredField {
            field: "username".to_string(),
        })?;

    let password = request
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::RequiredField {
            field: "password".to_string(),
        })?;

    Ok((username, password))
}

pub fn validate_username(username: &str) -> ValidationResult<()> {
    let length = username.chars().count();

    if length < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min_length: MIN_USERNAME_LENGTH,
            actual_length: length,
        });
    }

    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max_length: MAX_USERNAME_LENGTH,
            actual_length: length,
        });
    }

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidValue {
            field: "username".to_string(),
            value: username.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min_length: MIN_PASSWORD_LENGTH,
            actual_length: length,
        });
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max_length: MAX_PASSWORD_LENGTH,
            actual_length: length,
        });
    }

    Ok(())
}

/// Validate a per-request cart quantity and narrow it to the column type
pub fn validate_cart_quantity(quantity: i64) -> ValidationResult<i32> {
    if !(MIN_CART_QUANTITY..=MAX_CART_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_CART_QUANTITY.to_string(),
            max: MAX_CART_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }

    // Bounded by MAX_CART_QUANTITY above
    Ok(quantity as i32)
}

/// Identifiers are positive integers
pub fn validate_entity_id(field: &str, id: i64) -> ValidationResult<()> {
    if id < 1 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: id.to_string(),
            reason: "must be a positive integer".to_string(),
        });
    }
    Ok(())
}

/// Parse an identifier taken from a path segment or query string
pub fn parse_entity_id(field: &str, raw: &str) -> ValidationResult<i64> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    let id = trimmed
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidValue {
            field: field.to_string(),
            value: trimmed.to_string(),
            reason: "must be a positive integer".to_string(),
        })?;

    validate_entity_id(field, id)?;
    Ok(id)
}
