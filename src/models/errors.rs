use thiserror::Error;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cart not found for customer: {customer_id}")]
    CartNotFound { customer_id: i64 },

    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: i64 },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("Username already exists")]
    UsernameTaken { username: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Password hashing failed: {message}")]
    PasswordHash { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("Item not found")]
    NotFound,

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Value out of range: {message}")]
    ValueOutOfRange { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Transaction failed: {message}")]
    TransactionFailed { message: String },

    #[error("Timeout occurred during operation")]
    Timeout,
}

impl RepositoryError {
    /// Postgres `unique_violation`
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepositoryError::ConstraintViolation { message } if message.starts_with("unique"))
    }

    /// Postgres `foreign_key_violation`
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, RepositoryError::ConstraintViolation { message } if message.starts_with("foreign key"))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::PoolTimedOut => RepositoryError::Timeout,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                RepositoryError::ConnectionFailed
            }
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                match db_err.code().as_deref() {
                    Some("23505") => RepositoryError::ConstraintViolation {
                        message: format!("unique constraint {} violated", constraint),
                    },
                    Some("23503") => RepositoryError::ConstraintViolation {
                        message: format!("foreign key constraint {} violated", constraint),
                    },
                    Some("23514") => RepositoryError::ConstraintViolation {
                        message: format!("check constraint {} violated", constraint),
                    },
                    // numeric_value_out_of_range, e.g. a quantity past i32::MAX
                    Some("22003") => RepositoryError::ValueOutOfRange {
                        message: db_err.message().to_string(),
                    },
                    _ => RepositoryError::Database {
                        message: db_err.message().to_string(),
                    },
                }
            }
            other => RepositoryError::Database {
                message: other.to_string(),
            },
        }
    }
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Field too short: {field}, min_length={min_length}, actual_length={actual_length}")]
    TooShort {
        field: String,
        min_length: usize,
        actual_length: usize,
    },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ServiceError::CartNotFound { customer_id: 42 };
        assert_eq!(error.to_string(), "Cart not found for customer: 42");

        let error = ServiceError::UsernameTaken {
            username: "alice".to_string(),
        };
        assert_eq!(error.to_string(), "Username already exists");

        let validation_error = ValidationError::RequiredField {
            field: "username".to_string(),
        };
        assert_eq!(
            validation_error.to_string(),
            "Required field missing: username"
        );
    }

    #[test]
    fn test_error_conversion() {
        let validation_error = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: "1".to_string(),
            max: "1000".to_string(),
            value: "0".to_string(),
        };

        let service_error: ServiceError = validation_error.into();
        match service_error {
            ServiceError::ValidationError { message } => {
                assert!(message.contains("Value out of range"));
            }
            _ => panic!("Expected ValidationError conversion"),
        }
    }

    #[test]
    fn test_repository_error_from_sqlx() {
        assert!(matches!(
            RepositoryError::from(sqlx::Error::RowNotFound),
            RepositoryError::NotFound
        ));
        assert!(matches!(
            RepositoryError::from(sqlx::Error::PoolTimedOut),
            RepositoryError::Timeout
        ));
        assert!(matches!(
            RepositoryError::from(sqlx::Error::PoolClosed),
            RepositoryError::ConnectionFailed
        ));
    }

    #[test]
    fn test_constraint_violation_classification() {
        let unique = RepositoryError::ConstraintViolation {
            message: "unique constraint users_username_key violated".to_string(),
        };
        assert!(unique.is_unique_violation());
        assert!(!unique.is_foreign_key_violation());

        let fk = RepositoryError::ConstraintViolation {
            message: "foreign key constraint cart_items_product_id_fkey violated".to_string(),
        };
        assert!(fk.is_foreign_key_violation());
        assert!(!fk.is_unique_violation());
    }
}
