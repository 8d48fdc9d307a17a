use crate::error::ValidationError;

/// Validates a login identity before it reaches any store
///
/// Identities are compared verbatim, so only emptiness is rejected here; an
/// identity made only of whitespace counts as empty.
///
/// # Examples
///
/// ```rust
/// use fail2ban_core::validation::validate_identity;
///
/// assert!(validate_identity("admin@example.com").is_ok());
/// assert!(validate_identity("  ").is_err());
/// ```
pub fn validate_identity(identity: &str) -> Result<(), ValidationError> {
    if identity.trim().is_empty() {
        return Err(ValidationError::MissingField(
            "Identity is required".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a secret was submitted at all
pub fn validate_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.is_empty() {
        return Err(ValidationError::MissingField(
            "Secret is required".to_string(),
        ));
    }

    Ok(())
}
