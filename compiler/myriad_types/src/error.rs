//! Type-level errors.

use thiserror::Error;

/// Error raised while constructing or validating type-model values.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Malformed type, qualifier, identifier or signature.
    #[error("invalid type: {message}")]
    InvalidType { message: String },

    /// A field name collides with another field of the struct or of any
    /// struct in its ancestor chain.
    #[error("duplicate field `{field}` in struct `{struct_name}` (already declared in `{declared_in}`)")]
    DuplicateField {
        struct_name: String,
        field: String,
        declared_in: String,
    },

    /// A boundary value does not have the type its parameter declares.
    #[error("type mismatch for `{parameter}`: expected {expected}, found {found}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        found: String,
    },
}

impl TypeError {
    /// Shorthand for [`TypeError::InvalidType`].
    pub fn invalid(message: impl Into<String>) -> Self {
        TypeError::InvalidType {
            message: message.into(),
        }
    }
}

/// Whether `ident` is a valid C identifier.
pub fn is_c_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Check that `ident` is a valid C identifier.
pub(crate) fn check_identifier(ident: &str, what: &str) -> Result<(), TypeError> {
    if is_c_identifier(ident) {
        Ok(())
    } else {
        Err(TypeError::invalid(format!(
            "{what} `{ident}` is not a valid C identifier"
        )))
    }
}
