//! Code generation errors.

use myriad_types::TypeError;
use thiserror::Error;

/// Result type for code generation.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Error raised while resolving classes or assembling a module.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// Invalid type, field layout or boundary value.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// An override does not match the inherited method's signature.
    #[error("`{class}::{method}` overrides `{introduced_by}::{method}` with signature `{found}`, expected `{expected}`")]
    SignatureMismatch {
        class: String,
        method: String,
        introduced_by: String,
        expected: String,
        found: String,
    },

    /// A class names more than one superclass.
    #[error("class `{class}` extends {} classes ({}); only single inheritance is supported", bases.len(), bases.join(", "))]
    UnsupportedHierarchy { class: String, bases: Vec<String> },

    /// The inheritance graph contains a cycle.
    #[error("cyclic inheritance: {}", cycle.join(" -> "))]
    CyclicInheritance { cycle: Vec<String> },

    /// A concrete class has a method slot with no implementation anywhere
    /// in its chain.
    #[error("concrete class `{class}` has no implementation for `{method}`")]
    MissingInstanceImplementation { class: String, method: String },

    /// A superclass is neither defined in the module nor imported.
    #[error("class `{class}` extends unknown class `{superclass}`")]
    UnknownSuperclass { class: String, superclass: String },

    /// Two classes with the same name in one module.
    #[error("class `{class}` is defined more than once")]
    DuplicateClass { class: String },

    /// A class defines the same method twice.
    #[error("class `{class}` defines method `{method}` more than once")]
    DuplicateMethod { class: String, method: String },

    /// Two classes outside each other's chain introduce methods whose
    /// delegators share a C name.
    #[error("delegator `{name}` is introduced by both `{first}` and `{second}`")]
    DelegatorClash {
        name: String,
        first: String,
        second: String,
    },

    /// A class requests coprocessor support in a module without it.
    #[error("class `{class}` enables coprocessor support but module `{module}` does not")]
    CoprocessorDisabled { class: String, module: String },

    /// A module-level name was registered twice under the strict policy.
    #[error("`{name}` is already declared in module `{module}`")]
    DuplicateDeclaration { module: String, name: String },

    /// Both the strict and override policies were requested.
    #[error("strict and override policies are mutually exclusive")]
    ConflictingPolicy,
}
