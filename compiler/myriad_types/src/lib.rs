//! C type model for the Myriad object system.
//!
//! Everything the generator emits is described with the value types in this
//! crate before any text is produced:
//!
//! - [`TypeDescriptor`]: a C type (primitive, pointer, array, struct,
//!   function-pointer typedef)
//! - [`Scalar`]: a named, qualified slot (field, parameter, global)
//! - [`FunctionSignature`]: an ordered parameter list plus return type
//! - [`StructType`]: an ordered field list, built by [`StructLayoutBuilder`]
//!
//! All constructors validate their input and fail with [`TypeError`].
//! Values are immutable once built.

mod ctype;
mod descriptor;
mod error;
mod layout;
mod qualifiers;
mod registry;
mod scalar;
mod signature;

pub use ctype::CType;
pub use descriptor::{ArrayLen, TypeDescriptor};
pub use error::{is_c_identifier, TypeError};
pub use layout::{StructLayoutBuilder, StructType, SUPER_FIELD};
pub use qualifiers::Qualifiers;
pub use registry::TypeRegistry;
pub use scalar::{Scalar, TypeKey};
pub use signature::{FunctionKind, FunctionSignature};
