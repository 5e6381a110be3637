//! Type descriptors.
//!
//! A `TypeDescriptor` names a C type without any declaration context
//! (identifier, qualifiers). Descriptors are immutable value objects; the
//! canonical name returned by [`TypeDescriptor::canonical_name`] identifies
//! a descriptor within a module.

use std::fmt;

use crate::{CType, TypeError};

/// Length of a fixed-size array.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArrayLen {
    /// A literal element count.
    Const(usize),
    /// A preprocessor symbol, e.g. `SIMUL_LEN`.
    Symbol(String),
}

impl fmt::Display for ArrayLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayLen::Const(n) => write!(f, "{n}"),
            ArrayLen::Symbol(s) => f.write_str(s),
        }
    }
}

/// A C type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// A built-in type.
    Primitive(CType),
    /// `depth` levels of indirection to `pointee` (`depth >= 1`).
    Pointer {
        pointee: Box<TypeDescriptor>,
        depth: u8,
    },
    /// A fixed-size inline array.
    Array {
        element: Box<TypeDescriptor>,
        len: ArrayLen,
    },
    /// `struct <name>`.
    Struct(String),
    /// A function-pointer typedef, referenced by its typedef name.
    FunctionPointer(String),
}

impl TypeDescriptor {
    pub const VOID: TypeDescriptor = TypeDescriptor::Primitive(CType::Void);
    pub const INT: TypeDescriptor = TypeDescriptor::Primitive(CType::Int);
    pub const DOUBLE: TypeDescriptor = TypeDescriptor::Primitive(CType::Double);

    /// Build a pointer type, validating the depth.
    pub fn pointer(pointee: TypeDescriptor, depth: u8) -> Result<Self, TypeError> {
        if depth == 0 {
            return Err(TypeError::invalid("pointer depth must be at least 1"));
        }
        if matches!(pointee, TypeDescriptor::Array { .. }) {
            return Err(TypeError::invalid("pointers to arrays are not supported"));
        }
        // Collapse nested pointers so equal types have one representation.
        Ok(match pointee {
            TypeDescriptor::Pointer {
                pointee,
                depth: inner,
            } => TypeDescriptor::Pointer {
                pointee,
                depth: inner.saturating_add(depth),
            },
            other => TypeDescriptor::Pointer {
                pointee: Box::new(other),
                depth,
            },
        })
    }

    /// Build an inline array type.
    pub fn array(element: TypeDescriptor, len: ArrayLen) -> Result<Self, TypeError> {
        match &element {
            TypeDescriptor::Primitive(CType::Void) => {
                return Err(TypeError::invalid("arrays of `void` are not allowed"));
            }
            TypeDescriptor::Array { .. } => {
                return Err(TypeError::invalid("multi-dimensional arrays are not supported"));
            }
            _ => {}
        }
        match &len {
            ArrayLen::Const(0) => Err(TypeError::invalid("array length must be non-zero")),
            ArrayLen::Symbol(sym) => {
                crate::error::check_identifier(sym, "array length symbol")?;
                Ok(TypeDescriptor::Array {
                    element: Box::new(element),
                    len,
                })
            }
            ArrayLen::Const(_) => Ok(TypeDescriptor::Array {
                element: Box::new(element),
                len,
            }),
        }
    }

    /// `struct <name>`, validating the tag.
    pub fn structure(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        crate::error::check_identifier(&name, "struct name")?;
        Ok(TypeDescriptor::Struct(name))
    }

    /// A function-pointer typedef reference, validating the name.
    pub fn function_pointer(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        crate::error::check_identifier(&name, "typedef name")?;
        Ok(TypeDescriptor::FunctionPointer(name))
    }

    /// Whether this is `void` by value.
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(CType::Void))
    }

    /// The struct tag if this is a by-value struct.
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Struct(name) => Some(name),
            _ => None,
        }
    }

    /// Strip pointers, returning the innermost type and the pointer depth.
    pub fn peel_pointers(&self) -> (&TypeDescriptor, usize) {
        match self {
            TypeDescriptor::Pointer { pointee, depth } => (pointee, usize::from(*depth)),
            other => (other, 0),
        }
    }

    /// Spelling of the type as it appears before a declarator name.
    ///
    /// Arrays spell as their element type; the `[len]` suffix belongs to the
    /// declarator (see [`TypeDescriptor::array_suffix`]).
    pub fn spelling(&self) -> String {
        match self {
            TypeDescriptor::Primitive(ty) => ty.c_name().to_string(),
            TypeDescriptor::Pointer { pointee, depth } => {
                let mut s = pointee.spelling();
                for _ in 0..*depth {
                    s.push('*');
                }
                s
            }
            TypeDescriptor::Array { element, .. } => element.spelling(),
            TypeDescriptor::Struct(name) => format!("struct {name}"),
            TypeDescriptor::FunctionPointer(name) => name.clone(),
        }
    }

    /// Declarator suffix (`[len]` for arrays, empty otherwise).
    pub fn array_suffix(&self) -> String {
        match self {
            TypeDescriptor::Array { len, .. } => format!("[{len}]"),
            _ => String::new(),
        }
    }

    /// Canonical name, unique per structurally distinct type.
    pub fn canonical_name(&self) -> String {
        format!("{}{}", self.spelling(), self.array_suffix())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}
