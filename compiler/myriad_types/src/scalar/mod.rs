//! Named, typed value slots: struct fields, parameters and globals.

use std::fmt;

use crate::error::check_identifier;
use crate::{CType, Qualifiers, TypeDescriptor, TypeError};

/// A declared value slot.
///
/// `pointer` adds one level of indirection on top of `ty`, so `void* _self`
/// is `Scalar { ty: void, pointer: true }`. Type identity (see
/// [`Scalar::type_key`]) normalizes the two spellings of a pointer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scalar {
    ident: String,
    ty: TypeDescriptor,
    pointer: bool,
    qualifiers: Qualifiers,
}

/// Structural identity of a scalar's type, ignoring its identifier and
/// storage class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeKey {
    base: TypeDescriptor,
    indirection: usize,
    cv: Qualifiers,
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.cv.prefix(), self.base.spelling())?;
        for _ in 0..self.indirection {
            f.write_str("*")?;
        }
        f.write_str(&self.base.array_suffix())
    }
}

impl Scalar {
    /// Create a scalar, validating the identifier.
    pub fn new(
        ident: impl Into<String>,
        ty: TypeDescriptor,
        pointer: bool,
        qualifiers: Qualifiers,
    ) -> Result<Self, TypeError> {
        let ident = ident.into();
        check_identifier(&ident, "identifier")?;
        if pointer && matches!(ty, TypeDescriptor::Array { .. }) {
            return Err(TypeError::invalid(format!(
                "`{ident}`: pointers to arrays are not supported"
            )));
        }
        Ok(Scalar {
            ident,
            ty,
            pointer,
            qualifiers,
        })
    }

    /// Create an unqualified scalar.
    pub fn plain(
        ident: impl Into<String>,
        ty: TypeDescriptor,
        pointer: bool,
    ) -> Result<Self, TypeError> {
        Self::new(ident, ty, pointer, Qualifiers::empty())
    }

    /// Unnamed scalar used as a function return type.
    pub fn returning(ty: TypeDescriptor, pointer: bool, qualifiers: Qualifiers) -> Self {
        Scalar {
            ident: "_".to_string(),
            ty,
            pointer,
            qualifiers,
        }
    }

    /// The `void` return type.
    pub fn void_return() -> Self {
        Self::returning(TypeDescriptor::Primitive(CType::Void), false, Qualifiers::empty())
    }

    #[inline]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    #[inline]
    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.pointer
    }

    #[inline]
    pub fn qualifiers(&self) -> Qualifiers {
        self.qualifiers
    }

    /// Whether the declared type is `const`.
    pub fn is_const(&self) -> bool {
        self.qualifiers.contains(Qualifiers::CONST)
    }

    /// Total levels of indirection (from the descriptor and the flag).
    pub fn indirection(&self) -> usize {
        self.ty.peel_pointers().1 + usize::from(self.pointer)
    }

    /// The type with all pointer levels removed.
    pub fn base_type(&self) -> &TypeDescriptor {
        self.ty.peel_pointers().0
    }

    /// Whether this is `void` by value (legal only as a return type).
    pub fn is_void_value(&self) -> bool {
        self.indirection() == 0 && self.ty.is_void()
    }

    /// Same scalar under a different identifier.
    pub fn renamed(&self, ident: impl Into<String>) -> Result<Self, TypeError> {
        Self::new(ident, self.ty.clone(), self.pointer, self.qualifiers)
    }

    /// Same scalar with extra qualifiers.
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Result<Self, TypeError> {
        let combined = self.qualifiers | qualifiers;
        if combined.contains(Qualifiers::STORAGE) {
            return Err(TypeError::invalid(format!(
                "`{}`: qualifiers `static` and `extern` are mutually exclusive",
                self.ident
            )));
        }
        self.qualifiers = combined;
        Ok(self)
    }

    /// Structural type identity.
    pub fn type_key(&self) -> TypeKey {
        TypeKey {
            base: self.base_type().clone(),
            indirection: self.indirection(),
            cv: self.qualifiers & Qualifiers::CV,
        }
    }

    /// Spelling of the type alone, e.g. `const void*`.
    pub fn type_spelling(&self) -> String {
        let mut s = self.qualifiers.prefix();
        s.push_str(&self.ty.spelling());
        if self.pointer {
            s.push('*');
        }
        s
    }

    /// Render as a declaration without the trailing semicolon, e.g.
    /// `const void* _self` or `double vm[SIMUL_LEN]`.
    pub fn stringify_decl(&self) -> String {
        format!(
            "{} {}{}",
            self.type_spelling(),
            self.ident,
            self.ty.array_suffix()
        )
    }

    /// Validate use as a struct field or function parameter.
    pub fn check_storable(&self, context: &str) -> Result<(), TypeError> {
        if self.is_void_value() {
            return Err(TypeError::invalid(format!(
                "{context} `{}` cannot have type `void`",
                self.ident
            )));
        }
        if self.qualifiers.intersects(Qualifiers::STORAGE) {
            return Err(TypeError::invalid(format!(
                "{context} `{}` cannot have a storage qualifier",
                self.ident
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify_decl())
    }
}
