//! Function signatures.
//!
//! Parameter order is the call ABI: it is preserved exactly as supplied and
//! is part of structural identity.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::error::check_identifier;
use crate::{Qualifiers, Scalar, TypeError, TypeKey};

/// How a function participates in the object model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// A free function registered on the module.
    Module,
    /// An instance method implementation (takes `self` first).
    Method,
    /// Public dynamic-dispatch wrapper of a method.
    Delegator,
    /// Explicit-superclass wrapper of a method.
    SuperDelegator,
}

/// A function signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    ident: String,
    params: Vec<Scalar>,
    ret: Scalar,
    kind: FunctionKind,
    qualifiers: Qualifiers,
}

impl FunctionSignature {
    /// Create a signature, validating identifiers and parameter uniqueness.
    pub fn new(
        ident: impl Into<String>,
        params: Vec<Scalar>,
        ret: Scalar,
        kind: FunctionKind,
    ) -> Result<Self, TypeError> {
        let ident = ident.into();
        check_identifier(&ident, "function name")?;

        let mut seen = FxHashSet::default();
        for param in &params {
            param.check_storable("parameter")?;
            if !seen.insert(param.ident()) {
                return Err(TypeError::invalid(format!(
                    "function `{ident}` declares parameter `{}` twice",
                    param.ident()
                )));
            }
        }
        if ret.qualifiers().intersects(Qualifiers::STORAGE) {
            return Err(TypeError::invalid(format!(
                "return type of `{ident}` cannot carry a storage qualifier"
            )));
        }
        if kind == FunctionKind::Method && params.first().map_or(true, |p| p.indirection() == 0) {
            return Err(TypeError::invalid(format!(
                "instance method `{ident}` must take a self pointer as its first parameter"
            )));
        }

        Ok(FunctionSignature {
            ident,
            params,
            ret,
            kind,
            qualifiers: Qualifiers::empty(),
        })
    }

    /// Same signature with a storage qualifier (e.g. `static`).
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Result<Self, TypeError> {
        if qualifiers.intersects(Qualifiers::CV) {
            return Err(TypeError::invalid(format!(
                "function `{}` can only take storage qualifiers",
                self.ident
            )));
        }
        let combined = self.qualifiers | qualifiers;
        if combined.contains(Qualifiers::STORAGE) {
            return Err(TypeError::invalid(format!(
                "function `{}`: `static` and `extern` are mutually exclusive",
                self.ident
            )));
        }
        self.qualifiers = combined;
        Ok(self)
    }

    #[inline]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    #[inline]
    pub fn params(&self) -> &[Scalar] {
        &self.params
    }

    #[inline]
    pub fn ret(&self) -> &Scalar {
        &self.ret
    }

    #[inline]
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    #[inline]
    pub fn qualifiers(&self) -> Qualifiers {
        self.qualifiers
    }

    /// Whether the function returns nothing.
    pub fn returns_void(&self) -> bool {
        self.ret.is_void_value()
    }

    /// The `self` parameter of an instance method or delegator.
    pub fn self_param(&self) -> Option<&Scalar> {
        let first = self.params.first()?;
        (first.indirection() > 0).then_some(first)
    }

    /// Parameter and return type identities, in call order.
    pub fn type_keys(&self) -> (Vec<TypeKey>, TypeKey) {
        (
            self.params.iter().map(Scalar::type_key).collect(),
            self.ret.type_key(),
        )
    }

    /// Whether `other` has the same arity, parameter types (in order) and
    /// return type. Names and classification do not matter.
    pub fn is_structurally_equal(&self, other: &FunctionSignature) -> bool {
        self.type_keys() == other.type_keys()
    }

    /// Copy with a new name and classification.
    pub fn renamed(&self, ident: impl Into<String>, kind: FunctionKind) -> Result<Self, TypeError> {
        let ident = ident.into();
        check_identifier(&ident, "function name")?;
        Ok(FunctionSignature {
            ident,
            kind,
            ..self.clone()
        })
    }

    /// Copy with `param` inserted before all existing parameters.
    pub fn with_leading_param(&self, param: Scalar) -> Result<Self, TypeError> {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(param);
        params.extend(self.params.iter().cloned());
        let mut sig = FunctionSignature::new(self.ident.clone(), params, self.ret.clone(), self.kind)?;
        sig.qualifiers = self.qualifiers;
        Ok(sig)
    }

    fn param_list(&self) -> String {
        if self.params.is_empty() {
            "void".to_string()
        } else {
            self.params
                .iter()
                .map(Scalar::stringify_decl)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// Render the prototype without a trailing semicolon, e.g.
    /// `int add_mech(void* _self, void* mechanism)`.
    pub fn stringify_decl(&self) -> String {
        format!(
            "{}{} {}({})",
            self.qualifiers.prefix(),
            self.ret.type_spelling(),
            self.ident,
            self.param_list()
        )
    }

    /// Render a function-pointer typedef for this signature.
    pub fn stringify_typedef(&self, typedef_name: &str) -> String {
        format!(
            "typedef {} (*{typedef_name})({});",
            self.ret.type_spelling(),
            self.param_list()
        )
    }

    /// Render a call of `callee` forwarding every parameter by name.
    pub fn stringify_call(&self, callee: &str) -> String {
        let args = self
            .params
            .iter()
            .map(Scalar::ident)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{callee}({args})")
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify_decl())
    }
}

#[cfg(test)]
mod tests;
