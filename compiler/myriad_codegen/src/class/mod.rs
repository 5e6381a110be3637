//! Class descriptions: user drafts and resolved descriptors.
//!
//! A [`ClassDraft`] is what a module author writes: a name, at most one
//! superclass, declared fields and method definitions. Resolution turns a
//! draft into an immutable [`ClassDescriptor`] holding both struct layouts
//! and the full method table, inherited entries included.

mod root;

use std::sync::Arc;

use myriad_types::{
    FunctionKind, FunctionSignature, Qualifiers, Scalar, StructType, TypeDescriptor, TypeError,
};

use crate::naming::{self, RESERVED_LOCALS};

pub use root::myriad_object;

/// How a method definition supplies its implementation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum MethodKind {
    /// The body names an external C symbol linked from elsewhere.
    #[default]
    Normal,
    /// The body is literal C, emitted as `static <Object>_<method>`.
    Verbatim,
}

/// A method as written on a class draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    signature: FunctionSignature,
    kind: MethodKind,
    body: Option<String>,
}

impl MethodDef {
    /// Validate and create a method definition.
    ///
    /// `signature` must be an instance signature (self pointer first).
    /// A `Normal` body is a C identifier; a `Verbatim` body is required.
    pub fn new(
        signature: FunctionSignature,
        kind: MethodKind,
        body: Option<String>,
    ) -> Result<Self, TypeError> {
        let name = signature.ident();
        if signature.kind() != FunctionKind::Method {
            return Err(TypeError::invalid(format!(
                "method `{name}` must have an instance signature"
            )));
        }
        if let Some(param) = signature
            .params()
            .iter()
            .find(|p| RESERVED_LOCALS.contains(&p.ident()))
        {
            return Err(TypeError::invalid(format!(
                "method `{name}`: parameter name `{}` is reserved",
                param.ident()
            )));
        }
        match (kind, body.as_deref()) {
            (MethodKind::Verbatim, None) => {
                return Err(TypeError::invalid(format!(
                    "verbatim method `{name}` needs a body"
                )));
            }
            (MethodKind::Normal, Some(symbol)) if !myriad_types::is_c_identifier(symbol) => {
                return Err(TypeError::invalid(format!(
                    "method `{name}`: implementation `{symbol}` is not a C identifier"
                )));
            }
            _ => {}
        }
        Ok(MethodDef {
            signature,
            kind,
            body,
        })
    }

    /// A method implemented by an external C function.
    pub fn external(signature: FunctionSignature, symbol: impl Into<String>) -> Result<Self, TypeError> {
        Self::new(signature, MethodKind::Normal, Some(symbol.into()))
    }

    /// A method whose body is emitted verbatim.
    pub fn verbatim(signature: FunctionSignature, body: impl Into<String>) -> Result<Self, TypeError> {
        Self::new(signature, MethodKind::Verbatim, Some(body.into()))
    }

    /// A method with no implementation on this class.
    pub fn declared(signature: FunctionSignature) -> Result<Self, TypeError> {
        Self::new(signature, MethodKind::Normal, None)
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.signature.ident()
    }

    #[inline]
    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    #[inline]
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    #[inline]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// A class as submitted to a module, before resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassDraft {
    name: String,
    superclasses: Vec<String>,
    fields: Vec<Scalar>,
    methods: Vec<MethodDef>,
    coprocessor: bool,
    is_abstract: bool,
}

impl ClassDraft {
    pub fn new(name: impl Into<String>) -> Self {
        ClassDraft {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a superclass. More than one is rejected at resolution.
    #[must_use]
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclasses.push(superclass.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: Scalar) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: impl IntoIterator<Item = Scalar>) -> Self {
        self.fields.extend(fields);
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn with_coprocessor(mut self, enabled: bool) -> Self {
        self.coprocessor = enabled;
        self
    }

    /// Abstract classes may leave method slots unimplemented.
    #[must_use]
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn superclasses(&self) -> &[String] {
        &self.superclasses
    }

    /// The single declared superclass, or the root class.
    pub fn superclass(&self) -> &str {
        self.superclasses
            .first()
            .map_or(naming::ROOT_OBJECT, String::as_str)
    }

    #[inline]
    pub fn declared_fields(&self) -> &[Scalar] {
        &self.fields
    }

    #[inline]
    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    #[inline]
    pub fn coprocessor(&self) -> bool {
        self.coprocessor
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Where a bound implementation comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImplSource {
    /// Linked from user C code.
    External,
    /// Emitted from literal body text.
    Verbatim(String),
    /// Provided by the object runtime.
    Runtime,
    /// Generated host/device mirror routine.
    Mirror,
}

/// An implementation bound to a method slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Implementation {
    symbol: String,
    provided_by: String,
    source: ImplSource,
}

impl Implementation {
    pub fn new(symbol: impl Into<String>, provided_by: impl Into<String>, source: ImplSource) -> Self {
        Implementation {
            symbol: symbol.into(),
            provided_by: provided_by.into(),
            source,
        }
    }

    /// C symbol stored in the slot.
    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Class whose definition supplied this implementation.
    #[inline]
    pub fn provided_by(&self) -> &str {
        &self.provided_by
    }

    #[inline]
    pub fn source(&self) -> &ImplSource {
        &self.source
    }
}

/// A resolved method-table entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    name: String,
    introduced_by: String,
    signature: FunctionSignature,
    delegator: FunctionSignature,
    super_delegator: FunctionSignature,
    typedef: String,
    kind: MethodKind,
    implementation: Option<Implementation>,
}

impl Method {
    /// Create the entry for a method introduced by `introducer`.
    pub(crate) fn introduce(
        introducer: &str,
        signature: FunctionSignature,
        kind: MethodKind,
        implementation: Option<Implementation>,
    ) -> Result<Self, TypeError> {
        let name = signature.ident().to_string();
        let delegator = signature.renamed(
            naming::delegator_name(introducer, &name),
            FunctionKind::Delegator,
        )?;
        let class_param = Scalar::new(naming::CLASS_PARAM, TypeDescriptor::VOID, true, Qualifiers::CONST)?;
        let super_delegator = signature
            .with_leading_param(class_param)?
            .renamed(naming::super_delegator_name(&name), FunctionKind::SuperDelegator)?;
        Ok(Method {
            typedef: naming::typedef_name(introducer, &name),
            introduced_by: introducer.to_string(),
            name,
            signature,
            delegator,
            super_delegator,
            kind,
            implementation,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn introduced_by(&self) -> &str {
        &self.introduced_by
    }

    /// Instance signature as introduced.
    #[inline]
    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    #[inline]
    pub fn delegator(&self) -> &FunctionSignature {
        &self.delegator
    }

    #[inline]
    pub fn super_delegator(&self) -> &FunctionSignature {
        &self.super_delegator
    }

    /// Name of the slot's function-pointer typedef.
    #[inline]
    pub fn typedef(&self) -> &str {
        &self.typedef
    }

    pub fn slot(&self) -> String {
        naming::slot_name(&self.name)
    }

    #[inline]
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    #[inline]
    pub fn implementation(&self) -> Option<&Implementation> {
        self.implementation.as_ref()
    }

    pub(crate) fn bind(&mut self, kind: MethodKind, implementation: Implementation) {
        self.kind = kind;
        self.implementation = Some(implementation);
    }
}

/// A fully resolved class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDescriptor {
    name: String,
    object_struct: Arc<StructType>,
    class_struct: Arc<StructType>,
    superclass: Option<Arc<ClassDescriptor>>,
    methods: Vec<Method>,
    coprocessor: bool,
    is_abstract: bool,
}

impl ClassDescriptor {
    pub(crate) fn new(
        name: String,
        object_struct: Arc<StructType>,
        class_struct: Arc<StructType>,
        superclass: Option<Arc<ClassDescriptor>>,
        methods: Vec<Method>,
        coprocessor: bool,
        is_abstract: bool,
    ) -> Self {
        ClassDescriptor {
            name,
            object_struct,
            class_struct,
            superclass,
            methods,
            coprocessor,
            is_abstract,
        }
    }

    /// Object name, e.g. `Compartment`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class struct name, e.g. `CompartmentClass`.
    #[inline]
    pub fn class_name(&self) -> &str {
        self.class_struct.name()
    }

    #[inline]
    pub fn object_struct(&self) -> &Arc<StructType> {
        &self.object_struct
    }

    #[inline]
    pub fn class_struct(&self) -> &Arc<StructType> {
        &self.class_struct
    }

    #[inline]
    pub fn superclass(&self) -> Option<&Arc<ClassDescriptor>> {
        self.superclass.as_ref()
    }

    /// Full method table: inherited entries first, in introduction order.
    #[inline]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Methods whose slot this class adds to the class struct.
    pub fn introduced_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(move |m| m.introduced_by == self.name)
    }

    /// Methods whose implementation this class supplies.
    pub fn implemented_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods
            .iter()
            .filter(move |m| m.implementation().is_some_and(|i| i.provided_by() == self.name))
    }

    #[inline]
    pub fn coprocessor_enabled(&self) -> bool {
        self.coprocessor
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether this is the built-in root class.
    pub fn is_root(&self) -> bool {
        self.superclass.is_none()
    }

    /// This class followed by each ancestor, nearest first.
    pub fn chain(&self) -> impl Iterator<Item = &ClassDescriptor> {
        std::iter::successors(Some(self), |c| c.superclass.as_deref())
    }

    /// Whether `ancestor` is this class or one of its ancestors.
    pub fn extends(&self, ancestor: &str) -> bool {
        self.chain().any(|c| c.name == ancestor)
    }
}
