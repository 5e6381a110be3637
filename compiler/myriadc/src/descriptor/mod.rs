//! JSON class descriptors.
//!
//! A descriptor file describes one module:
//!
//! ```json
//! {
//!   "module": "Compartment",
//!   "coprocessor": true,
//!   "classes": [{
//!     "name": "Compartment",
//!     "coprocessor": true,
//!     "fields": [{ "name": "vm", "type": "double[SIMUL_LEN]" }],
//!     "methods": [{
//!       "name": "add_mech",
//!       "params": [
//!         { "name": "_self", "type": "void*" },
//!         { "name": "mechanism", "type": "void*" }
//!       ],
//!       "returns": { "type": "int" },
//!       "implementation": "Compartment_add_mech_impl"
//!     }]
//!   }]
//! }
//! ```
//!
//! Types use the [`TypeRegistry`] syntax. A method names either an external
//! `implementation` symbol or a verbatim C `body`; with neither it is
//! abstract. `imports` names classes defined by modules generated earlier in
//! the same session.

pub(crate) mod schema;

use std::path::Path;

use myriad_codegen::{
    naming, ClassDraft, ConflictPolicy, MethodDef, ModuleConfig, ModuleFunction,
};
use myriad_types::{FunctionKind, FunctionSignature, Qualifiers, Scalar, TypeError, TypeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DriverError;

/// A named, typed slot: field, parameter or global.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<String>,
}

impl ScalarSpec {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        ScalarSpec {
            name: name.into(),
            ty: ty.into(),
            qualifiers: Vec::new(),
        }
    }

    #[must_use]
    pub fn qualified(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    fn lower(&self, registry: &TypeRegistry) -> Result<Scalar, TypeError> {
        Scalar::new(
            self.name.as_str(),
            registry.parse(&self.ty)?,
            false,
            Qualifiers::parse(&self.qualifiers)?,
        )
    }
}

/// Return type of a method or function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnSpec {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<String>,
}

/// A method or module function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ScalarSpec>,
    /// `void` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<String>,
    /// External implementing symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    /// Verbatim C body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl FunctionSpec {
    fn signature(&self, registry: &TypeRegistry, kind: FunctionKind) -> Result<FunctionSignature, TypeError> {
        let params = self
            .params
            .iter()
            .map(|p| p.lower(registry))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = match &self.returns {
            Some(ret) => Scalar::returning(registry.parse(&ret.ty)?, false, Qualifiers::parse(&ret.qualifiers)?),
            None => Scalar::void_return(),
        };
        let signature = FunctionSignature::new(self.name.as_str(), params, ret, kind)?;
        let qualifiers = Qualifiers::parse(&self.qualifiers)?;
        if qualifiers.is_empty() {
            Ok(signature)
        } else {
            signature.with_qualifiers(qualifiers)
        }
    }

    fn lower_method(&self, registry: &TypeRegistry) -> Result<MethodDef, TypeError> {
        let signature = self.signature(registry, FunctionKind::Method)?;
        match (&self.implementation, &self.body) {
            (Some(symbol), None) => MethodDef::external(signature, symbol.as_str()),
            (None, Some(body)) => MethodDef::verbatim(signature, body.as_str()),
            (None, None) => MethodDef::declared(signature),
            (Some(_), Some(_)) => Err(TypeError::invalid(format!(
                "method `{}` has both an implementation symbol and a body",
                self.name
            ))),
        }
    }

    fn lower_function(&self, registry: &TypeRegistry) -> Result<ModuleFunction, TypeError> {
        if self.implementation.is_some() {
            return Err(TypeError::invalid(format!(
                "module function `{}` cannot name an implementation symbol",
                self.name
            )));
        }
        let signature = self.signature(registry, FunctionKind::Module)?;
        Ok(match &self.body {
            Some(body) => ModuleFunction::defined(signature, body.as_str()),
            None => ModuleFunction::declared(signature),
        })
    }
}

/// One class of a module.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassSpec {
    pub name: String,
    /// Superclass names. Empty means the root object class.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub coprocessor: bool,
    #[serde(default)]
    pub fields: Vec<ScalarSpec>,
    #[serde(default)]
    pub methods: Vec<FunctionSpec>,
}

impl ClassSpec {
    fn lower(&self, registry: &TypeRegistry) -> Result<ClassDraft, TypeError> {
        let mut draft = ClassDraft::new(self.name.as_str())
            .with_abstract(self.is_abstract)
            .with_coprocessor(self.coprocessor);
        for superclass in &self.extends {
            draft = draft.extends(superclass.as_str());
        }
        for field in &self.fields {
            draft = draft.field(field.lower(registry)?);
        }
        for method in &self.methods {
            draft = draft.method(method.lower_method(registry)?);
        }
        Ok(draft)
    }
}

/// A whole descriptor file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDescriptor {
    pub module: String,
    #[serde(default)]
    pub coprocessor: bool,
    /// Reject re-registered globals and functions.
    #[serde(default)]
    pub strict: bool,
    /// Replace re-registered globals and functions in place.
    #[serde(default, rename = "override")]
    pub override_existing: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lib_includes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_includes: Vec<String>,
    /// Struct tags declared outside the module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structs: Vec<String>,
    /// Function-pointer typedefs declared outside the module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub typedefs: Vec<String>,
    /// Classes of earlier modules this module builds on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub globals: Vec<ScalarSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionSpec>,
}

impl ModuleDescriptor {
    /// Parse and type-check descriptor text. `path` is only used in errors.
    pub fn from_json(text: &str, path: &Path) -> Result<Self, DriverError> {
        let json_error = |source| DriverError::Json {
            path: path.to_path_buf(),
            source,
        };
        let value: Value = serde_json::from_str(text).map_err(json_error)?;
        schema::check(&value, &schema::MODULE, "")?;
        serde_json::from_value(value).map_err(json_error)
    }

    /// Read and parse a descriptor file.
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    pub fn policy(&self) -> Result<ConflictPolicy, DriverError> {
        Ok(ConflictPolicy::from_flags(self.strict, self.override_existing)?)
    }

    /// Module settings, without the includes imports add.
    pub fn config(&self) -> ModuleConfig {
        let mut config = ModuleConfig::new(self.module.as_str()).with_coprocessor(self.coprocessor);
        for header in &self.lib_includes {
            config = config.include_lib(header.as_str());
        }
        for header in &self.local_includes {
            config = config.include_local(header.as_str());
        }
        config
    }

    /// Registry with the root structs, every class of this module, the
    /// given imported class names and the declared external types.
    pub fn registry<'a>(&self, imported: impl IntoIterator<Item = &'a str>) -> Result<TypeRegistry, TypeError> {
        let mut registry = TypeRegistry::new();
        let classes = [naming::ROOT_OBJECT]
            .into_iter()
            .chain(imported.into_iter().map(|name| -> &str { name }))
            .chain(self.classes.iter().map(|c| c.name.as_str()));
        for class in classes {
            registry.register_struct(class)?;
            registry.register_struct(&naming::class_struct_name(class))?;
        }
        for name in &self.structs {
            registry.register_struct(name)?;
        }
        for name in &self.typedefs {
            registry.register_typedef(name)?;
        }
        Ok(registry)
    }

    pub(crate) fn drafts(&self, registry: &TypeRegistry) -> Result<Vec<ClassDraft>, TypeError> {
        self.classes.iter().map(|c| c.lower(registry)).collect()
    }

    pub(crate) fn globals(&self, registry: &TypeRegistry) -> Result<Vec<Scalar>, TypeError> {
        self.globals.iter().map(|g| g.lower(registry)).collect()
    }

    pub(crate) fn functions(&self, registry: &TypeRegistry) -> Result<Vec<ModuleFunction>, TypeError> {
        self.functions.iter().map(|f| f.lower_function(registry)).collect()
    }
}
