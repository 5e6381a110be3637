//! Modules: the unit of generation.
//!
//! A module collects class drafts, imported classes, module-level globals
//! and free functions, and resolves them into a [`Module`] artifact tree
//! that the renderers in [`crate::c`] turn into files:
//!
//! - `<Name>.h`: declarations, struct definitions, delegator prototypes
//! - `<Name>.c`: implementations, delegators, class construction
//! - `<Name>.cuh`: device symbols (coprocessor modules only)
//!
//! The built-in runtime module ([`Module::runtime`]) renders
//! `MyriadObject.h`.

mod init;

use std::collections::BTreeSet;
use std::sync::Arc;

use myriad_types::{FunctionKind, FunctionSignature, Qualifiers, Scalar, TypeDescriptor, TypeError};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::artifact::{indent_body, FunctionDef, Typedef};
use crate::class::{myriad_object, ClassDescriptor, ClassDraft, ImplSource};
use crate::hierarchy::ClassHierarchyResolver;
use crate::mirror::{CoprocessorMirror, MirrorArtifacts};
use crate::naming::{ROOT_CLASS, ROOT_OBJECT};
use crate::{CodegenError, CodegenResult};

/// Library headers every module includes.
pub const DEFAULT_LIB_INCLUDES: [&str; 6] = [
    "stdlib.h", "stdio.h", "assert.h", "stddef.h", "stdarg.h", "stdint.h",
];

/// Extra library headers for coprocessor modules.
pub const CUDA_LIB_INCLUDES: [&str; 2] = ["cuda_runtime.h", "cuda_runtime_api.h"];

/// Header of the object runtime, included by every user module.
pub const RUNTIME_HEADER: &str = "MyriadObject.h";

/// Module-level settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Module name; also the file stem of the generated files.
    pub name: String,
    /// Whether device mirroring is generated.
    pub coprocessor: bool,
    /// `#include <...>` headers, emitted sorted.
    pub lib_includes: BTreeSet<String>,
    /// `#include "..."` headers, emitted in order.
    pub local_includes: Vec<String>,
}

impl ModuleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleConfig {
            name: name.into(),
            coprocessor: false,
            lib_includes: DEFAULT_LIB_INCLUDES.iter().map(|s| s.to_string()).collect(),
            local_includes: Vec::new(),
        }
    }

    /// Enable coprocessor support, adding the CUDA runtime headers.
    #[must_use]
    pub fn with_coprocessor(mut self, enabled: bool) -> Self {
        self.coprocessor = enabled;
        if enabled {
            self.lib_includes
                .extend(CUDA_LIB_INCLUDES.iter().map(|s| s.to_string()));
        }
        self
    }

    #[must_use]
    pub fn include_lib(mut self, header: impl Into<String>) -> Self {
        self.lib_includes.insert(header.into());
        self
    }

    #[must_use]
    pub fn include_local(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        if !self.local_includes.contains(&header) {
            self.local_includes.push(header);
        }
        self
    }

    /// `COMPARTMENT_H`
    pub fn header_guard(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.name.to_uppercase())
    }
}

/// What happens when a module-level name is registered twice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Fail with [`CodegenError::DuplicateDeclaration`].
    Strict,
    /// Replace the earlier declaration, keeping its position.
    #[default]
    Override,
}

impl ConflictPolicy {
    /// Combine the two boolean switches of a descriptor.
    pub fn from_flags(strict: bool, override_existing: bool) -> CodegenResult<Self> {
        match (strict, override_existing) {
            (true, true) => Err(CodegenError::ConflictingPolicy),
            (true, false) => Ok(ConflictPolicy::Strict),
            _ => Ok(ConflictPolicy::Override),
        }
    }
}

/// A free function of a module. Without a body it is only declared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleFunction {
    pub signature: FunctionSignature,
    pub body: Option<String>,
}

impl ModuleFunction {
    pub fn declared(signature: FunctionSignature) -> Self {
        ModuleFunction {
            signature,
            body: None,
        }
    }

    pub fn defined(signature: FunctionSignature, body: impl Into<String>) -> Self {
        ModuleFunction {
            signature,
            body: Some(body.into()),
        }
    }

    /// Definition with the body re-indented, if there is a body.
    pub fn definition(&self) -> Option<FunctionDef> {
        self.body
            .as_deref()
            .map(|body| FunctionDef::new(self.signature.clone(), indent_body(body)))
    }
}

/// How a bound implementation appears in the source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImplementationArtifact {
    /// Linked from user code; declared `extern`.
    Extern(FunctionSignature),
    /// Defined in the generated source.
    Definition(FunctionDef),
}

/// Everything generated for one class.
#[derive(Clone, Debug)]
pub struct ClassArtifacts {
    pub descriptor: Arc<ClassDescriptor>,
    pub typedefs: Vec<Arc<Typedef>>,
    pub delegators: Vec<Arc<FunctionDef>>,
    pub super_delegators: Vec<Arc<FunctionDef>>,
    pub implementations: Vec<ImplementationArtifact>,
    pub mirror: Option<MirrorArtifacts>,
    pub class_ctor: Option<FunctionDef>,
    pub init: FunctionDef,
}

impl ClassArtifacts {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// Whether a module is the object runtime or a user module.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    Runtime,
    User,
}

/// A resolved module, ready to render.
#[derive(Clone, Debug)]
pub struct Module {
    config: ModuleConfig,
    kind: ModuleKind,
    root: Arc<ClassDescriptor>,
    classes: Vec<ClassArtifacts>,
    globals: Vec<Scalar>,
    functions: Vec<ModuleFunction>,
}

impl Module {
    /// The object runtime module (`MyriadObject.h`).
    pub fn runtime() -> CodegenResult<Module> {
        let root = myriad_object()?;
        let globals = vec![class_var(ROOT_OBJECT)?, class_var(ROOT_CLASS)?];
        Ok(Module {
            config: ModuleConfig::new(ROOT_OBJECT),
            kind: ModuleKind::Runtime,
            root,
            classes: Vec::new(),
            globals,
            functions: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[inline]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// The built-in root class.
    #[inline]
    pub fn root(&self) -> &Arc<ClassDescriptor> {
        &self.root
    }

    /// Classes in dependency order.
    #[inline]
    pub fn classes(&self) -> &[ClassArtifacts] {
        &self.classes
    }

    pub fn class(&self, name: &str) -> Option<&ClassArtifacts> {
        self.classes.iter().find(|c| c.name() == name)
    }

    /// Module globals, class object variables included.
    #[inline]
    pub fn globals(&self) -> &[Scalar] {
        &self.globals
    }

    #[inline]
    pub fn functions(&self) -> &[ModuleFunction] {
        &self.functions
    }

    /// Slot typedefs in emission order.
    pub fn typedefs(&self) -> Vec<Arc<Typedef>> {
        match self.kind {
            ModuleKind::Runtime => self
                .root
                .methods()
                .iter()
                .map(|m| {
                    Arc::new(Typedef {
                        name: m.typedef().to_string(),
                        signature: m.signature().clone(),
                    })
                })
                .collect(),
            ModuleKind::User => self
                .classes
                .iter()
                .flat_map(|c| c.typedefs.iter().cloned())
                .collect(),
        }
    }

    /// Local includes, the runtime header first for user modules.
    pub fn local_includes(&self) -> Vec<String> {
        let mut includes = Vec::with_capacity(self.config.local_includes.len() + 1);
        if self.kind == ModuleKind::User {
            includes.push(RUNTIME_HEADER.to_string());
        }
        for header in &self.config.local_includes {
            if !includes.contains(header) {
                includes.push(header.clone());
            }
        }
        includes
    }

    /// Whether any class of this module is mirrored to the device.
    pub fn has_device_code(&self) -> bool {
        self.config.coprocessor && self.classes.iter().any(|c| c.descriptor.coprocessor_enabled())
    }
}

/// `const void* <name>`: a class object variable.
fn class_var(name: &str) -> Result<Scalar, TypeError> {
    Scalar::new(name, TypeDescriptor::VOID, true, Qualifiers::CONST)
}

/// Module-level names in registration order, with replace-in-place.
#[derive(Debug)]
struct Declarations<T> {
    entries: Vec<T>,
    index: FxHashMap<String, usize>,
}

impl<T> Default for Declarations<T> {
    fn default() -> Self {
        Declarations {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<T> Declarations<T> {
    fn register(&mut self, module: &str, name: &str, item: T, policy: ConflictPolicy) -> CodegenResult<()> {
        match (self.index.get(name), policy) {
            (Some(_), ConflictPolicy::Strict) => Err(CodegenError::DuplicateDeclaration {
                module: module.to_string(),
                name: name.to_string(),
            }),
            (Some(&at), ConflictPolicy::Override) => {
                tracing::debug!(module, name, "overriding module declaration");
                self.entries[at] = item;
                Ok(())
            }
            (None, _) => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(item);
                Ok(())
            }
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// Collects a module's contents and resolves them.
#[derive(Debug)]
pub struct ModuleBuilder {
    config: ModuleConfig,
    drafts: Vec<ClassDraft>,
    imports: Vec<Arc<ClassDescriptor>>,
    globals: Declarations<Scalar>,
    functions: Declarations<ModuleFunction>,
}

impl ModuleBuilder {
    pub fn new(config: ModuleConfig) -> Self {
        ModuleBuilder {
            config,
            drafts: Vec::new(),
            imports: Vec::new(),
            globals: Declarations::default(),
            functions: Declarations::default(),
        }
    }

    /// Add a class to generate.
    pub fn define_class(&mut self, draft: ClassDraft) -> &mut Self {
        self.drafts.push(draft);
        self
    }

    /// Make a class resolved by another module available as a superclass.
    pub fn import_class(&mut self, class: Arc<ClassDescriptor>) -> &mut Self {
        self.imports.push(class);
        self
    }

    /// Register a module-level global variable.
    pub fn register_global(&mut self, global: Scalar, policy: ConflictPolicy) -> CodegenResult<&mut Self> {
        global.check_storable("global")?;
        let name = global.ident().to_string();
        if self.functions.contains(&name) {
            return Err(self.duplicate(&name));
        }
        self.globals.register(&self.config.name, &name, global, policy)?;
        Ok(self)
    }

    /// Register a module-level function.
    pub fn register_function(
        &mut self,
        function: ModuleFunction,
        policy: ConflictPolicy,
    ) -> CodegenResult<&mut Self> {
        if function.signature.qualifiers().contains(Qualifiers::STATIC) {
            return Err(TypeError::invalid(format!(
                "module function `{}` cannot be static",
                function.signature.ident()
            ))
            .into());
        }
        let name = function.signature.ident().to_string();
        if self.globals.contains(&name) {
            return Err(self.duplicate(&name));
        }
        self.functions.register(&self.config.name, &name, function, policy)?;
        Ok(self)
    }

    fn duplicate(&self, name: &str) -> CodegenError {
        CodegenError::DuplicateDeclaration {
            module: self.config.name.clone(),
            name: name.to_string(),
        }
    }

    /// Resolve every class and assemble the module.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %self.config.name))]
    pub fn build(self) -> CodegenResult<Module> {
        if !myriad_types::is_c_identifier(&self.config.name) {
            return Err(TypeError::invalid(format!(
                "module name `{}` is not a C identifier",
                self.config.name
            ))
            .into());
        }

        let root = myriad_object()?;
        let mut known: FxHashMap<String, Arc<ClassDescriptor>> = FxHashMap::default();
        known.insert(root.name().to_string(), Arc::clone(&root));
        for import in &self.imports {
            let mut link = Some(import);
            while let Some(class) = link {
                known
                    .entry(class.name().to_string())
                    .or_insert_with(|| Arc::clone(class));
                link = class.superclass();
            }
        }

        for draft in &self.drafts {
            if draft.coprocessor() && !self.config.coprocessor {
                return Err(CodegenError::CoprocessorDisabled {
                    class: draft.name().to_string(),
                    module: self.config.name.clone(),
                });
            }
        }

        let order = ClassHierarchyResolver::order(&self.drafts, &known)?;

        let mut inherited: Vec<&Arc<ClassDescriptor>> = known.values().collect();
        inherited.sort_by(|a, b| a.name().cmp(b.name()));
        let mut owners = delegator_owners(inherited)?;

        let mut resolver = ClassHierarchyResolver::new();
        let mut resolved = known;
        let mut classes = Vec::with_capacity(order.len());
        for draft in order {
            let superclass = resolved
                .get(draft.superclass())
                .cloned()
                .ok_or_else(|| CodegenError::UnknownSuperclass {
                    class: draft.name().to_string(),
                    superclass: draft.superclass().to_string(),
                })?;
            let class = resolver.resolve(draft, &superclass)?;
            resolved.insert(class.descriptor.name().to_string(), Arc::clone(&class.descriptor));
            classes.push(class);
        }

        for class in &classes {
            let names = class.delegators.iter().chain(&class.super_delegators).map(|d| d.name());
            claim_delegators(&mut owners, class.descriptor.name(), names)?;
        }

        let mut mirror = CoprocessorMirror::default();
        for class in resolved.values().filter(|c| c.coprocessor_enabled()) {
            mirror.enable_class(class);
        }

        let mut artifacts = Vec::with_capacity(classes.len());
        for class in classes {
            let descriptor = class.descriptor;
            let mirror_artifacts = if descriptor.coprocessor_enabled() {
                Some(mirror.generate(&descriptor)?)
            } else {
                None
            };
            let class_ctor = init::class_ctor(&descriptor)?;
            let init = init::init_function(&descriptor, class_ctor.is_some())?;
            let implementations = implementation_artifacts(&descriptor)?;

            artifacts.push(ClassArtifacts {
                descriptor,
                typedefs: class.typedefs,
                delegators: class.delegators,
                super_delegators: class.super_delegators,
                implementations,
                mirror: mirror_artifacts,
                class_ctor,
                init,
            });
        }
        let classes = artifacts;

        let ModuleBuilder {
            config,
            globals,
            functions,
            ..
        } = self;

        // Class object variables come first and cannot be replaced.
        let mut all_globals = Vec::with_capacity(classes.len() * 2 + globals.entries.len());
        for class in &classes {
            all_globals.push(class_var(class.name())?);
            all_globals.push(class_var(class.descriptor.class_name())?);
        }
        let mut generated: FxHashSet<String> =
            all_globals.iter().map(|g| g.ident().to_string()).collect();
        generated.extend(owners.into_keys());
        for class in &classes {
            generated.insert(class.init.name().to_string());
        }
        let mut user_names: Vec<&String> = globals.index.keys().chain(functions.index.keys()).collect();
        user_names.sort();
        for name in user_names {
            if generated.contains(name) {
                return Err(CodegenError::DuplicateDeclaration {
                    module: config.name.clone(),
                    name: name.clone(),
                });
            }
        }
        all_globals.extend(globals.entries);

        tracing::debug!(
            classes = classes.len(),
            globals = all_globals.len(),
            functions = functions.entries.len(),
            "built module"
        );

        Ok(Module {
            config,
            kind: ModuleKind::User,
            root,
            classes,
            globals: all_globals,
            functions: functions.entries,
        })
    }
}

/// Delegator and super-delegator names introduced by `classes`, with the
/// class introducing each.
pub fn delegator_owners<'a>(
    classes: impl IntoIterator<Item = &'a Arc<ClassDescriptor>>,
) -> CodegenResult<FxHashMap<String, String>> {
    let mut owners = FxHashMap::default();
    for class in classes {
        let names = class
            .methods()
            .iter()
            .filter(|m| m.introduced_by() == class.name())
            .flat_map(|m| [m.delegator().ident(), m.super_delegator().ident()]);
        claim_delegators(&mut owners, class.name(), names)?;
    }
    Ok(owners)
}

/// Record `class` as the owner of `names`. Delegators are public C
/// functions, so two classes cannot introduce the same one.
pub fn claim_delegators<'a>(
    owners: &mut FxHashMap<String, String>,
    class: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> CodegenResult<()> {
    for name in names {
        match owners.get(name) {
            Some(owner) if owner != class => {
                return Err(CodegenError::DelegatorClash {
                    name: name.to_string(),
                    first: owner.clone(),
                    second: class.to_string(),
                });
            }
            Some(_) => {}
            None => {
                owners.insert(name.to_string(), class.to_string());
            }
        }
    }
    Ok(())
}

fn implementation_artifacts(class: &ClassDescriptor) -> CodegenResult<Vec<ImplementationArtifact>> {
    let mut out = Vec::new();
    for method in class.implemented_methods() {
        let Some(implementation) = method.implementation() else {
            continue;
        };
        let signature = method
            .signature()
            .renamed(implementation.symbol(), FunctionKind::Method)?;
        match implementation.source() {
            ImplSource::External => out.push(ImplementationArtifact::Extern(signature)),
            ImplSource::Verbatim(body) => out.push(ImplementationArtifact::Definition(FunctionDef::new(
                signature.with_qualifiers(Qualifiers::STATIC)?,
                indent_body(body),
            ))),
            ImplSource::Runtime | ImplSource::Mirror => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests;
