//! Generation session: modules built in order, sharing their classes.

use std::sync::Arc;

use myriad_codegen::module::claim_delegators;
use myriad_codegen::{ClassDescriptor, Module, ModuleBuilder};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::descriptor::ModuleDescriptor;
use crate::DriverError;

/// Classes resolved so far, by class name, with the module defining each.
#[derive(Debug, Default)]
pub struct Session {
    classes: FxHashMap<String, (String, Arc<ClassDescriptor>)>,
    modules: FxHashSet<String>,
    /// Delegator names generated so far, with the class introducing each.
    delegators: FxHashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A class defined by an earlier module.
    pub fn class(&self, name: &str) -> Option<&Arc<ClassDescriptor>> {
        self.classes.get(name).map(|(_, class)| class)
    }

    /// Resolve one descriptor into a module, making its classes available
    /// to later descriptors.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %descriptor.module))]
    pub fn build(&mut self, descriptor: &ModuleDescriptor) -> Result<Module, DriverError> {
        if self.modules.contains(&descriptor.module) {
            return Err(DriverError::DuplicateModule {
                module: descriptor.module.clone(),
            });
        }

        let mut config = descriptor.config();
        let mut imports = Vec::with_capacity(descriptor.imports.len());
        for name in &descriptor.imports {
            let (module, class) =
                self.classes
                    .get(name)
                    .ok_or_else(|| DriverError::UnknownImport {
                        module: descriptor.module.clone(),
                        class: name.clone(),
                    })?;
            config = config.include_local(format!("{module}.h"));
            imports.push(Arc::clone(class));
        }

        let imported_names = imports
            .iter()
            .flat_map(|class| class.chain())
            .filter(|class| !class.is_root())
            .map(ClassDescriptor::name);
        let registry = descriptor.registry(imported_names)?;

        let policy = descriptor.policy()?;
        let mut builder = ModuleBuilder::new(config);
        for class in imports {
            builder.import_class(class);
        }
        for draft in descriptor.drafts(&registry)? {
            builder.define_class(draft);
        }
        for global in descriptor.globals(&registry)? {
            builder.register_global(global, policy)?;
        }
        for function in descriptor.functions(&registry)? {
            builder.register_function(function, policy)?;
        }
        let module = builder.build()?;

        // Delegators are unique across every module of the session.
        let mut delegators = self.delegators.clone();
        for class in module.classes() {
            let names = class
                .delegators
                .iter()
                .chain(&class.super_delegators)
                .map(|d| d.name());
            claim_delegators(&mut delegators, class.name(), names)?;
        }
        self.delegators = delegators;

        for class in module.classes() {
            tracing::trace!(class = class.name(), "registered class");
            self.classes.insert(
                class.name().to_string(),
                (module.name().to_string(), Arc::clone(&class.descriptor)),
            );
        }
        self.modules.insert(module.name().to_string());
        Ok(module)
    }
}
