//! Class hierarchy resolution.
//!
//! Resolution runs in two steps. [`ClassHierarchyResolver::order`] checks
//! the inheritance graph of a module (single inheritance, known
//! superclasses, no cycles) and returns the drafts in dependency order.
//! [`ClassHierarchyResolver::resolve`] then turns one draft into a
//! [`ResolvedClass`]: layouts, the merged method table and the delegator
//! artifacts for the methods it introduces.
//!
//! # Method table
//!
//! The table of a class is its superclass's table, in the same order,
//! followed by the methods it introduces in definition order. Overrides
//! replace the implementation of an inherited entry in place; the slot
//! position never changes.

use std::sync::Arc;

use myriad_types::{Scalar, StructLayoutBuilder, TypeDescriptor};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::artifact::{FunctionDef, Typedef};
use crate::class::{ClassDescriptor, ClassDraft, ImplSource, Implementation, Method, MethodKind};
use crate::delegator::DelegatorGenerator;
use crate::mirror::CoprocessorMirror;
use crate::naming;
use crate::{CodegenError, CodegenResult};

/// A resolved class together with the artifacts generated for it.
#[derive(Clone, Debug)]
pub struct ResolvedClass {
    pub descriptor: Arc<ClassDescriptor>,
    /// Slot typedefs for introduced methods.
    pub typedefs: Vec<Arc<Typedef>>,
    pub delegators: Vec<Arc<FunctionDef>>,
    pub super_delegators: Vec<Arc<FunctionDef>>,
}

/// Resolves drafts against their superclasses.
#[derive(Debug, Default)]
pub struct ClassHierarchyResolver {
    delegators: DelegatorGenerator,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl ClassHierarchyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the inheritance graph and return drafts so that every
    /// superclass precedes its subclasses.
    ///
    /// `known` holds classes resolved elsewhere (the root and imports).
    /// Drafts already in dependency order keep their submission order.
    pub fn order<'d>(
        drafts: &'d [ClassDraft],
        known: &FxHashMap<String, Arc<ClassDescriptor>>,
    ) -> CodegenResult<Vec<&'d ClassDraft>> {
        let mut by_name: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, draft) in drafts.iter().enumerate() {
            if draft.superclasses().len() > 1 {
                return Err(CodegenError::UnsupportedHierarchy {
                    class: draft.name().to_string(),
                    bases: draft.superclasses().to_vec(),
                });
            }
            if by_name.insert(draft.name(), i).is_some() || known.contains_key(draft.name()) {
                return Err(CodegenError::DuplicateClass {
                    class: draft.name().to_string(),
                });
            }
        }
        for draft in drafts {
            let parent = draft.superclass();
            if !by_name.contains_key(parent) && !known.contains_key(parent) {
                return Err(CodegenError::UnknownSuperclass {
                    class: draft.name().to_string(),
                    superclass: parent.to_string(),
                });
            }
        }

        let mut state: FxHashMap<usize, Visit> = FxHashMap::default();
        let mut order = Vec::with_capacity(drafts.len());
        for start in 0..drafts.len() {
            if state.contains_key(&start) {
                continue;
            }
            // Walk up the superclass chain, then emit it root-first.
            let mut path: Vec<usize> = Vec::new();
            let mut current = Some(start);
            while let Some(i) = current {
                match state.get(&i) {
                    Some(Visit::Done) => break,
                    Some(Visit::InProgress) => {
                        let from = path.iter().position(|&p| p == i).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[from..].iter().map(|&p| drafts[p].name().to_string()).collect();
                        cycle.push(drafts[i].name().to_string());
                        return Err(CodegenError::CyclicInheritance { cycle });
                    }
                    None => {
                        state.insert(i, Visit::InProgress);
                        path.push(i);
                        current = by_name.get(drafts[i].superclass()).copied();
                    }
                }
            }
            for &i in path.iter().rev() {
                state.insert(i, Visit::Done);
                order.push(&drafts[i]);
            }
        }

        tracing::debug!(classes = order.len(), "ordered class hierarchy");
        Ok(order)
    }

    /// Resolve `draft` against its (already resolved) superclass.
    #[tracing::instrument(level = "debug", skip_all, fields(class = %draft.name()))]
    pub fn resolve(
        &mut self,
        draft: &ClassDraft,
        superclass: &Arc<ClassDescriptor>,
    ) -> CodegenResult<ResolvedClass> {
        let object = draft.name();
        if draft.superclasses().len() > 1 {
            return Err(CodegenError::UnsupportedHierarchy {
                class: object.to_string(),
                bases: draft.superclasses().to_vec(),
            });
        }
        if draft.superclass() != superclass.name() {
            return Err(CodegenError::UnknownSuperclass {
                class: object.to_string(),
                superclass: draft.superclass().to_string(),
            });
        }

        let mut methods: Vec<Method> = superclass.methods().to_vec();
        let mut taken_names: FxHashSet<String> = methods
            .iter()
            .flat_map(|m| [m.delegator().ident().to_string(), m.super_delegator().ident().to_string()])
            .collect();
        let mut defined: FxHashSet<&str> = FxHashSet::default();
        let mut introduced = Vec::new();

        for def in draft.methods() {
            let name = def.name();
            if !defined.insert(name) {
                return Err(CodegenError::DuplicateMethod {
                    class: object.to_string(),
                    method: name.to_string(),
                });
            }
            let implementation = def.body().map(|body| match def.kind() {
                MethodKind::Normal => Implementation::new(body, object, ImplSource::External),
                MethodKind::Verbatim => Implementation::new(
                    naming::implementation_name(object, name),
                    object,
                    ImplSource::Verbatim(body.to_string()),
                ),
            });

            if let Some(inherited) = methods.iter_mut().find(|m| m.name() == name) {
                if !inherited.signature().is_structurally_equal(def.signature()) {
                    return Err(CodegenError::SignatureMismatch {
                        class: object.to_string(),
                        method: name.to_string(),
                        introduced_by: inherited.introduced_by().to_string(),
                        expected: inherited.signature().stringify_decl(),
                        found: def.signature().stringify_decl(),
                    });
                }
                if let Some(implementation) = implementation {
                    inherited.bind(def.kind(), implementation);
                }
                continue;
            }

            let method = Method::introduce(object, def.signature().clone(), def.kind(), implementation)?;
            for generated in [method.delegator().ident(), method.super_delegator().ident()] {
                if !taken_names.insert(generated.to_string()) {
                    return Err(CodegenError::DuplicateMethod {
                        class: object.to_string(),
                        method: generated.to_string(),
                    });
                }
            }
            introduced.push(methods.len());
            methods.push(method);
        }

        if draft.coprocessor() {
            CoprocessorMirror::bind_slots(object, &mut methods);
        }

        if !draft.is_abstract() {
            if let Some(missing) = methods.iter().find(|m| m.implementation().is_none()) {
                return Err(CodegenError::MissingInstanceImplementation {
                    class: object.to_string(),
                    method: missing.name().to_string(),
                });
            }
        }

        let slots = introduced
            .iter()
            .map(|&i| {
                let m = &methods[i];
                Scalar::plain(m.slot(), TypeDescriptor::FunctionPointer(m.typedef().to_string()), false)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let class_struct = Arc::new(StructLayoutBuilder::build(
            naming::class_struct_name(object),
            Some(superclass.class_struct()),
            slots,
        )?);
        let object_struct = Arc::new(StructLayoutBuilder::build(
            object,
            Some(superclass.object_struct()),
            draft.declared_fields().to_vec(),
        )?);

        let mut typedefs = Vec::with_capacity(introduced.len());
        let mut delegators = Vec::with_capacity(introduced.len());
        let mut super_delegators = Vec::with_capacity(introduced.len());
        for &i in &introduced {
            let signature = methods[i].signature();
            typedefs.push(self.delegators.typedef_for(signature, object)?);
            delegators.push(self.delegators.delegator_for(signature, object)?);
            super_delegators.push(self.delegators.super_delegator_for(signature, object)?);
        }

        tracing::debug!(
            methods = methods.len(),
            introduced = introduced.len(),
            fields = object_struct.fields().len(),
            "resolved class"
        );

        let descriptor = Arc::new(ClassDescriptor::new(
            object.to_string(),
            object_struct,
            class_struct,
            Some(Arc::clone(superclass)),
            methods,
            draft.coprocessor(),
            draft.is_abstract(),
        ));

        Ok(ResolvedClass {
            descriptor,
            typedefs,
            delegators,
            super_delegators,
        })
    }
}
