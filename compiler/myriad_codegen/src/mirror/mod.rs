//! Host/device mirroring for coprocessor-enabled classes.
//!
//! A coprocessor class gets two generated instance routines bound to the
//! root `cudafy`/`decudafy` slots (unless the class implements them itself):
//!
//! - `<Object>_cudafy(void* _self, int clobber)` builds a device copy of an
//!   object. The device handle is cached in the runtime's side table;
//!   without `clobber` a cached copy is returned as-is, with it a fresh copy
//!   is allocated and replaces the cached handle.
//! - `<Object>_decudafy(void* _self, void* cuda_self)` copies device-side
//!   state back into the host object.
//!
//! Both work from a [`MirrorPlan`]: every field of the object layout,
//! flattened across the whole inheritance chain, classified by how it
//! crosses the boundary. An embedded object is walked with its own class's
//! plan, so its nested objects are mirrored and its `const` fields are left
//! alone like those of the outer object. The [`emulator`] gives the same
//! plans executable semantics on an in-memory heap.
//!
//! The class object itself is mirrored by `<Object>Class_cudafy`, which
//! patches device function pointers into a copy of the class and relinks
//! its `super` to the superclass's device class.

pub mod emulator;

use std::sync::Arc;

use myriad_types::{
    FunctionKind, FunctionSignature, Qualifiers, Scalar, StructType, TypeError, SUPER_FIELD,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::artifact::FunctionDef;
use crate::class::{ClassDescriptor, ImplSource, Implementation, Method, MethodKind};
use crate::context::CodegenContext;
use crate::naming::{self, ROOT_CLASS, ROOT_OBJECT};
use crate::CodegenResult;

/// How a field crosses the host/device boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Copied bytewise. Pointers are copied shallowly.
    Plain { pointer: bool },
    /// Pointer to an object of a coprocessor class; mirrored recursively.
    NestedObject { class: String },
    /// By-value object of a coprocessor class; its class pointer is
    /// rewritten to the device class and its own fields follow its plan.
    EmbeddedObject { class: String },
}

/// One field of a mirror plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorField {
    pub name: String,
    /// Struct in the chain that declares the field.
    pub owner: String,
    pub kind: FieldKind,
    /// Whether device-side changes are copied back.
    pub sync_back: bool,
}

/// Flattened, classified field list of one object layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorPlan {
    pub object: String,
    pub fields: Vec<MirrorField>,
}

impl MirrorPlan {
    pub fn field(&self, name: &str) -> Option<&MirrorField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Generated mirror code for one class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorArtifacts {
    pub plan: MirrorPlan,
    /// Object-to-device routine, unless the class implements `cudafy`.
    pub to_device: Option<FunctionDef>,
    /// Device-to-object routine, unless the class implements `decudafy`.
    pub from_device: Option<FunctionDef>,
    /// Class-object mirror (`<Object>Class_cudafy`).
    pub class_to_device: FunctionDef,
}

/// Mirror generator for the coprocessor-enabled classes of a module.
#[derive(Clone, Debug, Default)]
pub struct CoprocessorMirror {
    /// Object struct names of every coprocessor-enabled class in scope.
    enabled: FxHashSet<String>,
    /// Object layouts of resolved coprocessor classes, for embedded objects.
    layouts: FxHashMap<String, Arc<StructType>>,
}

impl CoprocessorMirror {
    pub fn new(enabled: impl IntoIterator<Item = String>) -> Self {
        CoprocessorMirror {
            enabled: enabled.into_iter().collect(),
            layouts: FxHashMap::default(),
        }
    }

    pub fn enable(&mut self, class: impl Into<String>) {
        self.enabled.insert(class.into());
    }

    /// Enable a resolved class, making its layout available to classes
    /// that embed it by value.
    pub fn enable_class(&mut self, class: &ClassDescriptor) {
        self.enable(class.name());
        self.layouts
            .insert(class.name().to_string(), Arc::clone(class.object_struct()));
    }

    pub fn is_enabled(&self, class: &str) -> bool {
        self.enabled.contains(class)
    }

    /// Bind generated `cudafy`/`decudafy` implementations to a class's
    /// method table, keeping any the class provides itself.
    pub(crate) fn bind_slots(class: &str, methods: &mut [Method]) {
        for method in methods.iter_mut() {
            if method.introduced_by() != ROOT_OBJECT {
                continue;
            }
            if !matches!(method.name(), "cudafy" | "decudafy") {
                continue;
            }
            if method.implementation().is_some_and(|i| i.provided_by() == class) {
                continue;
            }
            let symbol = naming::implementation_name(class, method.name());
            method.bind(
                MethodKind::Normal,
                Implementation::new(symbol, class, ImplSource::Mirror),
            );
        }
    }

    /// Flatten and classify the fields of an object layout.
    pub fn plan(&self, object: &StructType) -> MirrorPlan {
        let mut structs: Vec<&StructType> = object.chain().collect();
        structs.reverse();

        let mut fields = Vec::new();
        for owner in structs {
            for field in owner.fields() {
                if field.ident() == SUPER_FIELD || (owner.name() == ROOT_OBJECT && field.ident() == "m_class") {
                    continue;
                }
                fields.push(MirrorField {
                    name: field.ident().to_string(),
                    owner: owner.name().to_string(),
                    kind: self.classify(field),
                    sync_back: !field.is_const(),
                });
            }
        }
        MirrorPlan {
            object: object.name().to_string(),
            fields,
        }
    }

    fn classify(&self, field: &Scalar) -> FieldKind {
        let indirection = field.indirection();
        let base = field.base_type().struct_name().filter(|s| self.is_enabled(s));
        match (base, indirection) {
            (Some(class), 0) => FieldKind::EmbeddedObject {
                class: class.to_string(),
            },
            (Some(class), 1) => FieldKind::NestedObject {
                class: class.to_string(),
            },
            _ => FieldKind::Plain {
                pointer: indirection > 0,
            },
        }
    }

    /// Generate the mirror routines for a resolved coprocessor class.
    #[tracing::instrument(level = "debug", skip_all, fields(class = %class.name()))]
    pub fn generate(&self, class: &ClassDescriptor) -> CodegenResult<MirrorArtifacts> {
        let plan = self.plan(class.object_struct());
        let generated = |name: &str| {
            class
                .method(name)
                .and_then(Method::implementation)
                .is_some_and(|i| i.source() == &ImplSource::Mirror && i.provided_by() == class.name())
        };

        let to_device = match class.method("cudafy") {
            Some(method) if generated("cudafy") => Some(self.object_to_device(class, method, &plan)?),
            _ => None,
        };
        let from_device = match class.method("decudafy") {
            Some(method) if generated("decudafy") => Some(self.object_from_device(class, method, &plan)?),
            _ => None,
        };
        let class_to_device = self.class_to_device(class)?;

        tracing::debug!(
            fields = plan.fields.len(),
            to_device = to_device.is_some(),
            from_device = from_device.is_some(),
            "generated mirror"
        );

        Ok(MirrorArtifacts {
            plan,
            to_device,
            from_device,
            class_to_device,
        })
    }

    fn object_to_device(
        &self,
        class: &ClassDescriptor,
        method: &Method,
        plan: &MirrorPlan,
    ) -> CodegenResult<FunctionDef> {
        let object = class.name();
        let signature = static_impl(method, object)?;

        let mut ctx = CodegenContext::with_indent(1);
        ctx.directive("#ifdef CUDA");
        ctx.writeln("void* device_self = myriad_device_handle_of(_self);");
        ctx.writeln("if (device_self != NULL && !clobber)");
        ctx.open_block();
        ctx.writeln("return device_self;");
        ctx.close_block("}");
        ctx.newline();
        ctx.writeln("const size_t my_size = myriad_size_of(_self);");
        ctx.writeln("CUDA_CHECK_RETURN(cudaMalloc(&device_self, my_size));");
        ctx.writeln("myriad_cache_device_handle(_self, device_self);");
        ctx.newline();
        ctx.writeln(&format!("struct {object}* self = (struct {object}*) _self;"));
        ctx.writeln(&format!(
            "struct {object}* self_copy = (struct {object}*) calloc(1, my_size);"
        ));
        ctx.writeln("assert(self_copy);");
        ctx.writeln("memcpy(self_copy, self, my_size);");
        ctx.newline();
        ctx.writeln(&format!(
            "const struct {ROOT_CLASS}* host_class = (const struct {ROOT_CLASS}*) myriad_class_of(_self);"
        ));
        ctx.writeln(&format!(
            "memcpy((void*) &((struct {ROOT_OBJECT}*) self_copy)->m_class, &host_class->device_class, sizeof(void*));"
        ));

        let mut embedding = vec![object.to_string()];
        self.fields_to_device(&mut ctx, plan, "self", "self_copy", "", &mut embedding)?;

        ctx.newline();
        ctx.writeln(
            "CUDA_CHECK_RETURN(cudaMemcpy(device_self, (void*) self_copy, my_size, cudaMemcpyHostToDevice));",
        );
        ctx.writeln("free(self_copy);");
        ctx.writeln("return device_self;");
        ctx.directive("#else");
        ctx.writeln("return NULL;");
        ctx.directive("#endif");

        Ok(FunctionDef::new(signature, ctx.take_output()))
    }

    fn object_from_device(
        &self,
        class: &ClassDescriptor,
        method: &Method,
        plan: &MirrorPlan,
    ) -> CodegenResult<FunctionDef> {
        let object = class.name();
        let signature = static_impl(method, object)?;

        let mut ctx = CodegenContext::with_indent(1);
        ctx.directive("#ifdef CUDA");
        ctx.writeln("const size_t my_size = myriad_size_of(_self);");
        ctx.writeln(&format!("struct {object}* self = (struct {object}*) _self;"));
        ctx.writeln(&format!(
            "struct {object}* from_device = (struct {object}*) calloc(1, my_size);"
        ));
        ctx.writeln("assert(from_device);");
        ctx.writeln(
            "CUDA_CHECK_RETURN(cudaMemcpy((void*) from_device, cuda_self, my_size, cudaMemcpyDeviceToHost));",
        );

        let mut embedding = vec![object.to_string()];
        self.fields_from_device(&mut ctx, plan, "self", "from_device", &mut embedding)?;

        ctx.writeln("free(from_device);");
        ctx.directive("#endif");
        ctx.writeln("return;");

        Ok(FunctionDef::new(signature, ctx.take_output()))
    }

    /// Device-copy fixups for the fields of `plan`, read from the object at
    /// `host` and written to its staging copy at `copy`. Both are pointer
    /// expressions. Plain fields were already copied bytewise.
    fn fields_to_device(
        &self,
        ctx: &mut CodegenContext,
        plan: &MirrorPlan,
        host: &str,
        copy: &str,
        prefix: &str,
        embedding: &mut Vec<String>,
    ) -> CodegenResult<()> {
        for field in &plan.fields {
            let host_field = member(host, field);
            let copy_field = member(copy, field);
            match &field.kind {
                FieldKind::Plain { .. } => {}
                FieldKind::NestedObject { .. } => {
                    let local = format!("device_{prefix}{}", field.name);
                    ctx.newline();
                    ctx.writeln(&format!("if ({host_field} != NULL)"));
                    ctx.open_block();
                    ctx.writeln(&format!("void* {local} = myriad_cudafy((void*) {host_field}, 0);"));
                    ctx.writeln(&format!("memcpy((void*) &{copy_field}, &{local}, sizeof(void*));"));
                    ctx.close_block("}");
                }
                FieldKind::EmbeddedObject { class } => {
                    ctx.newline();
                    ctx.open_block();
                    ctx.writeln(&format!(
                        "const struct {ROOT_CLASS}* embedded_class = ((const struct {ROOT_OBJECT}*) &{host_field})->m_class;"
                    ));
                    ctx.writeln(&format!(
                        "memcpy((void*) &((struct {ROOT_OBJECT}*) &{copy_field})->m_class, &embedded_class->device_class, sizeof(void*));"
                    ));
                    ctx.close_block("}");

                    let inner = self.embedded_plan(class, embedding)?;
                    self.fields_to_device(
                        ctx,
                        &inner,
                        &format!("&{host_field}"),
                        &format!("&{copy_field}"),
                        &format!("{prefix}{}_", field.name),
                        embedding,
                    )?;
                    embedding.pop();
                }
            }
        }
        Ok(())
    }

    /// Write-back of the syncable fields of `plan` from the device image at
    /// `device` into the object at `host`.
    fn fields_from_device(
        &self,
        ctx: &mut CodegenContext,
        plan: &MirrorPlan,
        host: &str,
        device: &str,
        embedding: &mut Vec<String>,
    ) -> CodegenResult<()> {
        for field in plan.fields.iter().filter(|f| f.sync_back) {
            let host_field = member(host, field);
            let device_field = member(device, field);
            match &field.kind {
                FieldKind::Plain { pointer: true } => {}
                FieldKind::Plain { pointer: false } => {
                    ctx.writeln(&format!(
                        "memcpy((void*) &{host_field}, (const void*) &{device_field}, sizeof({host_field}));"
                    ));
                }
                FieldKind::NestedObject { .. } => {
                    ctx.writeln(&format!("if ({host_field} != NULL && {device_field} != NULL)"));
                    ctx.open_block();
                    ctx.writeln(&format!("myriad_decudafy((void*) {host_field}, (void*) {device_field});"));
                    ctx.close_block("}");
                }
                FieldKind::EmbeddedObject { class } => {
                    let inner = self.embedded_plan(class, embedding)?;
                    self.fields_from_device(
                        ctx,
                        &inner,
                        &format!("&{host_field}"),
                        &format!("&{device_field}"),
                        embedding,
                    )?;
                    embedding.pop();
                }
            }
        }
        Ok(())
    }

    /// Plan of an embedded object's class, pushed onto `embedding`. The
    /// caller pops it once the embedded fields are emitted.
    fn embedded_plan(&self, class: &str, embedding: &mut Vec<String>) -> CodegenResult<MirrorPlan> {
        if embedding.iter().any(|c| c == class) {
            embedding.push(class.to_string());
            return Err(TypeError::invalid(format!(
                "objects embed each other by value: {}",
                embedding.join(" -> ")
            ))
            .into());
        }
        let layout = self.layouts.get(class).ok_or_else(|| {
            TypeError::invalid(format!("layout of embedded object class `{class}` is not known"))
        })?;
        embedding.push(class.to_string());
        Ok(self.plan(layout))
    }

    /// `<Object>Class_cudafy`: copy the class object, patch device function
    /// pointers for the slots this class implements, relink `super`.
    fn class_to_device(&self, class: &ClassDescriptor) -> CodegenResult<FunctionDef> {
        let object = class.name();
        let class_struct = class.class_name();
        let superclass = class.superclass().map_or(ROOT_OBJECT, |s| s.name());
        let super_class_var = naming::class_struct_name(superclass);

        let cudafy = class
            .method("cudafy")
            .ok_or_else(|| TypeError::invalid(format!("`{object}` has no cudafy slot")))?;
        let signature = cudafy
            .signature()
            .renamed(naming::class_cudafy_name(object), FunctionKind::Method)?
            .with_qualifiers(Qualifiers::STATIC)?;

        let mut ctx = CodegenContext::with_indent(1);
        ctx.directive("#ifdef CUDA");
        ctx.writeln(&format!("struct {class_struct}* my_class = (struct {class_struct}*) _self;"));
        ctx.writeln(&format!("struct {class_struct} copy_class = *my_class;"));
        ctx.writeln(&format!(
            "struct {ROOT_CLASS}* copy_class_class = (struct {ROOT_CLASS}*) &copy_class;"
        ));
        ctx.newline();
        ctx.writeln("if (clobber)");
        ctx.open_block();
        for method in device_slots(class) {
            let introducer = naming::class_struct_name(method.introduced_by());
            let local = format!("my_{}", method.name());
            ctx.writeln(&format!("{} {local} = NULL;", method.typedef()));
            ctx.writeln("CUDA_CHECK_RETURN(");
            ctx.indent();
            ctx.writeln(&format!(
                "cudaMemcpyFromSymbol((void**) &{local}, (const void*) &{}, sizeof(void*), 0, cudaMemcpyDeviceToHost)",
                naming::device_pointer_name(object, method.name())
            ));
            ctx.dedent();
            ctx.writeln(");");
            ctx.writeln(&format!(
                "((struct {introducer}*) &copy_class)->{} = {local};",
                method.slot()
            ));
        }
        ctx.writeln(&format!(
            "const struct {ROOT_CLASS}* super_class = (const struct {ROOT_CLASS}*) {superclass};"
        ));
        ctx.writeln("memcpy((void**) &copy_class_class->super, &super_class->device_class, sizeof(void*));");
        ctx.close_block("}");
        ctx.newline();
        ctx.writeln(&format!(
            "return super_cudafy({super_class_var}, (void*) &copy_class, 0);"
        ));
        ctx.directive("#else");
        ctx.writeln("return NULL;");
        ctx.directive("#endif");

        Ok(FunctionDef::new(signature, ctx.take_output()))
    }
}

/// Slots of `class` whose implementation has a device-side counterpart:
/// user implementations this class provides.
pub fn device_slots(class: &ClassDescriptor) -> impl Iterator<Item = &Method> {
    class.implemented_methods().filter(|m| {
        m.implementation()
            .is_some_and(|i| matches!(i.source(), ImplSource::External | ImplSource::Verbatim(_)))
    })
}

/// `((struct <Owner>*) <base>)-><field>`
fn member(base: &str, field: &MirrorField) -> String {
    format!("((struct {}*) {base})->{}", field.owner, field.name)
}

fn static_impl(method: &Method, object: &str) -> CodegenResult<FunctionSignature> {
    Ok(method
        .signature()
        .renamed(
            naming::implementation_name(object, method.name()),
            FunctionKind::Method,
        )?
        .with_qualifiers(Qualifiers::STATIC)?)
}

#[cfg(test)]
mod tests;
