//! `<Name>.c` rendering.

use super::runtime::emit_cuda_check;
use super::Renderer;
use crate::artifact::FunctionDef;
use crate::context::CodegenContext;
use crate::module::{ClassArtifacts, ImplementationArtifact, Module};
use crate::naming::{self, ROOT_CLASS};

/// Renders the implementation file of a module.
#[derive(Debug, Default)]
pub struct SourceRenderer {
    ctx: CodegenContext,
}

impl SourceRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit_def(&mut self, def: &FunctionDef) {
        self.ctx.writeln(&def.stringify_def());
        self.ctx.newline();
    }

    fn emit_banner(&mut self, title: &str) {
        let rule = "/".repeat(title.len() + 6);
        self.ctx.writeln(&rule);
        self.ctx.writeln(&format!("// {title} //"));
        self.ctx.writeln(&rule);
        self.ctx.newline();
    }

    fn emit_prelude(&mut self, module: &Module) {
        self.ctx.directive("#include <string.h>");
        self.ctx.newline();
        self.ctx
            .directive(&format!("#include \"{}.h\"", module.name()));
        if module.has_device_code() {
            self.ctx
                .directive(&format!("#include \"{}.cuh\"", module.name()));
            self.ctx.newline();
            emit_cuda_check(&mut self.ctx);
        }
        self.ctx.newline();
    }

    fn emit_globals(&mut self, module: &Module) {
        for global in module.globals() {
            self.ctx.writeln(&format!("{};", global.stringify_decl()));
        }
        self.ctx.newline();

        if module.has_device_code() {
            self.ctx.directive("#ifdef CUDA");
            for class in module.classes().iter().filter(|c| c.descriptor.coprocessor_enabled()) {
                let descriptor = &class.descriptor;
                self.ctx.writeln(&format!(
                    "__device__ __constant__ struct {ROOT_CLASS}* {};",
                    naming::device_handle_name(descriptor.class_name())
                ));
                self.ctx.writeln(&format!(
                    "__device__ __constant__ struct {}* {};",
                    descriptor.class_name(),
                    naming::device_handle_name(descriptor.name())
                ));
            }
            self.ctx.directive("#endif");
            self.ctx.newline();
        }

        for function in module.functions() {
            if let Some(def) = function.definition() {
                self.emit_def(&def);
            }
        }
    }

    fn emit_class(&mut self, class: &ClassArtifacts) {
        let name = class.name();

        if !class.implementations.is_empty() || class.mirror.is_some() {
            self.emit_banner(&format!("{name} implementations"));
            for implementation in &class.implementations {
                match implementation {
                    ImplementationArtifact::Extern(signature) => {
                        self.ctx
                            .writeln(&format!("extern {};", signature.stringify_decl()));
                        self.ctx.newline();
                    }
                    ImplementationArtifact::Definition(def) => self.emit_def(def),
                }
            }
            if let Some(mirror) = &class.mirror {
                if let Some(def) = &mirror.to_device {
                    self.emit_def(def);
                }
                if let Some(def) = &mirror.from_device {
                    self.emit_def(def);
                }
                self.emit_def(&mirror.class_to_device);
            }
        }

        if !class.delegators.is_empty() {
            self.emit_banner(&format!("{name} delegators"));
            for def in &class.delegators {
                self.emit_def(def);
            }
            for def in &class.super_delegators {
                self.emit_def(def);
            }
        }

        self.emit_banner(&format!("{name} initialization"));
        if let Some(def) = &class.class_ctor {
            self.emit_def(def);
        }
        self.emit_def(&class.init);
    }
}

impl Renderer for SourceRenderer {
    fn extension(&self) -> &'static str {
        "c"
    }

    fn render(&mut self, module: &Module) -> String {
        self.reset();
        self.emit_prelude(module);
        self.emit_globals(module);
        for class in module.classes() {
            self.emit_class(class);
        }
        self.ctx.take_output()
    }

    fn reset(&mut self) {
        self.ctx.reset();
    }
}
