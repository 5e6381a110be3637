//! `<Name>.h` rendering.
//!
//! Section order:
//!
//! 1. include guard
//! 2. library includes (sorted), then local includes
//! 3. slot typedefs
//! 4. struct forward declarations
//! 5. `extern` module globals
//! 6. `extern` module functions
//! 7. runtime declarations
//! 8. struct definitions and delegator prototypes
//!
//! The runtime header (`MyriadObject.h`) defines the root structs in
//! section 8; user headers define their own classes there.

use super::runtime::{emit_runtime_declarations, VOIDF_TYPEDEF};
use super::Renderer;
use crate::context::CodegenContext;
use crate::module::{Module, ModuleKind};

/// Renders the public header of a module.
#[derive(Debug, Default)]
pub struct HeaderRenderer {
    ctx: CodegenContext,
}

impl HeaderRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit_prelude(&mut self, module: &Module) {
        let guard = module.config().header_guard("H");
        self.ctx.directive(&format!("#ifndef {guard}"));
        self.ctx.directive(&format!("#define {guard}"));
        self.ctx.newline();

        for lib in &module.config().lib_includes {
            self.ctx.directive(&format!("#include <{lib}>"));
        }
        self.ctx.newline();
        let locals = module.local_includes();
        if !locals.is_empty() {
            for local in &locals {
                self.ctx.directive(&format!("#include \"{local}\""));
            }
            self.ctx.newline();
        }
    }

    fn emit_typedefs(&mut self, module: &Module) {
        if module.kind() == ModuleKind::Runtime {
            self.ctx.writeln(VOIDF_TYPEDEF);
        }
        let typedefs = module.typedefs();
        for typedef in &typedefs {
            self.ctx.writeln(&typedef.stringify());
        }
        if module.kind() == ModuleKind::Runtime || !typedefs.is_empty() {
            self.ctx.newline();
        }
    }

    fn emit_forward_declarations(&mut self, module: &Module) {
        match module.kind() {
            ModuleKind::Runtime => {
                let root = module.root();
                self.ctx.writeln(&root.class_struct().stringify_forward());
                self.ctx.writeln(&root.object_struct().stringify_forward());
                self.ctx.newline();
            }
            ModuleKind::User => {
                for class in module.classes() {
                    self.ctx
                        .writeln(&class.descriptor.class_struct().stringify_forward());
                    self.ctx
                        .writeln(&class.descriptor.object_struct().stringify_forward());
                    self.ctx.newline();
                }
            }
        }
    }

    fn emit_externs(&mut self, module: &Module) {
        if !module.globals().is_empty() {
            for global in module.globals() {
                self.ctx.writeln(&format!("extern {};", global.stringify_decl()));
            }
            self.ctx.newline();
        }
        if !module.functions().is_empty() {
            for function in module.functions() {
                self.ctx
                    .writeln(&format!("extern {};", function.signature.stringify_decl()));
            }
            self.ctx.newline();
        }
    }

    fn emit_definitions(&mut self, module: &Module) {
        match module.kind() {
            ModuleKind::Runtime => {
                let root = module.root();
                self.ctx.writeln(&root.object_struct().stringify_decl());
                self.ctx.newline();
                self.ctx.writeln(&root.class_struct().stringify_decl());
                self.ctx.newline();
            }
            ModuleKind::User => {
                for class in module.classes() {
                    let descriptor = &class.descriptor;
                    self.ctx.writeln(&descriptor.object_struct().stringify_decl());
                    self.ctx.newline();
                    self.ctx.writeln(&descriptor.class_struct().stringify_decl());
                    self.ctx.newline();
                    for delegator in &class.delegators {
                        self.ctx.writeln(&delegator.stringify_extern());
                    }
                    for super_delegator in &class.super_delegators {
                        self.ctx.writeln(&super_delegator.stringify_extern());
                    }
                    self.ctx.writeln(&class.init.stringify_extern());
                    self.ctx.newline();
                }
            }
        }
    }
}

impl Renderer for HeaderRenderer {
    fn extension(&self) -> &'static str {
        "h"
    }

    fn render(&mut self, module: &Module) -> String {
        self.reset();
        self.emit_prelude(module);
        self.emit_typedefs(module);
        self.emit_forward_declarations(module);
        self.emit_externs(module);
        emit_runtime_declarations(&mut self.ctx);
        self.emit_definitions(module);
        self.ctx.directive("#endif");
        self.ctx.take_output()
    }

    fn reset(&mut self) {
        self.ctx.reset();
    }
}
