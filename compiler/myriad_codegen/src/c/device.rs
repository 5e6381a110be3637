//! `<Name>.cuh` rendering: device-side symbols of coprocessor classes.

use super::Renderer;
use crate::context::CodegenContext;
use crate::mirror::device_slots;
use crate::module::Module;
use crate::naming::{self, ROOT_CLASS};

/// Renders the device header of a coprocessor module.
#[derive(Debug, Default)]
pub struct DeviceHeaderRenderer {
    ctx: CodegenContext,
}

impl DeviceHeaderRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for DeviceHeaderRenderer {
    fn extension(&self) -> &'static str {
        "cuh"
    }

    fn render(&mut self, module: &Module) -> String {
        self.reset();
        let guard = module.config().header_guard("CUH");
        self.ctx.directive(&format!("#ifndef {guard}"));
        self.ctx.directive(&format!("#define {guard}"));
        self.ctx.newline();
        self.ctx
            .directive(&format!("#include \"{}.h\"", module.name()));
        self.ctx.newline();

        for class in module.classes().iter().filter(|c| c.descriptor.coprocessor_enabled()) {
            let descriptor = &class.descriptor;
            self.ctx.writeln_once(&format!(
                "extern __device__ __constant__ struct {ROOT_CLASS}* {};",
                naming::device_handle_name(descriptor.class_name())
            ));
            self.ctx.writeln_once(&format!(
                "extern __device__ __constant__ struct {}* {};",
                descriptor.class_name(),
                naming::device_handle_name(descriptor.name())
            ));
            for method in device_slots(descriptor) {
                self.ctx.writeln_once(&format!(
                    "extern __device__ {} {};",
                    method.typedef(),
                    naming::device_pointer_name(descriptor.name(), method.name())
                ));
            }
            self.ctx.newline();
        }

        self.ctx.directive("#endif");
        self.ctx.take_output()
    }

    fn reset(&mut self) {
        self.ctx.reset();
    }
}
