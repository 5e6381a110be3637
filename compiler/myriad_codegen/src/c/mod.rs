//! C file renderers.
//!
//! Each renderer turns a resolved [`Module`] into one file:
//!
//! | Renderer                 | File          |
//! |--------------------------|---------------|
//! | [`HeaderRenderer`]       | `<Name>.h`    |
//! | [`SourceRenderer`]       | `<Name>.c`    |
//! | [`DeviceHeaderRenderer`] | `<Name>.cuh`  |
//!
//! Rendering is deterministic: the same module always produces the same
//! bytes.

mod device;
mod header;
pub mod runtime;
mod source;

use std::io;
use std::path::{Path, PathBuf};

pub use device::DeviceHeaderRenderer;
pub use header::HeaderRenderer;
pub use source::SourceRenderer;

use crate::module::Module;

/// Renders a module to the text of one file.
pub trait Renderer {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    /// Render `module`. The renderer is reset first.
    fn render(&mut self, module: &Module) -> String;

    /// Drop any buffered state.
    fn reset(&mut self);

    /// `<module>.<extension>`
    fn file_name(&self, module: &Module) -> String {
        format!("{}.{}", module.name(), self.extension())
    }

    /// Render `module` into `dir`, returning the written path.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %module.name(), ext = self.extension()))]
    fn write(&mut self, module: &Module, dir: &Path) -> io::Result<PathBuf> {
        let text = self.render(module);
        let path = dir.join(self.file_name(module));
        std::fs::write(&path, text)?;
        tracing::debug!(path = %path.display(), "wrote file");
        Ok(path)
    }
}

/// Renderers that apply to `module`, in write order.
pub fn renderers_for(module: &Module) -> Vec<Box<dyn Renderer>> {
    let mut out: Vec<Box<dyn Renderer>> = vec![Box::new(HeaderRenderer::new())];
    if module.kind() == crate::module::ModuleKind::User {
        out.push(Box::new(SourceRenderer::new()));
        if module.has_device_code() {
            out.push(Box::new(DeviceHeaderRenderer::new()));
        }
    }
    out
}
