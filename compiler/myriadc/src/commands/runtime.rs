//! The `runtime` command: generate the object runtime header.

use myriad_codegen::Module;

use super::{emit, Emitted, OutputOptions};
use crate::DriverError;

/// Generate `MyriadObject.h`.
pub fn runtime_header(output: &OutputOptions) -> Result<Vec<Emitted>, DriverError> {
    let module = Module::runtime()?;
    emit(&module, output)
}
