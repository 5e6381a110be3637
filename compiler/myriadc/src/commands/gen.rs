//! The `gen` command: generate C for one or more descriptor files.

use std::path::Path;

use super::{emit, Emitted, OutputOptions};
use crate::descriptor::ModuleDescriptor;
use crate::session::Session;
use crate::DriverError;

/// Generate every descriptor in order. Later descriptors may import the
/// classes of earlier ones.
pub fn generate<P: AsRef<Path>>(paths: &[P], output: &OutputOptions) -> Result<Vec<Emitted>, DriverError> {
    let mut session = Session::new();
    let mut emitted = Vec::new();
    for path in paths {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading descriptor");
        let descriptor = ModuleDescriptor::load(path)?;
        let module = session.build(&descriptor)?;
        emitted.extend(emit(&module, output)?);
    }
    Ok(emitted)
}
