//! Command handlers for the `myriadc` CLI.
//!
//! Each submodule implements one command. Output handling shared by the
//! commands lives here in the module root.

use std::path::PathBuf;

use myriad_codegen::c::renderers_for;
use myriad_codegen::Module;

use crate::DriverError;

mod gen;
mod runtime;

pub use gen::generate;
pub use runtime::runtime_header;

/// Where generated files go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputOptions {
    /// Output directory, created if missing.
    pub dir: PathBuf,
    /// Print to stdout instead of writing files.
    pub print: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        OutputOptions {
            dir: PathBuf::from("."),
            print: false,
        }
    }
}

impl OutputOptions {
    /// Parse `[-o <dir>] [--print]`, returning the options and the
    /// remaining positional arguments.
    pub fn parse(args: &[String]) -> Result<(Self, Vec<String>), String> {
        let mut options = OutputOptions::default();
        let mut positional = Vec::new();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-o" | "--out" => {
                    let Some(dir) = args.get(i + 1) else {
                        return Err(format!("missing directory after `{}`", args[i]));
                    };
                    options.dir = PathBuf::from(dir);
                    i += 2;
                }
                "--print" | "-p" => {
                    options.print = true;
                    i += 1;
                }
                flag if flag.starts_with('-') => return Err(format!("unknown option `{flag}`")),
                arg => {
                    positional.push(arg.to_string());
                    i += 1;
                }
            }
        }
        Ok((options, positional))
    }
}

/// One generated file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Emitted {
    Written(PathBuf),
    Printed { name: String, text: String },
}

/// Render every file of `module` according to `output`.
fn emit(module: &Module, output: &OutputOptions) -> Result<Vec<Emitted>, DriverError> {
    if !output.print {
        std::fs::create_dir_all(&output.dir).map_err(|source| DriverError::Io {
            path: output.dir.clone(),
            source,
        })?;
    }

    let mut emitted = Vec::new();
    for mut renderer in renderers_for(module) {
        let name = renderer.file_name(module);
        if output.print {
            let text = renderer.render(module);
            emitted.push(Emitted::Printed { name, text });
        } else {
            let path = renderer
                .write(module, &output.dir)
                .map_err(|source| DriverError::Io {
                    path: output.dir.join(&name),
                    source,
                })?;
            emitted.push(Emitted::Written(path));
        }
    }
    Ok(emitted)
}
