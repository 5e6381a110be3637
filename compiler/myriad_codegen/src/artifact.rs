//! Generated C artifacts.
//!
//! Artifacts are fully-formed pieces of C (a signature plus body text) that
//! renderers place into files. They are produced once and shared by `Arc`.

use myriad_types::FunctionSignature;

/// A function definition with generated or user-supplied body text.
///
/// `body` holds the statements between the braces, one per line, each
/// already indented one level and newline-terminated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDef {
    pub signature: FunctionSignature,
    pub body: String,
}

impl FunctionDef {
    pub fn new(signature: FunctionSignature, body: impl Into<String>) -> Self {
        FunctionDef {
            signature,
            body: body.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.signature.ident()
    }

    /// `<prototype>;`
    pub fn stringify_prototype(&self) -> String {
        format!("{};", self.signature.stringify_decl())
    }

    /// `extern <prototype>;`
    pub fn stringify_extern(&self) -> String {
        format!("extern {};", self.signature.stringify_decl())
    }

    /// Full definition: prototype, then the braced body.
    pub fn stringify_def(&self) -> String {
        format!("{}\n{{\n{}}}", self.signature.stringify_decl(), self.body)
    }
}

/// A function-pointer typedef naming a method's slot type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typedef {
    pub name: String,
    pub signature: FunctionSignature,
}

impl Typedef {
    pub fn stringify(&self) -> String {
        self.signature.stringify_typedef(&self.name)
    }
}

/// Re-indent user-supplied body text to one level inside a function.
///
/// Leading and trailing blank lines are dropped; common indentation is
/// stripped so verbatim bodies keep their relative layout.
pub fn indent_body(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = String::with_capacity(text.len() + lines.len() * 4);
    for line in lines {
        if line.trim().is_empty() {
            out.push('\n');
            continue;
        }
        out.push_str("    ");
        out.push_str(line.get(common..).unwrap_or(line.trim_start()).trim_end());
        out.push('\n');
    }
    out
}
