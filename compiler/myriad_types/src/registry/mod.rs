//! Registry of type names known to a module.
//!
//! Primitives are always known; struct tags and function-pointer typedefs
//! must be registered before they can be referenced. The registry also
//! parses the textual type syntax used by class descriptors:
//!
//! ```text
//! type  := base '*'* ('[' len ']')?
//! base  := primitive | 'struct' IDENT | TYPEDEF
//! len   := INTEGER | IDENT
//! ```

use std::collections::BTreeSet;

use crate::error::check_identifier;
use crate::{ArrayLen, CType, TypeDescriptor, TypeError};

/// Struct tags and typedef names visible to a module.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    /// Struct tags (sorted for deterministic diagnostics).
    structs: BTreeSet<String>,
    /// Function-pointer typedef names.
    typedefs: BTreeSet<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a struct tag. Re-registering is a no-op.
    pub fn register_struct(&mut self, name: &str) -> Result<(), TypeError> {
        check_identifier(name, "struct name")?;
        self.structs.insert(name.to_string());
        Ok(())
    }

    /// Register a function-pointer typedef name.
    pub fn register_typedef(&mut self, name: &str) -> Result<(), TypeError> {
        check_identifier(name, "typedef name")?;
        if name.parse::<CType>().is_ok() {
            return Err(TypeError::invalid(format!(
                "typedef `{name}` shadows a primitive type"
            )));
        }
        self.typedefs.insert(name.to_string());
        Ok(())
    }

    pub fn has_struct(&self, name: &str) -> bool {
        self.structs.contains(name)
    }

    pub fn has_typedef(&self, name: &str) -> bool {
        self.typedefs.contains(name)
    }

    /// Parse a type expression such as `const`-free `double*`,
    /// `struct Compartment*` or `double[SIMUL_LEN]`.
    pub fn parse(&self, text: &str) -> Result<TypeDescriptor, TypeError> {
        let text = text.trim();
        let (head, len) = match text.strip_suffix(']') {
            Some(rest) => {
                let open = rest
                    .rfind('[')
                    .ok_or_else(|| TypeError::invalid(format!("unbalanced `]` in type `{text}`")))?;
                (&rest[..open], Some(Self::parse_len(rest[open + 1..].trim())?))
            }
            None => (text, None),
        };

        let mut base = head.trim_end();
        let mut depth: u8 = 0;
        while let Some(rest) = base.strip_suffix('*') {
            depth = depth
                .checked_add(1)
                .ok_or_else(|| TypeError::invalid(format!("too many pointer levels in `{text}`")))?;
            base = rest.trim_end();
        }

        let mut ty = self.parse_base(base)?;
        if depth > 0 {
            ty = TypeDescriptor::pointer(ty, depth)?;
        }
        match len {
            Some(len) => TypeDescriptor::array(ty, len),
            None => Ok(ty),
        }
    }

    fn parse_base(&self, base: &str) -> Result<TypeDescriptor, TypeError> {
        if base.is_empty() {
            return Err(TypeError::invalid("empty type"));
        }
        if let Some(tag) = base.strip_prefix("struct ") {
            let tag = tag.trim();
            if !self.has_struct(tag) {
                return Err(TypeError::invalid(format!("unknown struct `{tag}`")));
            }
            return Ok(TypeDescriptor::Struct(tag.to_string()));
        }
        if let Ok(prim) = base.parse::<CType>() {
            return Ok(TypeDescriptor::Primitive(prim));
        }
        if self.has_typedef(base) {
            return Ok(TypeDescriptor::FunctionPointer(base.to_string()));
        }
        Err(TypeError::invalid(format!("unknown type `{base}`")))
    }

    fn parse_len(len: &str) -> Result<ArrayLen, TypeError> {
        if len.bytes().all(|b| b.is_ascii_digit()) && !len.is_empty() {
            return len
                .parse::<usize>()
                .map(ArrayLen::Const)
                .map_err(|e| TypeError::invalid(format!("bad array length `{len}`: {e}")));
        }
        check_identifier(len, "array length symbol")?;
        Ok(ArrayLen::Symbol(len.to_string()))
    }
}
