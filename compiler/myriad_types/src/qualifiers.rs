//! Declaration qualifiers.

use bitflags::bitflags;

use crate::TypeError;

bitflags! {
    /// Qualifier set attached to a scalar or function declaration.
    ///
    /// `CONST` and `VOLATILE` qualify the type; `STATIC` and `EXTERN` are
    /// storage classes and only make sense on globals and functions.
    #[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Debug)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
        const STATIC = 1 << 2;
        const EXTERN = 1 << 3;
    }
}

impl Qualifiers {
    /// Type qualifiers only (the part that takes part in type identity).
    pub const CV: Qualifiers = Qualifiers::CONST.union(Qualifiers::VOLATILE);

    /// Storage classes only.
    pub const STORAGE: Qualifiers = Qualifiers::STATIC.union(Qualifiers::EXTERN);

    /// Parse a qualifier set from its C keywords.
    ///
    /// Fails with [`TypeError::InvalidType`] on an unrecognized keyword or
    /// when `static` and `extern` are combined.
    pub fn parse<I, S>(names: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut quals = Qualifiers::empty();
        for name in names {
            let name = name.as_ref();
            quals |= match name.trim() {
                "const" => Qualifiers::CONST,
                "volatile" => Qualifiers::VOLATILE,
                "static" => Qualifiers::STATIC,
                "extern" => Qualifiers::EXTERN,
                _ => return Err(TypeError::invalid(format!("unknown qualifier `{name}`"))),
            };
        }
        if quals.contains(Qualifiers::STORAGE) {
            return Err(TypeError::invalid(
                "qualifiers `static` and `extern` are mutually exclusive",
            ));
        }
        Ok(quals)
    }

    /// Render as a declaration prefix: storage class first, then cv, each
    /// followed by a space. Empty for an empty set.
    pub fn prefix(self) -> String {
        let mut out = String::new();
        for (flag, word) in [
            (Qualifiers::STATIC, "static "),
            (Qualifiers::EXTERN, "extern "),
            (Qualifiers::CONST, "const "),
            (Qualifiers::VOLATILE, "volatile "),
        ] {
            if self.contains(flag) {
                out.push_str(word);
            }
        }
        out
    }
}
