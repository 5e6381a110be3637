//! Primitive C types.

use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// A primitive (built-in) C type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CType {
    Void,
    Char,
    Int,
    UInt,
    Int64,
    UInt64,
    Float,
    Double,
    SizeT,
    VaList,
    Bool,
}

impl CType {
    /// All primitives, in declaration order.
    pub const ALL: [CType; 11] = [
        CType::Void,
        CType::Char,
        CType::Int,
        CType::UInt,
        CType::Int64,
        CType::UInt64,
        CType::Float,
        CType::Double,
        CType::SizeT,
        CType::VaList,
        CType::Bool,
    ];

    /// The C spelling of this type.
    pub fn c_name(self) -> &'static str {
        match self {
            CType::Void => "void",
            CType::Char => "char",
            CType::Int => "int",
            CType::UInt => "unsigned int",
            CType::Int64 => "int64_t",
            CType::UInt64 => "uint64_t",
            CType::Float => "float",
            CType::Double => "double",
            CType::SizeT => "size_t",
            CType::VaList => "va_list",
            CType::Bool => "bool",
        }
    }

    #[inline]
    pub fn is_void(self) -> bool {
        self == CType::Void
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

impl FromStr for CType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.as_str() {
            "unsigned" => return Ok(CType::UInt),
            "_Bool" => return Ok(CType::Bool),
            _ => {}
        }
        CType::ALL
            .into_iter()
            .find(|ty| ty.c_name() == normalized)
            .ok_or_else(|| TypeError::invalid(format!("unknown primitive type `{s}`")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_spelling() {
        for ty in CType::ALL {
            assert_eq!(ty.c_name().parse::<CType>(), Ok(ty));
        }
    }

    #[test]
    fn parse_accepts_aliases_and_extra_spaces() {
        assert_eq!("unsigned".parse::<CType>(), Ok(CType::UInt));
        assert_eq!("unsigned   int".parse::<CType>(), Ok(CType::UInt));
        assert_eq!("_Bool".parse::<CType>(), Ok(CType::Bool));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(matches!(
            "long double".parse::<CType>(),
            Err(TypeError::InvalidType { .. })
        ));
    }
}
