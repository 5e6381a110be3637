//! Struct types and their binary layout.
//!
//! Inheritance is expressed purely through layout: a derived struct embeds
//! its superclass struct by value, `const`-qualified, as its first field
//! named `_`. A pointer to the derived struct can then be reinterpreted as a
//! pointer to any ancestor. No other implicit fields are ever introduced.
//!
//! # Layout
//!
//! ```text
//! struct Derived
//! {
//!     const struct Base _;   // only when a superclass exists
//!     <declared fields, in the order supplied>
//! };
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::check_identifier;
use crate::{Qualifiers, Scalar, TypeDescriptor, TypeError};

/// Name of the synthetic field embedding the superclass struct.
pub const SUPER_FIELD: &str = "_";

/// A C struct with an ordered field list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructType {
    name: String,
    fields: Vec<Scalar>,
    superclass: Option<Arc<StructType>>,
}

impl StructType {
    /// Create a struct without a superclass.
    pub fn new(name: impl Into<String>, fields: Vec<Scalar>) -> Result<Self, TypeError> {
        StructLayoutBuilder::build(name, None, fields)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in layout order, including the embedded superclass.
    #[inline]
    pub fn fields(&self) -> &[Scalar] {
        &self.fields
    }

    #[inline]
    pub fn superclass(&self) -> Option<&Arc<StructType>> {
        self.superclass.as_ref()
    }

    /// Fields declared on this struct itself (everything except `_`).
    pub fn declared_fields(&self) -> &[Scalar] {
        if self.superclass.is_some() {
            &self.fields[1..]
        } else {
            &self.fields
        }
    }

    /// Look up a field declared directly on this struct.
    pub fn field(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|f| f.ident() == name)
    }

    /// This struct followed by each ancestor, nearest first.
    pub fn chain(&self) -> impl Iterator<Item = &StructType> {
        std::iter::successors(Some(self), |s| s.superclass.as_deref())
    }

    /// The struct in the chain (this one included) that declares `field`.
    pub fn declaring_struct(&self, field: &str) -> Option<&StructType> {
        self.chain().find(|s| s.field(field).is_some())
    }

    /// Whether `ancestor` is this struct or one of its ancestors.
    pub fn extends(&self, ancestor: &str) -> bool {
        self.chain().any(|s| s.name == ancestor)
    }

    /// `struct <name>` as a type.
    pub fn as_type(&self) -> TypeDescriptor {
        TypeDescriptor::Struct(self.name.clone())
    }

    /// Render the forward declaration, e.g. `struct Compartment;`.
    pub fn stringify_forward(&self) -> String {
        format!("struct {};", self.name)
    }

    /// Render the full definition.
    pub fn stringify_decl(&self) -> String {
        let mut out = format!("struct {}\n{{\n", self.name);
        for field in &self.fields {
            out.push_str("    ");
            out.push_str(&field.stringify_decl());
            out.push_str(";\n");
        }
        out.push_str("};");
        out
    }
}

/// Computes struct layouts, enforcing the embedding invariant.
pub struct StructLayoutBuilder;

impl StructLayoutBuilder {
    /// Build a struct from its declared fields and optional superclass.
    ///
    /// The field order is `_` (when `superclass` is present) followed by
    /// `fields` exactly as supplied. Fails with
    /// [`TypeError::DuplicateField`] if a declared field collides with any
    /// field in the ancestor chain, `_` included, or with another declared
    /// field.
    pub fn build(
        name: impl Into<String>,
        superclass: Option<&Arc<StructType>>,
        fields: Vec<Scalar>,
    ) -> Result<StructType, TypeError> {
        let name = name.into();
        check_identifier(&name, "struct name")?;

        // Field name -> struct declaring it, across the whole chain.
        let mut taken: FxHashMap<String, String> = FxHashMap::default();
        if let Some(parent) = superclass {
            taken.insert(SUPER_FIELD.to_string(), name.clone());
            for ancestor in parent.chain() {
                for field in ancestor.fields() {
                    taken
                        .entry(field.ident().to_string())
                        .or_insert_with(|| ancestor.name.clone());
                }
            }
        }

        let mut layout = Vec::with_capacity(fields.len() + 1);
        if let Some(parent) = superclass {
            layout.push(Scalar::new(
                SUPER_FIELD,
                parent.as_type(),
                false,
                Qualifiers::CONST,
            )?);
        }

        for field in fields {
            field.check_storable("field")?;
            if let Some(declared_in) = taken.get(field.ident()) {
                return Err(TypeError::DuplicateField {
                    struct_name: name,
                    field: field.ident().to_string(),
                    declared_in: declared_in.clone(),
                });
            }
            taken.insert(field.ident().to_string(), name.clone());
            layout.push(field);
        }

        tracing::trace!(
            struct_name = %name,
            fields = layout.len(),
            superclass = superclass.map(|s| s.name()),
            "built struct layout"
        );

        Ok(StructType {
            name,
            fields: layout,
            superclass: superclass.cloned(),
        })
    }
}
