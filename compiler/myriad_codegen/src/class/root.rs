//! The built-in root class, `MyriadObject`, and its metaclass `MyriadClass`.
//!
//! Every user class that names no superclass derives from it. Its four
//! methods are implemented by the object runtime.

use std::sync::Arc;

use myriad_types::{
    CType, FunctionKind, FunctionSignature, Qualifiers, Scalar, StructLayoutBuilder, StructType,
    TypeDescriptor, TypeError,
};

use super::{ClassDescriptor, ImplSource, Implementation, Method, MethodKind};
use crate::naming::{self, ROOT_CLASS, ROOT_OBJECT};

fn self_param() -> Result<Scalar, TypeError> {
    Scalar::plain("_self", TypeDescriptor::VOID, true)
}

fn void_ptr() -> Scalar {
    Scalar::returning(TypeDescriptor::VOID, true, Qualifiers::empty())
}

/// Instance signatures of the root methods, in slot order.
fn root_signatures() -> Result<Vec<FunctionSignature>, TypeError> {
    let va_list = TypeDescriptor::Primitive(CType::VaList);
    Ok(vec![
        FunctionSignature::new(
            "ctor",
            vec![self_param()?, Scalar::plain("app", va_list, true)?],
            void_ptr(),
            FunctionKind::Method,
        )?,
        FunctionSignature::new(
            "dtor",
            vec![self_param()?],
            Scalar::returning(TypeDescriptor::INT, false, Qualifiers::empty()),
            FunctionKind::Method,
        )?,
        FunctionSignature::new(
            "cudafy",
            vec![self_param()?, Scalar::plain("clobber", TypeDescriptor::INT, false)?],
            void_ptr(),
            FunctionKind::Method,
        )?,
        FunctionSignature::new(
            "decudafy",
            vec![
                self_param()?,
                Scalar::plain("cuda_self", TypeDescriptor::VOID, true)?,
            ],
            Scalar::void_return(),
            FunctionKind::Method,
        )?,
    ])
}

/// Build the root class descriptor.
pub fn myriad_object() -> Result<Arc<ClassDescriptor>, TypeError> {
    let class_ptr = |ident: &str| {
        Scalar::new(
            ident,
            TypeDescriptor::Struct(ROOT_CLASS.to_string()),
            true,
            Qualifiers::CONST,
        )
    };

    let object_struct = Arc::new(StructType::new(ROOT_OBJECT, vec![class_ptr("m_class")?])?);

    let mut methods = Vec::new();
    for signature in root_signatures()? {
        let name = signature.ident().to_string();
        let implementation = Implementation::new(
            naming::implementation_name(ROOT_OBJECT, &name),
            ROOT_OBJECT,
            ImplSource::Runtime,
        );
        methods.push(Method::introduce(
            ROOT_OBJECT,
            signature,
            MethodKind::Normal,
            Some(implementation),
        )?);
    }

    let mut class_fields = vec![
        class_ptr("super")?,
        class_ptr("device_class")?,
        Scalar::plain("size", TypeDescriptor::Primitive(CType::SizeT), false)?,
    ];
    for method in &methods {
        class_fields.push(Scalar::plain(
            method.slot(),
            TypeDescriptor::FunctionPointer(method.typedef().to_string()),
            false,
        )?);
    }
    let class_struct = Arc::new(StructLayoutBuilder::build(
        ROOT_CLASS,
        Some(&object_struct),
        class_fields,
    )?);

    Ok(Arc::new(ClassDescriptor::new(
        ROOT_OBJECT.to_string(),
        object_struct,
        class_struct,
        None,
        methods,
        false,
        false,
    )))
}
