#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::{CType, TypeDescriptor};
use pretty_assertions::assert_eq;

fn ptr(name: &str) -> Scalar {
    Scalar::plain(name, TypeDescriptor::VOID, true).unwrap()
}

fn int_ret() -> Scalar {
    Scalar::returning(TypeDescriptor::INT, false, Qualifiers::empty())
}

fn add_mech() -> FunctionSignature {
    FunctionSignature::new(
        "add_mech",
        vec![ptr("_self"), ptr("mechanism")],
        int_ret(),
        FunctionKind::Method,
    )
    .unwrap()
}

#[test]
fn renders_prototype_and_typedef() {
    let sig = add_mech();
    assert_eq!(sig.stringify_decl(), "int add_mech(void* _self, void* mechanism)");
    assert_eq!(
        sig.stringify_typedef("Compartment_add_mech_t"),
        "typedef int (*Compartment_add_mech_t)(void* _self, void* mechanism);"
    );
    assert_eq!(sig.stringify_call("m_class->my_add_mech"), "m_class->my_add_mech(_self, mechanism)");
}

#[test]
fn empty_parameter_list_renders_void() {
    let sig = FunctionSignature::new("initCUDAObjects", vec![], int_ret(), FunctionKind::Module).unwrap();
    assert_eq!(sig.stringify_decl(), "int initCUDAObjects(void)");
}

#[test]
fn structural_equality_ignores_names() {
    let a = add_mech();
    let b = FunctionSignature::new(
        "other_name",
        vec![ptr("self"), ptr("m")],
        int_ret(),
        FunctionKind::Delegator,
    )
    .unwrap();
    assert!(a.is_structurally_equal(&b));
}

#[test]
fn structural_equality_checks_order_arity_and_return() {
    let base = add_mech();

    let reordered = FunctionSignature::new(
        "add_mech",
        vec![
            ptr("_self"),
            Scalar::plain("count", TypeDescriptor::INT, false).unwrap(),
        ],
        int_ret(),
        FunctionKind::Method,
    )
    .unwrap();
    assert!(!base.is_structurally_equal(&reordered));

    let shorter =
        FunctionSignature::new("add_mech", vec![ptr("_self")], int_ret(), FunctionKind::Method).unwrap();
    assert!(!base.is_structurally_equal(&shorter));

    let double_ret = FunctionSignature::new(
        "add_mech",
        vec![ptr("_self"), ptr("mechanism")],
        Scalar::returning(TypeDescriptor::Primitive(CType::Double), false, Qualifiers::empty()),
        FunctionKind::Method,
    )
    .unwrap();
    assert!(!base.is_structurally_equal(&double_ret));
}

#[test]
fn duplicate_parameters_are_invalid() {
    let err = FunctionSignature::new(
        "f",
        vec![ptr("_self"), ptr("_self")],
        int_ret(),
        FunctionKind::Method,
    )
    .unwrap_err();
    assert!(matches!(err, TypeError::InvalidType { .. }));
}

#[test]
fn methods_need_a_self_pointer() {
    let err = FunctionSignature::new(
        "step",
        vec![Scalar::plain("dt", TypeDescriptor::DOUBLE, false).unwrap()],
        Scalar::void_return(),
        FunctionKind::Method,
    )
    .unwrap_err();
    assert!(matches!(err, TypeError::InvalidType { .. }));
}

#[test]
fn leading_param_is_prepended() {
    let class_param = Scalar::new("_class", TypeDescriptor::VOID, true, Qualifiers::CONST).unwrap();
    let sig = add_mech()
        .renamed("super_add_mech", FunctionKind::SuperDelegator)
        .unwrap()
        .with_leading_param(class_param)
        .unwrap();
    assert_eq!(
        sig.stringify_decl(),
        "int super_add_mech(const void* _class, void* _self, void* mechanism)"
    );
}

#[test]
fn static_functions_render_storage() {
    let sig = add_mech().with_qualifiers(Qualifiers::STATIC).unwrap();
    assert_eq!(sig.stringify_decl(), "static int add_mech(void* _self, void* mechanism)");
    assert!(add_mech().with_qualifiers(Qualifiers::CONST).is_err());
}
