#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::naming::ROOT_OBJECT;
use myriad_types::CType;
use pretty_assertions::assert_eq;

fn self_param() -> Scalar {
    Scalar::plain("_self", TypeDescriptor::VOID, true).unwrap()
}

fn add_mech() -> FunctionSignature {
    FunctionSignature::new(
        "add_mech",
        vec![
            self_param(),
            Scalar::plain("mechanism", TypeDescriptor::VOID, true).unwrap(),
        ],
        Scalar::returning(TypeDescriptor::INT, false, Qualifiers::empty()),
        FunctionKind::Method,
    )
    .unwrap()
}

fn dtor() -> FunctionSignature {
    FunctionSignature::new(
        "dtor",
        vec![self_param()],
        Scalar::returning(TypeDescriptor::INT, false, Qualifiers::empty()),
        FunctionKind::Method,
    )
    .unwrap()
}

fn step() -> FunctionSignature {
    FunctionSignature::new(
        "step",
        vec![
            self_param(),
            Scalar::plain("dt", TypeDescriptor::Primitive(CType::Double), false).unwrap(),
        ],
        Scalar::void_return(),
        FunctionKind::Method,
    )
    .unwrap()
}

#[test]
fn delegator_dispatches_through_class_slot() {
    let mut gen = DelegatorGenerator::new();
    let def = gen.delegator_for(&add_mech(), "Compartment").unwrap();
    assert_eq!(
        def.stringify_def(),
        "int add_mech(void* _self, void* mechanism)\n\
         {\n    \
         const struct CompartmentClass* m_class = (const struct CompartmentClass*) myriad_class_of(_self);\n    \
         assert(m_class->my_add_mech);\n    \
         return m_class->my_add_mech(_self, mechanism);\n\
         }"
    );
    assert_eq!(def.signature.kind(), FunctionKind::Delegator);
}

#[test]
fn void_delegator_returns_after_call() {
    let mut gen = DelegatorGenerator::new();
    let def = gen.delegator_for(&step(), "Soma").unwrap();
    assert_eq!(
        def.body,
        "    const struct SomaClass* m_class = (const struct SomaClass*) myriad_class_of(_self);\n    \
         assert(m_class->my_step);\n    \
         m_class->my_step(_self, dt);\n    \
         return;\n"
    );
}

#[test]
fn super_delegator_takes_explicit_class() {
    let mut gen = DelegatorGenerator::new();
    let def = gen.super_delegator_for(&dtor(), "Compartment").unwrap();
    assert_eq!(
        def.stringify_def(),
        "int super_dtor(const void* _class, void* _self)\n\
         {\n    \
         const struct CompartmentClass* superclass = (const struct CompartmentClass*) myriad_super(_class);\n    \
         return superclass->my_dtor(_self);\n\
         }"
    );
    assert_eq!(def.signature.kind(), FunctionKind::SuperDelegator);
}

#[test]
fn void_super_delegator() {
    let mut gen = DelegatorGenerator::new();
    let def = gen.super_delegator_for(&step(), "Soma").unwrap();
    assert_eq!(
        def.stringify_def(),
        "void super_step(const void* _class, void* _self, double dt)\n\
         {\n    \
         const struct SomaClass* superclass = (const struct SomaClass*) myriad_super(_class);\n    \
         superclass->my_step(_self, dt);\n    \
         return;\n\
         }"
    );
}

#[test]
fn root_methods_use_runtime_names() {
    let mut gen = DelegatorGenerator::new();
    let def = gen.delegator_for(&dtor(), ROOT_OBJECT).unwrap();
    assert_eq!(def.name(), "myriad_dtor");
    assert!(def.body.contains("(const struct MyriadClass*) myriad_class_of(_self)"));
    assert_eq!(gen.typedef_for(&dtor(), ROOT_OBJECT).unwrap().name, "dtor_t");
}

#[test]
fn typedef_spells_slot_type() {
    let mut gen = DelegatorGenerator::new();
    let typedef = gen.typedef_for(&add_mech(), "Compartment").unwrap();
    assert_eq!(
        typedef.stringify(),
        "typedef int (*Compartment_add_mech_t)(void* _self, void* mechanism);"
    );
}

#[test]
fn results_are_memoized() {
    let mut gen = DelegatorGenerator::new();
    let a = gen.delegator_for(&add_mech(), "Compartment").unwrap();
    let b = gen.delegator_for(&add_mech(), "Compartment").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(gen.delegator_count(), 1);

    let s1 = gen.super_delegator_for(&add_mech(), "Compartment").unwrap();
    let s2 = gen.super_delegator_for(&add_mech(), "Compartment").unwrap();
    assert!(Arc::ptr_eq(&s1, &s2));

    let t1 = gen.typedef_for(&add_mech(), "Compartment").unwrap();
    let t2 = gen.typedef_for(&add_mech(), "Compartment").unwrap();
    assert!(Arc::ptr_eq(&t1, &t2));

    // Different owner, different artifact.
    let c = gen.delegator_for(&add_mech(), "Soma").unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn conflicting_signature_for_same_key_fails() {
    let mut gen = DelegatorGenerator::new();
    gen.delegator_for(&add_mech(), "Compartment").unwrap();
    let other = FunctionSignature::new(
        "add_mech",
        vec![self_param()],
        Scalar::returning(TypeDescriptor::INT, false, Qualifiers::empty()),
        FunctionKind::Method,
    )
    .unwrap();
    assert!(gen.delegator_for(&other, "Compartment").is_err());
}

#[test]
fn reserved_parameter_names_are_rejected() {
    let mut gen = DelegatorGenerator::new();
    let sig = FunctionSignature::new(
        "bad",
        vec![
            self_param(),
            Scalar::plain("_class", TypeDescriptor::VOID, true).unwrap(),
        ],
        Scalar::void_return(),
        FunctionKind::Method,
    )
    .unwrap();
    assert!(gen.super_delegator_for(&sig, "Compartment").is_err());
    assert!(gen.delegator_for(&sig, "Compartment").is_err());
}

#[test]
fn module_function_without_self_is_rejected() {
    let mut gen = DelegatorGenerator::new();
    let sig = FunctionSignature::new(
        "free_fn",
        vec![Scalar::plain("x", TypeDescriptor::INT, false).unwrap()],
        Scalar::void_return(),
        FunctionKind::Module,
    )
    .unwrap();
    assert!(gen.delegator_for(&sig, "Compartment").is_err());
}
