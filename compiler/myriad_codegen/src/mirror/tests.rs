#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::emulator::{Emulator, EmulatorError, Record, Value};
use super::*;
use crate::class::{myriad_object, ClassDraft, MethodDef};
use crate::hierarchy::ClassHierarchyResolver;
use myriad_types::{ArrayLen, TypeDescriptor};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn field(name: &str, ty: TypeDescriptor, pointer: bool) -> Scalar {
    Scalar::plain(name, ty, pointer).unwrap()
}

fn const_field(name: &str, ty: TypeDescriptor) -> Scalar {
    Scalar::new(name, ty, false, Qualifiers::CONST).unwrap()
}

/// Mechanism { double g; } and Compartment { double vm; const int id;
/// double* trace; struct Mechanism* mech; struct Mechanism inline_mech; }
fn classes() -> (Arc<ClassDescriptor>, Arc<ClassDescriptor>) {
    let root = myriad_object().unwrap();
    let mut resolver = ClassHierarchyResolver::new();
    let mechanism = resolver
        .resolve(
            &ClassDraft::new("Mechanism")
                .field(field("g", TypeDescriptor::DOUBLE, false))
                .with_coprocessor(true),
            &root,
        )
        .unwrap()
        .descriptor;
    let compartment = resolver
        .resolve(
            &ClassDraft::new("Compartment")
                .field(field("vm", TypeDescriptor::DOUBLE, false))
                .field(const_field("id", TypeDescriptor::INT))
                .field(field("trace", TypeDescriptor::DOUBLE, true))
                .field(field("mech", TypeDescriptor::Struct("Mechanism".into()), true))
                .field(field("inline_mech", TypeDescriptor::Struct("Mechanism".into()), false))
                .with_coprocessor(true),
            &root,
        )
        .unwrap()
        .descriptor;
    (mechanism, compartment)
}

fn mirror() -> CoprocessorMirror {
    CoprocessorMirror::new(["Mechanism".to_string(), "Compartment".to_string()])
}

#[test]
fn plan_classifies_fields() {
    let (_, compartment) = classes();
    let plan = mirror().plan(compartment.object_struct());
    let summary: Vec<_> = plan
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.kind.clone(), f.sync_back))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("vm", FieldKind::Plain { pointer: false }, true),
            ("id", FieldKind::Plain { pointer: false }, false),
            ("trace", FieldKind::Plain { pointer: true }, true),
            (
                "mech",
                FieldKind::NestedObject {
                    class: "Mechanism".into()
                },
                true
            ),
            (
                "inline_mech",
                FieldKind::EmbeddedObject {
                    class: "Mechanism".into()
                },
                true
            ),
        ]
    );
}

#[test]
fn plan_flattens_the_chain() {
    let (_, compartment) = classes();
    let mut resolver = ClassHierarchyResolver::new();
    let soma = resolver
        .resolve(
            &ClassDraft::new("Soma")
                .extends("Compartment")
                .field(field("area", TypeDescriptor::DOUBLE, false))
                .with_coprocessor(true),
            &compartment,
        )
        .unwrap()
        .descriptor;
    let plan = mirror().plan(soma.object_struct());
    let owners: Vec<_> = plan.fields.iter().map(|f| (f.owner.as_str(), f.name.as_str())).collect();
    assert_eq!(owners.first(), Some(&("Compartment", "vm")));
    assert_eq!(owners.last(), Some(&("Soma", "area")));
    assert!(plan.field("m_class").is_none());
    assert!(plan.field("_").is_none());
}

#[test]
fn pointers_to_plain_structs_stay_shallow() {
    let mirror = CoprocessorMirror::new(["Compartment".to_string()]);
    let (_, compartment) = classes();
    let plan = mirror.plan(compartment.object_struct());
    assert_eq!(plan.field("mech").unwrap().kind, FieldKind::Plain { pointer: true });
    assert_eq!(
        plan.field("inline_mech").unwrap().kind,
        FieldKind::Plain { pointer: false }
    );
}

#[test]
fn generated_routines() {
    let (mechanism, compartment) = classes();
    let mut mirror = mirror();
    mirror.enable_class(&mechanism);
    let artifacts = mirror.generate(&compartment).unwrap();

    let to_device = artifacts.to_device.unwrap();
    assert_eq!(
        to_device.signature.stringify_decl(),
        "static void* Compartment_cudafy(void* _self, int clobber)"
    );
    let body = &to_device.body;
    assert!(body.starts_with("#ifdef CUDA\n    void* device_self = myriad_device_handle_of(_self);\n"));
    assert!(body.contains("myriad_cache_device_handle(_self, device_self);"));
    assert!(body.contains(
        "    if (((struct Compartment*) self)->mech != NULL)\n    {\n        void* device_mech = myriad_cudafy((void*) ((struct Compartment*) self)->mech, 0);\n"
    ));
    assert!(body.contains("&((struct MyriadObject*) &((struct Compartment*) self_copy)->inline_mech)->m_class"));
    assert!(!body.contains("->trace"));
    assert!(body.ends_with("#else\n    return NULL;\n#endif\n"));

    let from_device = artifacts.from_device.unwrap();
    assert_eq!(
        from_device.signature.stringify_decl(),
        "static void Compartment_decudafy(void* _self, void* cuda_self)"
    );
    let body = &from_device.body;
    assert!(body.contains(
        "memcpy((void*) &((struct Compartment*) self)->vm, (const void*) &((struct Compartment*) from_device)->vm, sizeof(((struct Compartment*) self)->vm));"
    ));
    // const and plain pointer fields are never written back.
    assert!(!body.contains("->id"));
    assert!(!body.contains("->trace"));
    assert!(body.contains("myriad_decudafy((void*) ((struct Compartment*) self)->mech, (void*) ((struct Compartment*) from_device)->mech);"));
    // The embedded mechanism is written back field by field, class pointer excluded.
    assert!(body.contains(
        "memcpy((void*) &((struct Mechanism*) &((struct Compartment*) self)->inline_mech)->g, (const void*) &((struct Mechanism*) &((struct Compartment*) from_device)->inline_mech)->g, sizeof(((struct Mechanism*) &((struct Compartment*) self)->inline_mech)->g));"
    ));
    assert!(!body.contains("sizeof(struct Mechanism)"));

    let class_copy = artifacts.class_to_device;
    assert_eq!(
        class_copy.signature.stringify_decl(),
        "static void* CompartmentClass_cudafy(void* _self, int clobber)"
    );
    assert!(class_copy.body.contains("(const struct MyriadClass*) MyriadObject;"));
    assert!(class_copy.body.contains("return super_cudafy(MyriadClass, (void*) &copy_class, 0);"));
}

#[test]
fn user_cudafy_suppresses_generated_routine() {
    let root = myriad_object().unwrap();
    let mut resolver = ClassHierarchyResolver::new();
    let cudafy = root.method("cudafy").unwrap().signature().clone();
    let class = resolver
        .resolve(
            &ClassDraft::new("Custom")
                .method(MethodDef::external(cudafy, "Custom_cudafy_impl").unwrap())
                .with_coprocessor(true),
            &root,
        )
        .unwrap()
        .descriptor;
    let artifacts = CoprocessorMirror::new(["Custom".to_string()]).generate(&class).unwrap();
    assert!(artifacts.to_device.is_none());
    assert!(artifacts.from_device.is_some());

    // The user's cudafy has a device counterpart to publish.
    let slots: Vec<_> = device_slots(&class).map(Method::name).collect();
    assert_eq!(slots, vec!["cudafy"]);
    assert!(artifacts.class_to_device.body.contains("Custom_cudafy_devp"));
}

fn emulator() -> Emulator {
    let (mechanism, compartment) = classes();
    let mirror = mirror();
    Emulator::new([
        mirror.plan(mechanism.object_struct()),
        mirror.plan(compartment.object_struct()),
    ])
}

fn mechanism(g: u64) -> Record {
    Record::new("Mechanism", vec![Value::Word(g)])
}

fn compartment(mech: Option<usize>) -> Record {
    Record::new(
        "Compartment",
        vec![
            Value::Word(1),
            Value::Word(7),
            Value::Word(0xdead),
            Value::Object(mech),
            Value::Embedded(mechanism(3)),
        ],
    )
}

#[test]
fn emulated_round_trip() {
    let mut emu = emulator();
    let mech = emu.alloc(mechanism(5));
    let comp = emu.alloc(compartment(Some(mech)));

    let device = emu.mirror_to_device(comp, false).unwrap();
    let device_mech = emu.device_handle_of(mech).unwrap();
    {
        let remote = emu.device(device).unwrap();
        assert!(remote.device_class);
        assert_eq!(remote.fields[3], Value::Object(Some(device_mech)));
        match &remote.fields[4] {
            Value::Embedded(inner) => assert!(inner.device_class),
            other => panic!("unexpected {other:?}"),
        }
    }

    // Device-side writes.
    {
        let remote = emu.device_mut(device).unwrap();
        remote.fields[0] = Value::Word(42);
        remote.fields[1] = Value::Word(99);
        remote.fields[2] = Value::Word(0xbeef);
        if let Value::Embedded(inner) = &mut remote.fields[4] {
            inner.fields[0] = Value::Word(8);
        }
    }
    emu.device_mut(device_mech).unwrap().fields[0] = Value::Word(6);

    emu.sync_from_device(comp, device).unwrap();
    let host = emu.host(comp).unwrap();
    assert_eq!(host.fields[0], Value::Word(42));
    // const field untouched, plain pointer untouched
    assert_eq!(host.fields[1], Value::Word(7));
    assert_eq!(host.fields[2], Value::Word(0xdead));
    assert_eq!(host.fields[3], Value::Object(Some(mech)));
    match &host.fields[4] {
        Value::Embedded(inner) => {
            assert_eq!(inner.fields[0], Value::Word(8));
            assert!(!inner.device_class);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(emu.host(mech).unwrap().fields[0], Value::Word(6));
}

#[test]
fn emulated_cache_and_clobber() {
    let mut emu = emulator();
    let comp = emu.alloc(compartment(None));
    let first = emu.mirror_to_device(comp, false).unwrap();

    emu.host_mut(comp).unwrap().fields[0] = Value::Word(10);
    let cached = emu.mirror_to_device(comp, false).unwrap();
    assert_eq!(first, cached);
    assert_eq!(emu.device(first).unwrap().fields[0], Value::Word(1));

    let refreshed = emu.mirror_to_device(comp, true).unwrap();
    assert_ne!(first, refreshed);
    assert_eq!(emu.device_handle_of(comp), Some(refreshed));
    assert_eq!(emu.device(refreshed).unwrap().fields[0], Value::Word(10));
    assert_eq!(emu.device(first).unwrap().fields[0], Value::Word(1));
}

#[test]
fn emulated_cycles_terminate() {
    let root = myriad_object().unwrap();
    let mut resolver = ClassHierarchyResolver::new();
    let node = resolver
        .resolve(
            &ClassDraft::new("Node")
                .field(field("value", TypeDescriptor::INT, false))
                .field(field("next", TypeDescriptor::Struct("Node".into()), true))
                .with_coprocessor(true),
            &root,
        )
        .unwrap()
        .descriptor;
    let plan = CoprocessorMirror::new(["Node".to_string()]).plan(node.object_struct());
    let mut emu = Emulator::new([plan]);

    let a = emu.alloc(Record::new("Node", vec![Value::Word(1), Value::Object(Some(1))]));
    let b = emu.alloc(Record::new("Node", vec![Value::Word(2), Value::Object(Some(a))]));
    let device_a = emu.mirror_to_device(a, true).unwrap();
    let device_b = emu.device_handle_of(b).unwrap();
    assert_eq!(emu.device(device_b).unwrap().fields[1], Value::Object(Some(device_a)));

    emu.device_mut(device_b).unwrap().fields[0] = Value::Word(20);
    emu.sync_from_device(a, device_a).unwrap();
    assert_eq!(emu.host(b).unwrap().fields[0], Value::Word(20));
}

#[test]
fn emulator_reports_bad_input() {
    let mut emu = emulator();
    assert_eq!(
        emu.mirror_to_device(9, false),
        Err(EmulatorError::DanglingReference { heap: "host", index: 9 })
    );
    let stray = emu.alloc(Record::new("Stranger", vec![]));
    assert_eq!(
        emu.mirror_to_device(stray, false),
        Err(EmulatorError::UnknownClass("Stranger".into()))
    );
    let short = emu.alloc(Record::new("Mechanism", vec![]));
    assert!(matches!(
        emu.mirror_to_device(short, false),
        Err(EmulatorError::ShapeMismatch { .. })
    ));
}

#[test]
fn array_fields_are_plain() {
    let root = myriad_object().unwrap();
    let mut resolver = ClassHierarchyResolver::new();
    let vm = TypeDescriptor::array(TypeDescriptor::DOUBLE, ArrayLen::Symbol("SIMUL_LEN".into())).unwrap();
    let class = resolver
        .resolve(&ClassDraft::new("Trace").field(field("vm", vm, false)).with_coprocessor(true), &root)
        .unwrap()
        .descriptor;
    let plan = CoprocessorMirror::new(["Trace".to_string()]).plan(class.object_struct());
    assert_eq!(plan.fields[0].kind, FieldKind::Plain { pointer: false });
}

/// Mechanism { double g; }, Holder { const int id; struct Mechanism* mech; }
/// and Outer { struct Holder inner; }.
fn embedding_classes() -> Vec<Arc<ClassDescriptor>> {
    let root = myriad_object().unwrap();
    let mut resolver = ClassHierarchyResolver::new();
    let drafts = [
        ClassDraft::new("Mechanism").field(field("g", TypeDescriptor::DOUBLE, false)),
        ClassDraft::new("Holder")
            .field(const_field("id", TypeDescriptor::INT))
            .field(field("mech", TypeDescriptor::Struct("Mechanism".into()), true)),
        ClassDraft::new("Outer").field(field("inner", TypeDescriptor::Struct("Holder".into()), false)),
    ];
    drafts
        .iter()
        .map(|d| resolver.resolve(&d.clone().with_coprocessor(true), &root).unwrap().descriptor)
        .collect()
}

fn embedding_mirror(classes: &[Arc<ClassDescriptor>]) -> CoprocessorMirror {
    let mut mirror = CoprocessorMirror::default();
    for class in classes {
        mirror.enable_class(class);
    }
    mirror
}

#[test]
fn embedded_objects_mirror_their_nested_objects() {
    let classes = embedding_classes();
    let artifacts = embedding_mirror(&classes).generate(&classes[2]).unwrap();

    let to_device = artifacts.to_device.unwrap().body;
    assert!(to_device.contains(
        "&((struct MyriadObject*) &((struct Outer*) self_copy)->inner)->m_class, &embedded_class->device_class"
    ));
    assert!(to_device.contains(
        "    if (((struct Holder*) &((struct Outer*) self)->inner)->mech != NULL)\n    {\n        void* device_inner_mech = myriad_cudafy((void*) ((struct Holder*) &((struct Outer*) self)->inner)->mech, 0);\n        memcpy((void*) &((struct Holder*) &((struct Outer*) self_copy)->inner)->mech, &device_inner_mech, sizeof(void*));\n"
    ));

    let from_device = artifacts.from_device.unwrap().body;
    assert!(from_device.contains(
        "myriad_decudafy((void*) ((struct Holder*) &((struct Outer*) self)->inner)->mech, (void*) ((struct Holder*) &((struct Outer*) from_device)->inner)->mech);"
    ));
    // The embedded holder's const id stays as the host has it.
    assert!(!from_device.contains("->id"));
}

#[test]
fn emulated_embedded_objects_match_generated_code() {
    let classes = embedding_classes();
    let mirror = embedding_mirror(&classes);
    let mut emu = Emulator::new(classes.iter().map(|c| mirror.plan(c.object_struct())));

    let mech = emu.alloc(Record::new("Mechanism", vec![Value::Word(5)]));
    let holder = Record::new("Holder", vec![Value::Word(1), Value::Object(Some(mech))]);
    let outer = emu.alloc(Record::new("Outer", vec![Value::Embedded(holder)]));

    let device = emu.mirror_to_device(outer, false).unwrap();
    let device_mech = emu.device_handle_of(mech).unwrap();
    match &emu.device(device).unwrap().fields[0] {
        Value::Embedded(inner) => {
            assert!(inner.device_class);
            assert_eq!(inner.fields[1], Value::Object(Some(device_mech)));
        }
        other => panic!("unexpected {other:?}"),
    }

    if let Value::Embedded(inner) = &mut emu.device_mut(device).unwrap().fields[0] {
        inner.fields[0] = Value::Word(2);
    }
    emu.device_mut(device_mech).unwrap().fields[0] = Value::Word(6);
    emu.sync_from_device(outer, device).unwrap();

    match &emu.host(outer).unwrap().fields[0] {
        Value::Embedded(inner) => {
            assert_eq!(inner.fields[0], Value::Word(1));
            assert_eq!(inner.fields[1], Value::Object(Some(mech)));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(emu.host(mech).unwrap().fields[0], Value::Word(6));
}

#[test]
fn embedded_layout_must_be_known() {
    let classes = embedding_classes();
    let mirror = CoprocessorMirror::new(["Mechanism", "Holder", "Outer"].map(String::from));
    assert!(matches!(
        mirror.generate(&classes[2]),
        Err(crate::CodegenError::Type(TypeError::InvalidType { .. }))
    ));
}

#[test]
fn self_embedding_rejected() {
    let root = myriad_object().unwrap();
    let mut resolver = ClassHierarchyResolver::new();
    let knot = resolver
        .resolve(
            &ClassDraft::new("Knot")
                .field(field("inner", TypeDescriptor::Struct("Knot".into()), false))
                .with_coprocessor(true),
            &root,
        )
        .unwrap()
        .descriptor;
    let mut mirror = CoprocessorMirror::default();
    mirror.enable_class(&knot);
    match mirror.generate(&knot) {
        Err(crate::CodegenError::Type(TypeError::InvalidType { message })) => {
            assert!(message.contains("Knot -> Knot"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
}
