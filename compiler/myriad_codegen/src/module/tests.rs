#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::class::MethodDef;
use myriad_types::CType;
use pretty_assertions::assert_eq;

fn self_param() -> Scalar {
    Scalar::plain("_self", TypeDescriptor::VOID, true).unwrap()
}

fn step() -> FunctionSignature {
    FunctionSignature::new(
        "step",
        vec![
            self_param(),
            Scalar::plain("dt", TypeDescriptor::DOUBLE, false).unwrap(),
        ],
        Scalar::void_return(),
        FunctionKind::Method,
    )
    .unwrap()
}

fn compartment() -> ClassDraft {
    ClassDraft::new("Compartment")
        .field(Scalar::plain("vm", TypeDescriptor::DOUBLE, false).unwrap())
        .method(MethodDef::external(step(), "Compartment_step_impl").unwrap())
}

fn global(name: &str) -> Scalar {
    Scalar::plain(name, TypeDescriptor::INT, false).unwrap()
}

fn function(name: &str) -> ModuleFunction {
    ModuleFunction::declared(
        FunctionSignature::new(
            name,
            vec![],
            Scalar::returning(TypeDescriptor::INT, false, Qualifiers::empty()),
            FunctionKind::Module,
        )
        .unwrap(),
    )
}

#[test]
fn config_defaults_and_coprocessor_includes() {
    let config = ModuleConfig::new("Compartment");
    assert_eq!(config.header_guard("H"), "COMPARTMENT_H");
    assert!(config.lib_includes.contains("stdarg.h"));
    assert!(!config.lib_includes.contains("cuda_runtime.h"));

    let config = config.with_coprocessor(true).include_local("Mechanism.h").include_local("Mechanism.h");
    assert!(config.coprocessor);
    assert!(config.lib_includes.contains("cuda_runtime.h"));
    assert!(config.lib_includes.contains("cuda_runtime_api.h"));
    assert_eq!(config.local_includes, vec!["Mechanism.h".to_string()]);
}

#[test]
fn policy_from_flags() {
    assert_eq!(ConflictPolicy::from_flags(false, false), Ok(ConflictPolicy::Override));
    assert_eq!(ConflictPolicy::from_flags(false, true), Ok(ConflictPolicy::Override));
    assert_eq!(ConflictPolicy::from_flags(true, false), Ok(ConflictPolicy::Strict));
    assert_eq!(ConflictPolicy::from_flags(true, true), Err(CodegenError::ConflictingPolicy));
}

#[test]
fn runtime_module_shape() {
    let module = Module::runtime().unwrap();
    assert_eq!(module.name(), "MyriadObject");
    assert_eq!(module.kind(), ModuleKind::Runtime);
    assert!(module.classes().is_empty());
    let globals: Vec<_> = module.globals().iter().map(Scalar::stringify_decl).collect();
    assert_eq!(
        globals,
        vec!["const void* MyriadObject", "const void* MyriadClass"]
    );
    let typedefs: Vec<_> = module.typedefs().iter().map(|t| t.name.clone()).collect();
    assert_eq!(typedefs, vec!["ctor_t", "dtor_t", "cudafy_t", "de_cudafy_t"]);
    assert!(module.local_includes().is_empty());
    assert!(!module.has_device_code());
}

#[test]
fn build_simple_module() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Compartment"));
    builder.define_class(compartment());
    builder.register_global(global("counter"), ConflictPolicy::Strict).unwrap();
    let module = builder.build().unwrap();

    assert_eq!(module.kind(), ModuleKind::User);
    assert_eq!(module.local_includes(), vec![RUNTIME_HEADER.to_string()]);
    let class = module.class("Compartment").unwrap();
    assert_eq!(class.delegators.len(), 1);
    assert_eq!(class.super_delegators.len(), 1);
    assert_eq!(class.init.name(), "initCompartment");
    assert!(class.class_ctor.is_some());
    assert!(class.mirror.is_none());

    let globals: Vec<_> = module.globals().iter().map(|g| g.ident().to_string()).collect();
    assert_eq!(globals, vec!["Compartment", "CompartmentClass", "counter"]);

    match &class.implementations[..] {
        [ImplementationArtifact::Extern(sig)] => {
            assert_eq!(sig.stringify_decl(), "void Compartment_step_impl(void* _self, double dt)");
        }
        other => panic!("unexpected implementations: {other:?}"),
    }
}

#[test]
fn verbatim_method_becomes_static_definition() {
    let draft = ClassDraft::new("Counter")
        .method(MethodDef::verbatim(step(), "\n        int x = 0;\n        (void) x;\n").unwrap());
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Counter"));
    builder.define_class(draft);
    let module = builder.build().unwrap();
    let class = module.class("Counter").unwrap();
    match &class.implementations[..] {
        [ImplementationArtifact::Definition(def)] => {
            assert_eq!(
                def.stringify_def(),
                "static void Counter_step(void* _self, double dt)\n{\n    int x = 0;\n    (void) x;\n}"
            );
        }
        other => panic!("unexpected implementations: {other:?}"),
    }
}

#[test]
fn classes_ordered_parent_first() {
    let soma = ClassDraft::new("Soma").extends("Compartment");
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Cells"));
    builder.define_class(soma).define_class(compartment());
    let module = builder.build().unwrap();
    let names: Vec<_> = module.classes().iter().map(ClassArtifacts::name).collect();
    assert_eq!(names, vec!["Compartment", "Soma"]);

    let soma = module.class("Soma").unwrap();
    assert!(soma.delegators.is_empty());
    assert!(soma.class_ctor.is_none());
    assert!(soma.init.body.starts_with("    initCompartment(init_cuda);\n"));
}

#[test]
fn imported_superclass_resolves() {
    let mut base = ModuleBuilder::new(ModuleConfig::new("Compartment"));
    base.define_class(compartment());
    let base = base.build().unwrap();
    let compartment = Arc::clone(&base.class("Compartment").unwrap().descriptor);

    let mut builder = ModuleBuilder::new(ModuleConfig::new("Soma").include_local("Compartment.h"));
    builder
        .import_class(compartment)
        .define_class(ClassDraft::new("Soma").extends("Compartment"));
    let module = builder.build().unwrap();
    assert_eq!(module.classes().len(), 1);
    assert_eq!(
        module.local_includes(),
        vec![RUNTIME_HEADER.to_string(), "Compartment.h".to_string()]
    );
    let soma = &module.class("Soma").unwrap().descriptor;
    assert!(soma.extends("Compartment"));
    assert!(soma.method("step").is_some());
}

#[test]
fn coprocessor_class_requires_coprocessor_module() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Compartment"));
    builder.define_class(compartment().with_coprocessor(true));
    assert_eq!(
        builder.build().unwrap_err(),
        CodegenError::CoprocessorDisabled {
            class: "Compartment".into(),
            module: "Compartment".into(),
        }
    );
}

#[test]
fn coprocessor_module_generates_mirror() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Compartment").with_coprocessor(true));
    builder.define_class(compartment().with_coprocessor(true));
    let module = builder.build().unwrap();
    assert!(module.has_device_code());
    let class = module.class("Compartment").unwrap();
    let mirror = class.mirror.as_ref().unwrap();
    assert!(mirror.to_device.is_some());
    assert!(mirror.from_device.is_some());
    assert_eq!(mirror.class_to_device.name(), "CompartmentClass_cudafy");
    assert!(class.init.body.contains("myriad_cudafy, CompartmentClass_cudafy,"));
    assert!(class.init.body.contains("&CompartmentClass_dev_t"));
    assert!(class.init.body.contains("&Compartment_dev_t"));
}

#[test]
fn coprocessor_module_without_coprocessor_classes_has_no_device_code() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Compartment").with_coprocessor(true));
    builder.define_class(compartment());
    let module = builder.build().unwrap();
    assert!(!module.has_device_code());
}

#[test]
fn strict_policy_rejects_duplicates() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("M"));
    builder.register_global(global("x"), ConflictPolicy::Strict).unwrap();
    let err = builder
        .register_global(global("x"), ConflictPolicy::Strict)
        .unwrap_err();
    assert_eq!(
        err,
        CodegenError::DuplicateDeclaration {
            module: "M".into(),
            name: "x".into(),
        }
    );
}

#[test]
fn override_policy_replaces_in_place() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("M"));
    builder.register_global(global("x"), ConflictPolicy::Override).unwrap();
    builder.register_global(global("y"), ConflictPolicy::Override).unwrap();
    let replacement = Scalar::plain("x", TypeDescriptor::Primitive(CType::Float), false).unwrap();
    builder.register_global(replacement, ConflictPolicy::Override).unwrap();
    let module = builder.build().unwrap();
    let globals: Vec<_> = module.globals().iter().map(Scalar::stringify_decl).collect();
    assert_eq!(globals, vec!["float x", "int y"]);
}

#[test]
fn global_and_function_share_a_namespace() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("M"));
    builder.register_global(global("tick"), ConflictPolicy::Override).unwrap();
    assert!(matches!(
        builder.register_function(function("tick"), ConflictPolicy::Override),
        Err(CodegenError::DuplicateDeclaration { .. })
    ));
}

#[test]
fn user_names_cannot_shadow_generated_names() {
    for name in ["Compartment", "CompartmentClass", "step", "super_step", "initCompartment"] {
        let mut builder = ModuleBuilder::new(ModuleConfig::new("M"));
        builder.define_class(compartment());
        builder.register_function(function(name), ConflictPolicy::Override).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            CodegenError::DuplicateDeclaration {
                module: "M".into(),
                name: name.into(),
            },
            "{name}"
        );
    }
}

#[test]
fn unrelated_classes_cannot_share_a_delegator() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Integrators"));
    builder
        .define_class(ClassDraft::new("Alpha").method(MethodDef::external(step(), "Alpha_step_impl").unwrap()))
        .define_class(ClassDraft::new("Beta").method(MethodDef::external(step(), "Beta_step_impl").unwrap()));
    assert_eq!(
        builder.build().unwrap_err(),
        CodegenError::DelegatorClash {
            name: "step".into(),
            first: "Alpha".into(),
            second: "Beta".into(),
        }
    );
}

#[test]
fn overriding_siblings_share_the_inherited_delegator() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Integrators"));
    builder
        .define_class(compartment())
        .define_class(
            ClassDraft::new("Alpha")
                .extends("Compartment")
                .method(MethodDef::external(step(), "Alpha_step_impl").unwrap()),
        )
        .define_class(
            ClassDraft::new("Beta")
                .extends("Compartment")
                .method(MethodDef::external(step(), "Beta_step_impl").unwrap()),
        );
    let module = builder.build().unwrap();
    let delegators: Vec<_> = module
        .classes()
        .iter()
        .flat_map(|c| c.delegators.iter().map(|d| d.name().to_string()))
        .collect();
    assert_eq!(delegators, vec!["step"]);
}

#[test]
fn imported_delegators_are_taken() {
    let mut base = ModuleBuilder::new(ModuleConfig::new("Compartment"));
    base.define_class(compartment());
    let base = base.build().unwrap();
    let compartment = Arc::clone(&base.class("Compartment").unwrap().descriptor);

    let mut builder = ModuleBuilder::new(ModuleConfig::new("Channel"));
    builder
        .import_class(Arc::clone(&compartment))
        .define_class(
            ClassDraft::new("Channel")
                .with_abstract(true)
                .method(MethodDef::declared(step()).unwrap()),
        );
    assert_eq!(
        builder.build().unwrap_err(),
        CodegenError::DelegatorClash {
            name: "step".into(),
            first: "Compartment".into(),
            second: "Channel".into(),
        }
    );

    let mut builder = ModuleBuilder::new(ModuleConfig::new("Soma"));
    builder.import_class(compartment);
    builder.register_function(function("super_step"), ConflictPolicy::Override).unwrap();
    assert!(matches!(
        builder.build(),
        Err(CodegenError::DuplicateDeclaration { ref name, .. }) if name == "super_step"
    ));
}

#[test]
fn mirror_recurses_through_embedded_objects() {
    let mechanism = ClassDraft::new("Mechanism")
        .field(Scalar::plain("g", TypeDescriptor::DOUBLE, false).unwrap())
        .with_coprocessor(true);
    let holder = ClassDraft::new("Holder")
        .field(Scalar::plain("mech", TypeDescriptor::Struct("Mechanism".into()), true).unwrap())
        .with_coprocessor(true);
    // Declared before the class it embeds.
    let outer = ClassDraft::new("Outer")
        .field(Scalar::plain("inner", TypeDescriptor::Struct("Holder".into()), false).unwrap())
        .with_coprocessor(true);
    let mut builder = ModuleBuilder::new(ModuleConfig::new("Cells").with_coprocessor(true));
    builder.define_class(outer).define_class(holder).define_class(mechanism);
    let module = builder.build().unwrap();

    let mirror = module.class("Outer").unwrap().mirror.as_ref().unwrap();
    let to_device = &mirror.to_device.as_ref().unwrap().body;
    assert!(to_device.contains(
        "myriad_cudafy((void*) ((struct Holder*) &((struct Outer*) self)->inner)->mech, 0);"
    ));
    let from_device = &mirror.from_device.as_ref().unwrap().body;
    assert!(from_device.contains("myriad_decudafy((void*) ((struct Holder*) &((struct Outer*) self)->inner)->mech,"));
}

#[test]
fn static_module_function_rejected() {
    let sig = function("helper")
        .signature
        .with_qualifiers(Qualifiers::STATIC)
        .unwrap();
    let mut builder = ModuleBuilder::new(ModuleConfig::new("M"));
    assert!(matches!(
        builder.register_function(ModuleFunction::declared(sig), ConflictPolicy::Strict),
        Err(CodegenError::Type(_))
    ));
}

#[test]
fn void_global_rejected() {
    let mut builder = ModuleBuilder::new(ModuleConfig::new("M"));
    let bad = Scalar::plain("nothing", TypeDescriptor::VOID, false).unwrap();
    assert!(matches!(
        builder.register_global(bad, ConflictPolicy::Strict),
        Err(CodegenError::Type(_))
    ));
}

#[test]
fn module_name_must_be_identifier() {
    let builder = ModuleBuilder::new(ModuleConfig::new("not a name"));
    assert!(matches!(builder.build(), Err(CodegenError::Type(_))));
}

#[test]
fn defined_function_body_reindented() {
    let f = ModuleFunction::defined(function("answer").signature, "  return 42;\n");
    assert_eq!(
        f.definition().unwrap().stringify_def(),
        "int answer(void)\n{\n    return 42;\n}"
    );
    assert!(function("answer").definition().is_none());
}
