//! Class construction code: the class constructor that installs the slots a
//! class introduces, and the `init<Object>` routine that creates the class
//! objects at startup.

use myriad_types::{FunctionKind, FunctionSignature, Qualifiers, Scalar, TypeDescriptor, TypeError};

use crate::artifact::FunctionDef;
use crate::class::{ClassDescriptor, Method};
use crate::context::CodegenContext;
use crate::naming::{self, ROOT_CLASS};
use crate::CodegenResult;

/// `static void* <Object>Class_ctor(void* _self, va_list* app)`, present
/// only when the class introduces methods.
///
/// It chains to the metaclass's superclass constructor, then walks the
/// `(selector, implementation)` pairs and stores each one whose selector is
/// a delegator of an introduced method.
pub(crate) fn class_ctor(class: &ClassDescriptor) -> CodegenResult<Option<FunctionDef>> {
    let introduced: Vec<&Method> = class.introduced_methods().collect();
    if introduced.is_empty() {
        return Ok(None);
    }
    let ctor = class
        .superclass()
        .and_then(|s| s.method("ctor"))
        .ok_or_else(|| TypeError::invalid(format!("`{}` has no ctor slot", class.name())))?;
    let signature = ctor
        .signature()
        .renamed(naming::class_ctor_name(class.name()), FunctionKind::Method)?
        .with_qualifiers(Qualifiers::STATIC)?;

    let class_struct = class.class_name();
    let mut ctx = CodegenContext::with_indent(1);
    ctx.writeln(&format!(
        "struct {class_struct}* _class = (struct {class_struct}*) super_ctor({class_struct}, _self, app);"
    ));
    ctx.writeln("voidf selector = NULL;");
    ctx.writeln("va_list ap;");
    ctx.writeln("va_copy(ap, *app);");
    ctx.newline();
    ctx.writeln("while ((selector = va_arg(ap, voidf)) != NULL)");
    ctx.open_block();
    ctx.writeln("voidf method = va_arg(ap, voidf);");
    for method in introduced {
        ctx.newline();
        ctx.writeln(&format!("if (selector == (voidf) {})", method.delegator().ident()));
        ctx.open_block();
        ctx.writeln(&format!("*(voidf*) &_class->{} = method;", method.slot()));
        ctx.close_block("}");
    }
    ctx.close_block("}");
    ctx.newline();
    ctx.writeln("va_end(ap);");
    ctx.writeln("return _class;");

    Ok(Some(FunctionDef::new(signature, ctx.take_output())))
}

/// `void init<Object>(int init_cuda)`.
///
/// Creates the class object and its metaclass once, registering every
/// implementation this class provides. Coprocessor classes also publish
/// both objects to their device constants.
pub(crate) fn init_function(class: &ClassDescriptor, has_class_ctor: bool) -> CodegenResult<FunctionDef> {
    let object = class.name();
    let class_var = class.class_name();
    let superclass = class.superclass().map_or(naming::ROOT_OBJECT, |s| s.name());
    let super_class_var = naming::class_struct_name(superclass);

    let signature = FunctionSignature::new(
        naming::init_name(object),
        vec![Scalar::plain("init_cuda", TypeDescriptor::INT, false)?],
        Scalar::void_return(),
        FunctionKind::Module,
    )?;

    let mut ctx = CodegenContext::with_indent(1);
    if superclass != naming::ROOT_OBJECT {
        ctx.writeln(&format!("{}(init_cuda);", naming::init_name(superclass)));
        ctx.newline();
    }

    // Metaclass.
    let mut meta_pairs = Vec::new();
    if has_class_ctor {
        meta_pairs.push(("myriad_ctor".to_string(), naming::class_ctor_name(object)));
    }
    if class.coprocessor_enabled() {
        meta_pairs.push(("myriad_cudafy".to_string(), naming::class_cudafy_name(object)));
    }
    write_creation(
        &mut ctx,
        class_var,
        [super_class_var.as_str(), super_class_var.as_str()],
        class_var,
        &meta_pairs,
        class.coprocessor_enabled().then(|| naming::device_handle_name(class_var)),
    );
    ctx.newline();

    // Class object.
    let pairs: Vec<(String, String)> = class
        .implemented_methods()
        .filter_map(|m| {
            m.implementation()
                .map(|i| (m.delegator().ident().to_string(), i.symbol().to_string()))
        })
        .collect();
    write_creation(
        &mut ctx,
        object,
        [class_var, superclass],
        object,
        &pairs,
        class.coprocessor_enabled().then(|| naming::device_handle_name(object)),
    );

    Ok(FunctionDef::new(signature, ctx.take_output()))
}

/// `if (!var) { var = myriad_new(args..., sizeof(struct layout), pairs..., 0); }`
fn write_creation(
    ctx: &mut CodegenContext,
    var: &str,
    [metaclass, superclass]: [&str; 2],
    layout: &str,
    pairs: &[(String, String)],
    device_handle: Option<String>,
) {
    ctx.writeln(&format!("if (!{var})"));
    ctx.open_block();
    ctx.writeln(&format!("{var} ="));
    ctx.indent();
    ctx.writeln("myriad_new(");
    ctx.indent();
    ctx.writeln(&format!("{metaclass},"));
    ctx.writeln(&format!("{superclass},"));
    ctx.writeln(&format!("sizeof(struct {layout}),"));
    for (selector, implementation) in pairs {
        ctx.writeln(&format!("{selector}, {implementation},"));
    }
    ctx.writeln("0");
    ctx.dedent();
    ctx.writeln(");");
    ctx.dedent();

    if let Some(handle) = device_handle {
        ctx.newline();
        ctx.directive("#ifdef CUDA");
        ctx.writeln("if (init_cuda)");
        ctx.open_block();
        ctx.writeln(&format!("void* device_class = myriad_cudafy((void*) {var}, 1);"));
        ctx.writeln(&format!(
            "((struct {ROOT_CLASS}*) {var})->device_class = (struct {ROOT_CLASS}*) device_class;"
        ));
        ctx.writeln("CUDA_CHECK_RETURN(");
        ctx.indent();
        ctx.writeln(&format!(
            "cudaMemcpyToSymbol((const void*) &{handle}, &device_class, sizeof(void*), 0, cudaMemcpyHostToDevice)"
        ));
        ctx.dedent();
        ctx.writeln(");");
        ctx.close_block("}");
        ctx.directive("#endif");
    }
    ctx.close_block("}");
}
