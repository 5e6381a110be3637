//! Fixed text shared with the object runtime.
//!
//! The runtime implements object allocation, class lookup, the root
//! delegators and the device handle side table. Every generated header
//! carries the same declarations so each module compiles on its own.

use crate::context::CodegenContext;

/// Generic function pointer used for `(selector, implementation)` pairs.
pub const VOIDF_TYPEDEF: &str = "typedef void (*voidf)();";

/// Runtime entry points, in declaration order.
const RUNTIME_DECLARATIONS: &[&str] = &[
    "extern int initCUDAObjects();",
    "extern void* myriad_new(const void* _class, ...);",
    "extern const void* myriad_class_of(const void* _self);",
    "extern size_t myriad_size_of(const void* self);",
    "extern int myriad_is_a(const void* _self, const struct MyriadClass* m_class);",
    "extern int myriad_is_of(const void* _self, const struct MyriadClass* m_class);",
    "extern void* myriad_device_handle_of(const void* _self);",
    "extern void myriad_cache_device_handle(const void* _self, void* device_self);",
];

/// Root delegators and super-delegators.
const ROOT_DELEGATORS: &[&str] = &[
    "extern void* myriad_ctor(void* _self, va_list* app);",
    "extern int myriad_dtor(void* _self);",
    "extern void* myriad_cudafy(void* _self, int clobber);",
    "extern void myriad_decudafy(void* _self, void* cuda_self);",
    "extern const void* myriad_super(const void* _self);",
    "extern void* super_ctor(const void* _class, void* _self, va_list* app);",
    "extern int super_dtor(const void* _class, void* _self);",
    "extern void* super_cudafy(const void* _class, void* _self, int clobber);",
    "extern void super_decudafy(const void* _class, void* _self, void* cuda_self);",
];

/// Emit the runtime declarations every header repeats.
pub fn emit_runtime_declarations(ctx: &mut CodegenContext) {
    for decl in RUNTIME_DECLARATIONS {
        ctx.writeln(decl);
        ctx.newline();
    }
    ctx.writeln("// Delegators");
    ctx.newline();
    for decl in ROOT_DELEGATORS {
        ctx.writeln(decl);
        ctx.newline();
    }
}

/// Fallback for the CUDA error check used by generated mirror code.
pub fn emit_cuda_check(ctx: &mut CodegenContext) {
    ctx.directive("#ifdef CUDA");
    ctx.directive("#ifndef CUDA_CHECK_RETURN");
    ctx.directive("#define CUDA_CHECK_RETURN(value) assert((value) == cudaSuccess)");
    ctx.directive("#endif");
    ctx.directive("#endif");
}
