//! C code generation for the Myriad object system.
//!
//! Class descriptors go in; C headers and sources implementing a
//! struct-plus-vtable object model come out.
//!
//! # Architecture
//!
//! ```text
//! ClassDraft*  (+ imported ClassDescriptors)
//!        ↓
//!   ClassHierarchyResolver   (order, inherit, override, layout)
//!        ↓        ↘
//!        ↓    DelegatorGenerator   (typedefs, delegators, super-delegators)
//!        ↓        ↘
//!        ↓    CoprocessorMirror    (host/device copy routines)
//!        ↓
//!     Module       (ModuleBuilder::build)
//!        ↓
//!   Renderer       (<Name>.h, <Name>.c, <Name>.cuh)
//! ```
//!
//! Every class descends from the built-in root `MyriadObject`, whose class
//! object `MyriadClass` carries the `ctor`, `dtor`, `cudafy` and
//! `decudafy` slots.

mod artifact;
pub mod c;
pub mod class;
mod context;
pub mod delegator;
mod error;
pub mod hierarchy;
pub mod mirror;
pub mod module;
pub mod naming;

pub use artifact::{indent_body, FunctionDef, Typedef};
pub use class::{
    myriad_object, ClassDescriptor, ClassDraft, ImplSource, Implementation, Method, MethodDef,
    MethodKind,
};
pub use context::CodegenContext;
pub use delegator::DelegatorGenerator;
pub use error::{CodegenError, CodegenResult};
pub use hierarchy::{ClassHierarchyResolver, ResolvedClass};
pub use mirror::{CoprocessorMirror, MirrorArtifacts, MirrorPlan};
pub use module::{
    ClassArtifacts, ConflictPolicy, ImplementationArtifact, Module, ModuleBuilder, ModuleConfig,
    ModuleFunction, ModuleKind,
};
