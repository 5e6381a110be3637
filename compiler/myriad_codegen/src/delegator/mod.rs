//! Delegator and super-delegator generation.
//!
//! For every method a class introduces, three pieces of C are derived from
//! its instance signature:
//!
//! - a function-pointer typedef naming the slot type
//! - a *delegator*, the public entry point, which looks up the receiver's
//!   class and calls through the slot
//! - a *super-delegator*, which takes an explicit class and calls the slot
//!   of that class's superclass
//!
//! ```text
//! int add_mech(void* _self, void* mechanism)
//! {
//!     const struct CompartmentClass* m_class = (const struct CompartmentClass*) myriad_class_of(_self);
//!     assert(m_class->my_add_mech);
//!     return m_class->my_add_mech(_self, mechanism);
//! }
//! ```
//!
//! Results are memoized per (owner, method): asking twice returns the same
//! `Arc`, and asking with a structurally different signature fails.

use std::sync::Arc;

use myriad_types::{FunctionKind, FunctionSignature, Qualifiers, Scalar, TypeDescriptor, TypeError};
use rustc_hash::FxHashMap;

use crate::artifact::{FunctionDef, Typedef};
use crate::context::CodegenContext;
use crate::naming::{self, RESERVED_LOCALS};

type MemoKey = (String, String);

/// Generates and memoizes slot typedefs, delegators and super-delegators.
#[derive(Debug, Default)]
pub struct DelegatorGenerator {
    typedefs: FxHashMap<MemoKey, Arc<Typedef>>,
    delegators: FxHashMap<MemoKey, Arc<FunctionDef>>,
    super_delegators: FxHashMap<MemoKey, Arc<FunctionDef>>,
}

impl DelegatorGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot typedef for `method` as introduced by `owner`.
    pub fn typedef_for(
        &mut self,
        method: &FunctionSignature,
        owner: &str,
    ) -> Result<Arc<Typedef>, TypeError> {
        check_method(method, owner)?;
        let key = (owner.to_string(), method.ident().to_string());
        if let Some(existing) = self.typedefs.get(&key) {
            check_same(&existing.signature, method, owner)?;
            return Ok(Arc::clone(existing));
        }
        let typedef = Arc::new(Typedef {
            name: naming::typedef_name(owner, method.ident()),
            signature: method.clone(),
        });
        self.typedefs.insert(key, Arc::clone(&typedef));
        Ok(typedef)
    }

    /// The public delegator for `method` as introduced by `owner`.
    #[tracing::instrument(level = "trace", skip_all, fields(owner = %owner, method = %method.ident()))]
    pub fn delegator_for(
        &mut self,
        method: &FunctionSignature,
        owner: &str,
    ) -> Result<Arc<FunctionDef>, TypeError> {
        check_method(method, owner)?;
        let key = (owner.to_string(), method.ident().to_string());
        if let Some(existing) = self.delegators.get(&key) {
            check_same(&existing.signature, method, owner)?;
            return Ok(Arc::clone(existing));
        }

        let signature = method.renamed(
            naming::delegator_name(owner, method.ident()),
            FunctionKind::Delegator,
        )?;
        let class_struct = naming::class_struct_name(owner);
        let slot = naming::slot_name(method.ident());
        let self_name = method
            .self_param()
            .map(Scalar::ident)
            .ok_or_else(|| TypeError::invalid(format!("`{}` has no self parameter", method.ident())))?;
        let call = method.stringify_call(&format!("m_class->{slot}"));

        let mut ctx = CodegenContext::with_indent(1);
        ctx.writeln(&format!(
            "const struct {class_struct}* m_class = (const struct {class_struct}*) myriad_class_of({self_name});"
        ));
        ctx.writeln(&format!("assert(m_class->{slot});"));
        write_return(&mut ctx, method, &call);

        let def = Arc::new(FunctionDef::new(signature, ctx.take_output()));
        self.delegators.insert(key, Arc::clone(&def));
        Ok(def)
    }

    /// The super-delegator for `method` as introduced by `owner`.
    ///
    /// It takes the class to start from as a leading `const void* _class`
    /// and calls the slot of that class's superclass.
    #[tracing::instrument(level = "trace", skip_all, fields(owner = %owner, method = %method.ident()))]
    pub fn super_delegator_for(
        &mut self,
        method: &FunctionSignature,
        owner: &str,
    ) -> Result<Arc<FunctionDef>, TypeError> {
        check_method(method, owner)?;
        let key = (owner.to_string(), method.ident().to_string());
        if let Some(existing) = self.super_delegators.get(&key) {
            check_same(&existing.signature, &super_signature(method)?, owner)?;
            return Ok(Arc::clone(existing));
        }

        let signature = super_signature(method)?;
        let class_struct = naming::class_struct_name(owner);
        let slot = naming::slot_name(method.ident());
        let call = method.stringify_call(&format!("superclass->{slot}"));

        let mut ctx = CodegenContext::with_indent(1);
        ctx.writeln(&format!(
            "const struct {class_struct}* superclass = (const struct {class_struct}*) myriad_super({});",
            naming::CLASS_PARAM
        ));
        write_return(&mut ctx, method, &call);

        let def = Arc::new(FunctionDef::new(signature, ctx.take_output()));
        self.super_delegators.insert(key, Arc::clone(&def));
        Ok(def)
    }

    /// Number of distinct delegators generated so far.
    pub fn delegator_count(&self) -> usize {
        self.delegators.len()
    }
}

/// The super-delegator signature: `super_<m>(const void* _class, ...)`.
fn super_signature(method: &FunctionSignature) -> Result<FunctionSignature, TypeError> {
    let class_param = Scalar::new(naming::CLASS_PARAM, TypeDescriptor::VOID, true, Qualifiers::CONST)?;
    method
        .with_leading_param(class_param)?
        .renamed(naming::super_delegator_name(method.ident()), FunctionKind::SuperDelegator)
}

fn write_return(ctx: &mut CodegenContext, method: &FunctionSignature, call: &str) {
    if method.returns_void() {
        ctx.writeln(&format!("{call};"));
        ctx.writeln("return;");
    } else {
        ctx.writeln(&format!("return {call};"));
    }
}

fn check_method(method: &FunctionSignature, owner: &str) -> Result<(), TypeError> {
    if method.self_param().is_none() {
        return Err(TypeError::invalid(format!(
            "`{owner}::{}` must take a self pointer first",
            method.ident()
        )));
    }
    if let Some(param) = method
        .params()
        .iter()
        .find(|p| RESERVED_LOCALS.contains(&p.ident()))
    {
        return Err(TypeError::invalid(format!(
            "`{owner}::{}`: parameter `{}` collides with a generated name",
            method.ident(),
            param.ident()
        )));
    }
    Ok(())
}

fn check_same(
    existing: &FunctionSignature,
    requested: &FunctionSignature,
    owner: &str,
) -> Result<(), TypeError> {
    if existing.is_structurally_equal(requested) {
        Ok(())
    } else {
        Err(TypeError::invalid(format!(
            "`{owner}::{}` was already generated with a different signature",
            requested.ident()
        )))
    }
}

#[cfg(test)]
mod tests;
