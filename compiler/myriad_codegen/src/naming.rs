//! Generated symbol names.
//!
//! Every identifier the generator derives from a class or method name is
//! spelled here, so the header, source and device renderers agree.

/// Object struct of the built-in root class.
pub const ROOT_OBJECT: &str = "MyriadObject";

/// Class struct (metaclass) of the built-in root class.
pub const ROOT_CLASS: &str = "MyriadClass";

/// Parameter name reserved for the explicit class of super-delegators.
pub const CLASS_PARAM: &str = "_class";

/// Local variable names used inside generated bodies.
pub(crate) const RESERVED_LOCALS: [&str; 3] = [CLASS_PARAM, "m_class", "superclass"];

/// `Compartment` -> `CompartmentClass`.
pub fn class_struct_name(object: &str) -> String {
    if object == ROOT_OBJECT {
        ROOT_CLASS.to_string()
    } else {
        format!("{object}Class")
    }
}

/// Vtable slot of a method: `my_<method>`.
pub fn slot_name(method: &str) -> String {
    format!("my_{method}")
}

/// Function-pointer typedef for a slot, named after the introducing class.
///
/// The root class keeps its historical names (`ctor_t`, `de_cudafy_t`).
pub fn typedef_name(introducer: &str, method: &str) -> String {
    if introducer == ROOT_OBJECT {
        match method {
            "decudafy" => "de_cudafy_t".to_string(),
            other => format!("{other}_t"),
        }
    } else {
        format!("{introducer}_{method}_t")
    }
}

/// Public dynamic-dispatch entry point.
pub fn delegator_name(introducer: &str, method: &str) -> String {
    if introducer == ROOT_OBJECT {
        format!("myriad_{method}")
    } else {
        method.to_string()
    }
}

/// Explicit-superclass entry point.
pub fn super_delegator_name(method: &str) -> String {
    format!("super_{method}")
}

/// Generated instance implementation: `<Object>_<method>`.
pub fn implementation_name(object: &str, method: &str) -> String {
    format!("{object}_{method}")
}

/// Device-side function pointer symbol for an implementation.
pub fn device_pointer_name(object: &str, method: &str) -> String {
    format!("{object}_{method}_devp")
}

/// Device constant holding the published class object.
pub fn device_handle_name(object: &str) -> String {
    format!("{object}_dev_t")
}

/// Class constructor that installs the slots a class introduces.
pub fn class_ctor_name(object: &str) -> String {
    format!("{}_ctor", class_struct_name(object))
}

/// Builds the device mirror of a class object.
pub fn class_cudafy_name(object: &str) -> String {
    format!("{}_cudafy", class_struct_name(object))
}

/// Module initializer: `init<Object>`.
pub fn init_name(object: &str) -> String {
    format!("init{object}")
}
