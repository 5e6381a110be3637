//! In-memory model of the host/device mirror.
//!
//! Objects live on two heaps, host and device, as [`Record`]s whose field
//! values follow the order of their class's [`MirrorPlan`]. The two
//! operations behave like the generated C routines:
//!
//! - [`Emulator::mirror_to_device`] copies an object to the device heap,
//!   reusing the cached device record unless `clobber` is set, in which
//!   case a new record replaces it in the cache. Nested
//!   objects are mirrored through their own cache without clobbering, so
//!   cyclic object graphs terminate.
//! - [`Emulator::sync_from_device`] copies mutable state back to the host.
//!   Plain pointers and `const` fields are left alone.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::{FieldKind, MirrorPlan};

/// Index of a record on the host heap.
pub type HostRef = usize;

/// Index of a record on the device heap.
pub type DeviceRef = usize;

/// A field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Any scalar, stored as its bit pattern (raw pointers included).
    Word(u64),
    /// Inline array of scalars.
    Array(Vec<u64>),
    /// Pointer to another object on the same heap.
    Object(Option<usize>),
    /// By-value embedded object.
    Embedded(Record),
}

/// One object: its class name, whether its class pointer refers to the
/// device class, and its field values in plan order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub class: String,
    pub device_class: bool,
    pub fields: Vec<Value>,
}

impl Record {
    pub fn new(class: impl Into<String>, fields: Vec<Value>) -> Self {
        Record {
            class: class.into(),
            device_class: false,
            fields,
        }
    }
}

/// Emulator failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EmulatorError {
    #[error("no mirror plan for class `{0}`")]
    UnknownClass(String),

    #[error("reference to missing {heap} object #{index}")]
    DanglingReference { heap: &'static str, index: usize },

    #[error("object of class `{class}` does not match its plan at field `{field}`")]
    ShapeMismatch { class: String, field: String },
}

/// Host and device heaps plus the device handle cache.
#[derive(Debug, Default)]
pub struct Emulator {
    plans: FxHashMap<String, MirrorPlan>,
    host: Vec<Record>,
    device: Vec<Record>,
    cache: FxHashMap<HostRef, DeviceRef>,
    syncing: FxHashSet<HostRef>,
}

impl Emulator {
    pub fn new(plans: impl IntoIterator<Item = MirrorPlan>) -> Self {
        Emulator {
            plans: plans.into_iter().map(|p| (p.object.clone(), p)).collect(),
            ..Self::default()
        }
    }

    /// Place an object on the host heap.
    pub fn alloc(&mut self, record: Record) -> HostRef {
        self.host.push(record);
        self.host.len() - 1
    }

    pub fn host(&self, index: HostRef) -> Option<&Record> {
        self.host.get(index)
    }

    pub fn host_mut(&mut self, index: HostRef) -> Option<&mut Record> {
        self.host.get_mut(index)
    }

    pub fn device(&self, index: DeviceRef) -> Option<&Record> {
        self.device.get(index)
    }

    pub fn device_mut(&mut self, index: DeviceRef) -> Option<&mut Record> {
        self.device.get_mut(index)
    }

    /// Cached device handle of a host object.
    pub fn device_handle_of(&self, index: HostRef) -> Option<DeviceRef> {
        self.cache.get(&index).copied()
    }

    /// Copy a host object to the device heap.
    pub fn mirror_to_device(&mut self, index: HostRef, clobber: bool) -> Result<DeviceRef, EmulatorError> {
        let cached = self.device_handle_of(index);
        if let (Some(handle), false) = (cached, clobber) {
            return Ok(handle);
        }

        let record = self
            .host
            .get(index)
            .cloned()
            .ok_or(EmulatorError::DanglingReference { heap: "host", index })?;

        // Reserve and cache before recursing so cycles find it.
        self.device.push(Record::new(record.class.clone(), Vec::new()));
        let handle = self.device.len() - 1;
        if let Some(old) = self.cache.insert(index, handle) {
            tracing::trace!(host = index, old, "superseded device copy");
        }

        let translated = self.translate(&record)?;
        self.device[handle] = translated;
        tracing::trace!(host = index, device = handle, clobber, "mirrored object");
        Ok(handle)
    }

    fn translate(&mut self, record: &Record) -> Result<Record, EmulatorError> {
        let plan = self.plan(&record.class)?.clone();
        check_shape(record, &plan)?;

        let mut fields = Vec::with_capacity(record.fields.len());
        for (field, value) in plan.fields.iter().zip(&record.fields) {
            let translated = match (&field.kind, value) {
                (FieldKind::Plain { .. }, value) => value.clone(),
                (FieldKind::NestedObject { .. }, Value::Object(None)) => Value::Object(None),
                (FieldKind::NestedObject { .. }, Value::Object(Some(nested))) => {
                    Value::Object(Some(self.mirror_to_device(*nested, false)?))
                }
                (FieldKind::EmbeddedObject { .. }, Value::Embedded(inner)) => {
                    Value::Embedded(self.translate(inner)?)
                }
                _ => return Err(mismatch(record, &field.name)),
            };
            fields.push(translated);
        }

        Ok(Record {
            class: record.class.clone(),
            device_class: true,
            fields,
        })
    }

    /// Copy device-side state of `device` back into host object `index`.
    pub fn sync_from_device(&mut self, index: HostRef, device: DeviceRef) -> Result<(), EmulatorError> {
        if !self.syncing.insert(index) {
            return Ok(());
        }
        let result = self.sync_object(index, device);
        self.syncing.remove(&index);
        result
    }

    fn sync_object(&mut self, index: HostRef, device: DeviceRef) -> Result<(), EmulatorError> {
        let mut host = self
            .host
            .get(index)
            .cloned()
            .ok_or(EmulatorError::DanglingReference { heap: "host", index })?;
        let remote = self
            .device
            .get(device)
            .cloned()
            .ok_or(EmulatorError::DanglingReference {
                heap: "device",
                index: device,
            })?;

        let nested = self.sync_record(&mut host, &remote)?;
        self.host[index] = host;

        for (host_ref, device_ref) in nested {
            self.sync_from_device(host_ref, device_ref)?;
        }
        Ok(())
    }

    /// Copy syncable values of `remote` into `host`. Returns the nested
    /// objects still to be synced.
    fn sync_record(&self, host: &mut Record, remote: &Record) -> Result<Vec<(HostRef, DeviceRef)>, EmulatorError> {
        let plan = self.plan(&host.class)?;
        check_shape(host, plan)?;
        check_shape(remote, plan)?;

        let mut nested = Vec::new();
        for (i, field) in plan.fields.iter().enumerate() {
            if !field.sync_back {
                continue;
            }
            match (&field.kind, &mut host.fields[i], &remote.fields[i]) {
                (FieldKind::Plain { pointer: true }, _, _) => {}
                (FieldKind::Plain { pointer: false }, slot, value) => *slot = value.clone(),
                (FieldKind::NestedObject { .. }, Value::Object(Some(h)), Value::Object(Some(d))) => {
                    nested.push((*h, *d));
                }
                (FieldKind::NestedObject { .. }, Value::Object(_), Value::Object(_)) => {}
                (FieldKind::EmbeddedObject { .. }, Value::Embedded(inner), Value::Embedded(remote_inner)) => {
                    nested.extend(self.sync_record(inner, remote_inner)?);
                }
                _ => return Err(mismatch(host, &field.name)),
            }
        }
        Ok(nested)
    }

    fn plan(&self, class: &str) -> Result<&MirrorPlan, EmulatorError> {
        self.plans
            .get(class)
            .ok_or_else(|| EmulatorError::UnknownClass(class.to_string()))
    }
}

fn check_shape(record: &Record, plan: &MirrorPlan) -> Result<(), EmulatorError> {
    if record.fields.len() == plan.fields.len() {
        Ok(())
    } else {
        Err(EmulatorError::ShapeMismatch {
            class: record.class.clone(),
            field: format!("<{} fields, expected {}>", record.fields.len(), plan.fields.len()),
        })
    }
}

fn mismatch(record: &Record, field: &str) -> EmulatorError {
    EmulatorError::ShapeMismatch {
        class: record.class.clone(),
        field: field.to_string(),
    }
}
