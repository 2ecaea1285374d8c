//! Type registry.
//!
//! Registration happens on a [`RegistryBuilder`]; [`RegistryBuilder::freeze`]
//! turns it into a read-only [`Registry`]. Decoding only ever sees the frozen
//! form, so late registration is impossible by construction.
//!
//! The process-wide registry returned by [`global`] holds every built-in
//! type. Tests and embedders that need isolation build their own.

pub mod union;

use std::any::{Any, TypeId};
use std::fmt;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::codec::{cbor, ur};
use crate::error::{DecodeError, EncodeError, RegistryError};
use crate::model::{Kind, Record, Schema, TypeDescriptor, Value};
use crate::types;

type ErasedDecode = fn(&Value, DecodeContext<'_>) -> Result<Box<dyn DynRecord>, DecodeError>;

/// A registered type.
#[derive(Clone, Copy)]
pub struct Entry {
    descriptor: &'static TypeDescriptor,
    type_id: TypeId,
    decode: ErasedDecode,
}

impl Entry {
    fn of<F: Schema>() -> Self {
        Self {
            descriptor: F::descriptor(),
            type_id: TypeId::of::<F>(),
            decode: decode_erased::<F>,
        }
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.descriptor
    }

    /// Returns true if this entry was registered for `F`.
    pub fn is<F: Schema>(&self) -> bool {
        self.type_id == TypeId::of::<F>()
    }

    /// Decodes an untagged value as this entry's type.
    pub fn decode(&self, value: &Value, cx: DecodeContext<'_>) -> Result<Box<dyn DynRecord>, DecodeError> {
        (self.decode)(value, cx)
    }

    fn same_as(&self, other: &Entry) -> bool {
        self.type_id == other.type_id && self.descriptor == other.descriptor
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("tag", &self.descriptor.tag)
            .field("name", &self.descriptor.name)
            .finish()
    }
}

fn decode_erased<F: Schema>(value: &Value, cx: DecodeContext<'_>) -> Result<Box<dyn DynRecord>, DecodeError> {
    Ok(Box::new(Record::<F>::from_value(value, cx)?))
}

// =============================================================================
// INITIALIZATION PHASE
// =============================================================================

/// Collects type registrations before decoding starts.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    by_tag: FxHashMap<u64, Entry>,
    by_name: FxHashMap<&'static str, u64>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `F` under its tag and name.
    ///
    /// Registering the same type twice is a no-op. A different type or
    /// descriptor claiming a taken tag or name is an error.
    pub fn register<F: Schema>(&mut self) -> Result<&mut Self, RegistryError> {
        let entry = Entry::of::<F>();
        let descriptor = entry.descriptor;

        if let Some(existing) = self.by_tag.get(&descriptor.tag) {
            if existing.same_as(&entry) {
                return Ok(self);
            }
            return Err(RegistryError::DuplicateTag {
                tag: descriptor.tag,
                existing: existing.descriptor.name,
                new: descriptor.name,
            });
        }
        if let Some(&existing) = self.by_name.get(descriptor.name) {
            return Err(RegistryError::DuplicateName {
                name: descriptor.name,
                existing,
                new: descriptor.tag,
            });
        }

        debug!(tag = descriptor.tag, name = descriptor.name, "registering record type");
        self.by_tag.insert(descriptor.tag, entry);
        self.by_name.insert(descriptor.name, descriptor.tag);
        Ok(self)
    }

    /// Registers every record type this crate defines.
    pub fn register_builtin(&mut self) -> Result<&mut Self, RegistryError> {
        self.register::<types::Uuid>()?
            .register::<types::SyncId>()?
            .register::<types::CoinInfo>()?
            .register::<types::Keypath>()?
            .register::<types::HdKey>()?
            .register::<types::EcKey>()?
            .register::<types::OutputDescriptor>()?
            .register::<types::Account>()?
            .register::<types::MultiAccounts>()?
            .register::<types::CoinIdentity>()?
            .register::<types::DetailedAccount>()?
            .register::<types::PortfolioCoin>()?
            .register::<types::PortfolioMetadata>()?
            .register::<types::Portfolio>()
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    /// Ends the initialization phase.
    pub fn freeze(self) -> Registry {
        debug!(types = self.by_tag.len(), "registry frozen");
        Registry {
            by_tag: self.by_tag,
            by_name: self.by_name,
        }
    }
}

// =============================================================================
// FROZEN PHASE
// =============================================================================

/// A read-only type registry.
#[derive(Debug)]
pub struct Registry {
    by_tag: FxHashMap<u64, Entry>,
    by_name: FxHashMap<&'static str, u64>,
}

impl Registry {
    /// Builds a frozen registry holding every built-in type.
    pub fn builtin() -> Result<Registry, RegistryError> {
        let mut builder = RegistryBuilder::new();
        builder.register_builtin()?;
        Ok(builder.freeze())
    }

    pub fn lookup_tag(&self, tag: u64) -> Result<&Entry, DecodeError> {
        self.by_tag.get(&tag).ok_or(DecodeError::UnknownTag { tag })
    }

    pub fn lookup_name(&self, name: &str) -> Result<&Entry, DecodeError> {
        self.by_name
            .get(name)
            .and_then(|tag| self.by_tag.get(tag))
            .ok_or_else(|| DecodeError::UnknownName {
                name: name.to_string(),
            })
    }

    pub fn contains_tag(&self, tag: u64) -> bool {
        self.by_tag.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    /// Returns every descriptor, ordered by tag.
    pub fn descriptors(&self) -> Vec<&'static TypeDescriptor> {
        let mut all: Vec<_> = self.by_tag.values().map(|e| e.descriptor).collect();
        all.sort_by_key(|d| d.tag);
        all
    }

    /// Decodes a tagged value as whichever type its tag names.
    pub fn decode_value(&self, value: &Value) -> Result<Box<dyn DynRecord>, DecodeError> {
        let (tag, inner) = value.as_tagged().ok_or(DecodeError::TypeMismatch {
            type_name: "<registry>",
            field: "<root>",
            expected: Kind::Tagged,
            found: value.kind(),
        })?;
        self.lookup_tag(tag)?.decode(inner, DecodeContext::new(self))
    }

    /// Decodes a self-identifying tagged payload.
    pub fn decode_tagged_bytes(&self, bytes: &[u8]) -> Result<Box<dyn DynRecord>, DecodeError> {
        self.decode_value(&cbor::decode(bytes)?)
    }

    /// Decodes a single-part UR, resolving its type by name.
    pub fn decode_ur(&self, s: &str) -> Result<Box<dyn DynRecord>, DecodeError> {
        let parsed = ur::decode(s)?;
        let entry = self.lookup_name(&parsed.ur_type)?;
        entry.decode(&cbor::decode(&parsed.payload)?, DecodeContext::new(self))
    }
}

lazy_static! {
    static ref GLOBAL: Registry =
        Registry::builtin().expect("built-in record types have distinct tags and names");
}

/// Returns the process-wide registry of built-in types.
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// Registry access threaded through a decode call.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'r> {
    registry: &'r Registry,
}

impl<'r> DecodeContext<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }
}

// =============================================================================
// TYPE-ERASED RECORDS
// =============================================================================

/// A decoded record whose type is only known at runtime.
pub trait DynRecord: fmt::Debug + Send + Sync + 'static {
    fn descriptor(&self) -> &'static TypeDescriptor;

    /// Returns the untagged wire value.
    fn to_value(&self) -> Value;

    fn as_any(&self) -> &dyn Any;

    fn clone_boxed(&self) -> Box<dyn DynRecord>;

    /// Compares with another erased record of any type.
    fn dyn_eq(&self, other: &dyn DynRecord) -> bool;
}

impl<F: Schema> DynRecord for Record<F> {
    fn descriptor(&self) -> &'static TypeDescriptor {
        F::descriptor()
    }

    fn to_value(&self) -> Value {
        Record::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn DynRecord> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynRecord) -> bool {
        other.as_any().downcast_ref::<Record<F>>() == Some(self)
    }
}

impl Clone for Box<dyn DynRecord> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

impl PartialEq for dyn DynRecord {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

impl Eq for dyn DynRecord {}

impl dyn DynRecord {
    /// Returns the record as `Record<F>` if that is its type.
    pub fn downcast_ref<F: Schema>(&self) -> Option<&Record<F>> {
        self.as_any().downcast_ref()
    }

    pub fn to_tagged_value(&self) -> Value {
        Value::tagged(self.descriptor().tag, self.to_value())
    }

    pub fn to_tagged_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        cbor::encode(&self.to_tagged_value())
    }
}
