//! Data model: the generic wire value, record descriptors and validated
//! record instances.
//!
//! - [`value`]: the [`Value`] pivot between typed records and bytes
//! - [`record`]: [`TypeDescriptor`], the capability traits and [`Record`]
//! - [`fields`]: reading and writing keyed maps through a field-key map

pub mod fields;
pub mod record;
pub mod value;

pub use fields::{FieldCx, FieldMap, FromField, MapBuilder, ToField};
pub use record::{FieldKey, FromValue, Record, Schema, ToValue, TypeDescriptor, Validate};
pub use value::{Kind, Value};
