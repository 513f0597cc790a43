//! FHIR data models
//!
//! This crate provides a descriptor-driven model of FHIR R4 types. Instead of
//! one Rust struct per resource, every type is described by a
//! [`TypeDescriptor`] (loaded once from embedded definition tables) and
//! values are held in generic [`Instance`]s that enforce the descriptor's
//! structural rules.
//!
//! # Module Organization
//!
//! - `descriptor`: field and type descriptors, cardinality, bindings
//! - `primitive`: FHIR primitive types and their value spaces
//! - `registry`: the by-name descriptor registry and the embedded R4 tables
//! - `loader`: StructureDefinition-shaped definition loader
//! - `instance`: runtime instances and field access
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::{TypeRegistry, Value};
//!
//! let registry = TypeRegistry::r4();
//! let mut event = registry.instantiate("AuditEvent").unwrap();
//! event.set("action", Value::code("C")).unwrap();
//!
//! // `class` is exposed as `local_class`, its wire name is unchanged
//! let encounter = registry.lookup("Encounter").unwrap();
//! let class = encounter.field("local_class").unwrap();
//! assert_eq!(class.wire_name(), "class");
//! ```

pub mod descriptor;
pub mod error;
pub mod instance;
pub mod loader;
pub mod primitive;
pub mod registry;

pub use descriptor::{
    Binding, BindingStrength, Cardinality, FieldDescriptor, Representation, TypeDescriptor,
    TypeKind, TypeRef, WireMatch, ANY_RESOURCE,
};
pub use error::{Error, Result};
pub use instance::{FieldRef, Instance, Primitive, Value};
pub use loader::DefinitionLoader;
pub use primitive::{DecimalValue, PrimitiveType, PrimitiveValue, ScalarKind};
pub use registry::TypeRegistry;
