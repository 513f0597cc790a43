//! Type descriptor registry
//!
//! A registry is filled once (by the [`DefinitionLoader`](crate::loader::DefinitionLoader)
//! or by hand) and then frozen behind an `Arc`. Descriptors are never updated
//! or removed after registration.

use crate::descriptor::{TypeDescriptor, TypeKind};
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::loader::DefinitionLoader;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

const R4_CODE_TABLES: &str = include_str!("../definitions/codes.json");

const R4_DEFINITIONS: &[&str] = &[
    include_str!("../definitions/base.json"),
    include_str!("../definitions/datatypes.json"),
    include_str!("../definitions/auditevent.json"),
    include_str!("../definitions/codesystem.json"),
    include_str!("../definitions/conceptmap.json"),
    include_str!("../definitions/encounter.json"),
    include_str!("../definitions/goal.json"),
    include_str!("../definitions/nutritionorder.json"),
];

static R4_REGISTRY: Lazy<Arc<TypeRegistry>> = Lazy::new(|| {
    Arc::new(load_embedded_r4().expect("failed to load embedded R4 definitions"))
});

fn load_embedded_r4() -> Result<TypeRegistry> {
    let loader = DefinitionLoader::new().with_code_tables_str(R4_CODE_TABLES)?;
    let mut registry = TypeRegistry::new();
    let mut definitions = Vec::new();
    for source in R4_DEFINITIONS {
        definitions.extend(DefinitionLoader::parse_definitions(source)?);
    }
    let count = loader.load(&mut registry, definitions)?;
    tracing::debug!(types = count, "loaded embedded R4 definitions");
    Ok(registry)
}

/// Registry of type descriptors indexed by name
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDescriptor>>,
    /// Registration order, for stable iteration
    order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry built from the embedded FHIR R4 tables
    pub fn r4() -> Arc<TypeRegistry> {
        R4_REGISTRY.clone()
    }

    /// Register a descriptor under its name
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<Arc<TypeDescriptor>> {
        let name = descriptor.name().to_string();
        if self.types.contains_key(&name) {
            return Err(Error::DuplicateType(name));
        }

        tracing::trace!(type_name = %name, fields = descriptor.fields().len(), "registered type");
        let descriptor = Arc::new(descriptor);
        self.types.insert(name.clone(), descriptor.clone());
        self.order.push(name);
        Ok(descriptor)
    }

    /// Get a descriptor by name
    pub fn lookup(&self, name: &str) -> Result<Arc<TypeDescriptor>> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over all descriptors in registration order
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    /// Concrete resource types
    pub fn resource_types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types()
            .filter(|t| t.kind() == TypeKind::Resource && !t.is_abstract())
    }

    /// Nested types declared directly under `parent` (`Encounter` → `Encounter.Diagnosis`, ...)
    pub fn nested_types<'a>(
        &'a self,
        parent: &'a str,
    ) -> impl Iterator<Item = &'a Arc<TypeDescriptor>> + 'a {
        self.types().filter(move |t| {
            t.name()
                .strip_prefix(parent)
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|rest| !rest.contains('.'))
        })
    }

    /// Create an empty instance of the named type
    pub fn instantiate(self: &Arc<Self>, name: &str) -> Result<Instance> {
        let descriptor = self.lookup(name)?;
        if descriptor.is_abstract() {
            return Err(Error::AbstractType(name.to_string()));
        }
        Ok(Instance::new(self.clone(), descriptor))
    }
}
