//! Name-indexed registry of material providers.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::provider::{ConstantIndex, MaterialError, MaterialProvider};
use crate::sellmeier::SellmeierMaterial;

/// Maps the material identifiers used in layer stacks to providers.
#[derive(Clone, Default)]
pub struct MaterialLibrary {
    materials: BTreeMap<String, Arc<dyn MaterialProvider>>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with `si`, `sio2`, `sin` and `air`.
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        lib.insert("si", SellmeierMaterial::silicon());
        lib.insert("sio2", SellmeierMaterial::silica());
        lib.insert("sin", SellmeierMaterial::silicon_nitride());
        lib.insert("air", ConstantIndex::air());
        lib
    }

    /// Registers (or replaces) a material under `id`.
    pub fn insert(&mut self, id: impl Into<String>, material: impl MaterialProvider + 'static) {
        self.materials.insert(id.into(), Arc::new(material));
    }

    pub fn get(&self, id: &str) -> Result<&Arc<dyn MaterialProvider>, MaterialError> {
        self.materials
            .get(id)
            .ok_or_else(|| MaterialError::NotFound(format!("'{id}' (known: {})", self.ids().join(", "))))
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.materials.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn MaterialProvider>)> {
        self.materials.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl std::fmt::Debug for MaterialLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialLibrary")
            .field("materials", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_sorted() {
        assert_eq!(MaterialLibrary::builtin().ids(), vec!["air", "si", "sin", "sio2"]);
    }

    #[test]
    fn unknown_material_is_an_error() {
        let err = MaterialLibrary::builtin().get("gaas").err().unwrap();
        assert!(matches!(err, MaterialError::NotFound(_)));
    }
}
