//! Dispatch from [`ConverterId`] to a concrete engine.
//!
//! Which engines exist is a deployment concern. The default registry only
//! knows the `image`-crate engine; the HEIC specialist and the compressor
//! are native-platform libraries with no pure-Rust counterpart, so paths
//! that name them resolve but cannot run here.

use super::backend::Converter;
use super::image_crate::ImageCrateConverter;
use crate::formats::ConverterId;
use std::collections::HashMap;

#[derive(Default)]
pub struct ConverterRegistry {
    engines: HashMap<ConverterId, Box<dyn Converter + Send>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `generic-manipulator` → [`ImageCrateConverter`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ConverterId::GenericManipulator, ImageCrateConverter::new());
        registry
    }

    /// Register (or replace) the engine behind `id`.
    pub fn register(&mut self, id: ConverterId, converter: impl Converter + Send + 'static) {
        self.engines.insert(id, Box::new(converter));
    }

    pub fn get(&self, id: ConverterId) -> Option<&dyn Converter> {
        self.engines.get(&id).map(|c| c.as_ref() as &dyn Converter)
    }

    pub fn contains(&self, id: ConverterId) -> bool {
        self.engines.contains_key(&id)
    }
}
