//! Factories and the process-wide registry.
//!
//! Registration follows a register-then-freeze discipline: factories are added
//! at startup under a write lock, then [`FactoryRegistry::freeze`] moves them
//! into an immutable map that is read without locking for the rest of the
//! process lifetime.

use std::marker::PhantomData;
use std::sync::{Arc, LazyLock, OnceLock};

use mosaic_core::{Result, ShaderError};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::colour::ColourFeature;
use crate::fog::FogFeature;
use crate::lighting::LightingFeature;
use crate::skinning::HardwareSkinning;
use crate::sub_render_state::SubRenderState;
use crate::texturing::TexturingFeature;
use crate::transform::TransformFeature;

/// Creates default-configured instances of one feature type.
pub trait SubRenderStateFactory: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn create_instance(&self) -> Box<dyn SubRenderState>;
}

/// Factory for any feature with a `Default` configuration.
pub struct DefaultFactory<T> {
    type_name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: SubRenderState + Default> DefaultFactory<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            type_name: T::default().type_name(),
            _marker: PhantomData,
        }
    }
}

impl<T: SubRenderState + Default> Default for DefaultFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SubRenderState + Default> SubRenderStateFactory for DefaultFactory<T> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(T::default())
    }
}

type FactoryMap = FxHashMap<&'static str, Arc<dyn SubRenderStateFactory>>;

/// Type name → factory map.
#[derive(Default)]
pub struct FactoryRegistry {
    pending: RwLock<FactoryMap>,
    frozen: OnceLock<FactoryMap>,
}

impl FactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in feature factory, not yet frozen.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        if let Err(e) = register_builtin_factories(&registry) {
            log::warn!("Built-in factory registration failed: {e}");
        }
        registry
    }

    pub fn register_factory(&self, factory: Arc<dyn SubRenderStateFactory>) -> Result<()> {
        let name = factory.type_name();
        let mut pending = self.pending.write();
        // Checked under the write lock so it cannot race with `freeze`.
        if self.frozen.get().is_some() {
            log::warn!("Rejected factory '{name}': registry is frozen");
            return Err(ShaderError::RegistryFrozen(name.to_owned()));
        }
        if pending.contains_key(name) {
            return Err(ShaderError::DuplicateFactory(name.to_owned()));
        }
        log::debug!("Registered sub-render-state factory '{name}'");
        pending.insert(name, factory);
        Ok(())
    }

    /// Ends registration. Later calls are no-ops.
    pub fn freeze(&self) {
        let mut pending = self.pending.write();
        if self.frozen.get().is_none() {
            let map = std::mem::take(&mut *pending);
            log::debug!("Factory registry frozen with {} factories", map.len());
            let _ = self.frozen.set(map);
        }
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    pub fn create_instance(&self, type_name: &str) -> Result<Box<dyn SubRenderState>> {
        let factory = match self.frozen.get() {
            Some(map) => map.get(type_name).cloned(),
            None => self.pending.read().get(type_name).cloned(),
        };
        factory
            .map(|f| f.create_instance())
            .ok_or_else(|| ShaderError::UnknownSubRenderState(type_name.to_owned()))
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        match self.frozen.get() {
            Some(map) => map.contains_key(type_name),
            None => self.pending.read().contains_key(type_name),
        }
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = match self.frozen.get() {
            Some(map) => map.keys().copied().collect(),
            None => self.pending.read().keys().copied().collect(),
        };
        names.sort_unstable();
        names
    }
}

/// Registers the factories of every built-in feature.
pub fn register_builtin_factories(registry: &FactoryRegistry) -> Result<()> {
    registry.register_factory(Arc::new(DefaultFactory::<TransformFeature>::new()))?;
    registry.register_factory(Arc::new(DefaultFactory::<ColourFeature>::new()))?;
    registry.register_factory(Arc::new(DefaultFactory::<LightingFeature>::new()))?;
    registry.register_factory(Arc::new(DefaultFactory::<TexturingFeature>::new()))?;
    registry.register_factory(Arc::new(DefaultFactory::<FogFeature>::new()))?;
    registry.register_factory(Arc::new(DefaultFactory::<HardwareSkinning>::new()))?;
    Ok(())
}

static GLOBAL_REGISTRY: LazyLock<FactoryRegistry> = LazyLock::new(FactoryRegistry::with_builtins);

/// The process-wide registry, pre-populated with the built-in factories.
///
/// Applications register their own factories at startup and then call
/// [`FactoryRegistry::freeze`].
pub fn global_registry() -> &'static FactoryRegistry {
    &GLOBAL_REGISTRY
}
