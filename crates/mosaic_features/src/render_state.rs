//! Ordered compositions of sub-render-states.

use mosaic_core::{Capabilities, Result, ShaderError};

use crate::factory::FactoryRegistry;
use crate::sub_render_state::{PassContext, SubRenderState};

/// An ordered set of configured features.
///
/// Features are kept sorted by execution order; ties keep insertion order.
/// At most one instance per type unless the type allows multiples.
#[derive(Debug, Default)]
pub struct RenderState {
    states: Vec<Box<dyn SubRenderState>>,
}

impl RenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a render state of default-configured features by type name.
    pub fn from_types(registry: &FactoryRegistry, type_names: &[&str]) -> Result<Self> {
        let mut state = Self::new();
        for name in type_names {
            state.add(registry.create_instance(name)?)?;
        }
        Ok(state)
    }

    pub fn add(&mut self, state: Box<dyn SubRenderState>) -> Result<()> {
        if !state.allows_multiple() && self.contains(state.type_name()) {
            return Err(ShaderError::DuplicateSubRenderState(state.type_name().to_owned()));
        }
        let order = state.execution_order();
        let at = self
            .states
            .iter()
            .position(|s| s.execution_order() > order)
            .unwrap_or(self.states.len());
        self.states.insert(at, state);
        Ok(())
    }

    /// Runs the feature's pass hook first; returns `Ok(false)` when the
    /// feature opted out of the pass.
    pub fn add_for_pass(
        &mut self,
        mut state: Box<dyn SubRenderState>,
        pass: &PassContext,
        caps: &Capabilities,
    ) -> Result<bool> {
        if !state.pre_add_to_render_state(pass, caps) {
            log::debug!("'{}' left out of the render state for this pass", state.type_name());
            return Ok(false);
        }
        self.add(state)?;
        Ok(true)
    }

    /// Removes the first feature of the given type.
    pub fn remove(&mut self, type_name: &str) -> Option<Box<dyn SubRenderState>> {
        let at = self.states.iter().position(|s| s.type_name() == type_name)?;
        Some(self.states.remove(at))
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.states.iter().any(|s| s.type_name() == type_name)
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&dyn SubRenderState> {
        self.states
            .iter()
            .find(|s| s.type_name() == type_name)
            .map(AsRef::as_ref)
    }

    /// First feature of concrete type `T`.
    #[must_use]
    pub fn get_as<T: SubRenderState>(&self) -> Option<&T> {
        self.states.iter().find_map(|s| s.as_any().downcast_ref::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SubRenderState> {
        self.states.iter().map(AsRef::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn SubRenderState> {
        self.states.iter_mut().map(AsMut::as_mut)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The ordered `(type name, hash)` sequence the cache fingerprints.
    #[must_use]
    pub fn composition(&self) -> Vec<(&'static str, u64)> {
        self.states.iter().map(|s| (s.type_name(), s.hash_code())).collect()
    }
}

impl Clone for RenderState {
    fn clone(&self) -> Self {
        Self {
            states: self.states.iter().map(|s| s.clone_box()).collect(),
        }
    }
}

/// Full configuration equality, feature by feature, in order.
impl PartialEq for RenderState {
    fn eq(&self, other: &Self) -> bool {
        self.states.len() == other.states.len()
            && self
                .states
                .iter()
                .zip(&other.states)
                .all(|(a, b)| a.type_name() == b.type_name() && a.config_eq(b.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fog::{FogConfig, FogFeature, FogMode};
    use crate::transform::TransformFeature;

    fn fog(mode: FogMode) -> Box<FogFeature> {
        Box::new(FogFeature::new(FogConfig {
            mode,
            ..FogConfig::default()
        }))
    }

    #[test]
    fn test_sorted_by_execution_order() {
        let mut rs = RenderState::new();
        rs.add(fog(FogMode::Linear)).unwrap();
        rs.add(Box::new(TransformFeature::default())).unwrap();
        let names: Vec<_> = rs.iter().map(|s| s.type_name()).collect();
        assert_eq!(names, ["FFP_Transform", "FFP_Fog"]);
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut rs = RenderState::new();
        rs.add(fog(FogMode::Linear)).unwrap();
        assert_eq!(
            rs.add(fog(FogMode::Exp)).unwrap_err(),
            ShaderError::DuplicateSubRenderState("FFP_Fog".to_owned())
        );
    }

    #[test]
    fn test_fog_none_opts_out_of_pass() {
        let mut rs = RenderState::new();
        let added = rs
            .add_for_pass(fog(FogMode::None), &PassContext::default(), &Capabilities::default())
            .unwrap();
        assert!(!added);
        assert!(rs.is_empty());
    }

    #[test]
    fn test_equality_compares_configuration() {
        let mut a = RenderState::new();
        a.add(fog(FogMode::Linear)).unwrap();
        let b = a.clone();
        let mut c = RenderState::new();
        c.add(fog(FogMode::Exp2)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.composition(), b.composition());
        assert_ne!(a.composition(), c.composition());
    }
}
