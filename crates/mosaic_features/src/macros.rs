/// Implements the configuration plumbing shared by every built-in feature.
///
/// Expects the implementing type to have a `config` field (cloneable,
/// `PartialEq`, `Hash`) and a `new(config)` constructor that starts with no
/// resolved parameters. Used inside `impl SubRenderState for ...`.
macro_rules! impl_feature_config {
    () => {
        fn hash_code(&self) -> u64 {
            mosaic_core::hash::fx_hash_key(&(self.type_name(), &self.config))
        }

        fn copy_from(&mut self, other: &dyn $crate::SubRenderState) {
            match other.as_any().downcast_ref::<Self>() {
                Some(other) => self.config = other.config.clone(),
                None => log::warn!(
                    "copy_from: cannot copy '{}' into '{}'",
                    other.type_name(),
                    self.type_name()
                ),
            }
        }

        fn config_eq(&self, other: &dyn $crate::SubRenderState) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|other| other.config == self.config)
        }

        fn clone_box(&self) -> Box<dyn $crate::SubRenderState> {
            Box::new(Self::new(self.config.clone()))
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };
}
