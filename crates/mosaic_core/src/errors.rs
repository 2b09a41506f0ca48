//! Error Types
//!
//! Every fallible operation of the composer returns [`Result<T>`], an alias
//! for `std::result::Result<T, ShaderError>`.
//!
//! # Overview
//!
//! Errors fall into a few families:
//! - **Resolution**: a feature could not obtain a parameter it needs
//!   (missing capability, exhausted slot, conflicting declaration). The whole
//!   render state fails to assemble.
//! - **Configuration**: a feature was configured with contradictory or
//!   out-of-range values and has no degraded path for them.
//! - **Cache**: a fingerprint matched a cached entry whose composition differs
//!   from the request. This is a logic error and is never swallowed.
//! - **Registry / emission / evaluation**: factory misuse, template failures
//!   and reference-evaluator errors.
//!
//! None of these are retried; the caller (usually the material system) picks
//! a fallback program.

use thiserror::Error;

use crate::stage::ShaderStage;

/// The main error type of the shader composer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// A required parameter could not be resolved.
    #[error("Parameter resolution failed in {stage} program: {reason}")]
    ParameterResolution {
        /// Program the parameter was requested from
        stage: ShaderStage,
        /// Human readable cause (capability, slot, conflict)
        reason: String,
    },

    /// An invocation operand refers to a parameter that is not part of the program.
    #[error("Operand of '{function}' refers to unresolved parameter #{index} in {stage} program")]
    UnresolvedOperand {
        /// Function the invocation calls
        function: String,
        /// Program the invocation was added to
        stage: ShaderStage,
        /// Raw index of the offending parameter id
        index: u32,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A feature was configured with values it cannot work with.
    #[error("Invalid configuration for '{feature}': {reason}")]
    Configuration {
        /// Type name of the feature (or `render_state` for composition errors)
        feature: String,
        /// Description of the conflict
        reason: String,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// No factory is registered for the requested type name.
    #[error("No factory registered for sub-render-state type '{0}'")]
    UnknownSubRenderState(String),

    /// The render state already holds an instance of this type.
    #[error("Sub-render-state '{0}' is already part of the render state")]
    DuplicateSubRenderState(String),

    /// A factory with this type name was already registered.
    #[error("A factory for '{0}' is already registered")]
    DuplicateFactory(String),

    /// Registration was attempted after the registry was frozen.
    #[error("Factory registry is frozen, cannot register '{0}'")]
    RegistryFrozen(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// Two different compositions produced the same fingerprint.
    #[error("Fingerprint collision on {fingerprint:#018x}: cached composition differs from the requested one")]
    FingerprintCollision {
        /// The colliding fingerprint
        fingerprint: u64,
    },

    // ========================================================================
    // Emission & Evaluation Errors
    // ========================================================================
    /// The source template failed to load or render.
    #[error("Shader template error: {0}")]
    Template(String),

    /// The reference evaluator has no implementation for a library function.
    #[error("Reference evaluator does not implement '{0}'")]
    UnsupportedFunction(String),

    /// The reference evaluator hit a missing or ill-typed value.
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl ShaderError {
    /// Shorthand for [`ShaderError::ParameterResolution`].
    pub fn resolution(stage: ShaderStage, reason: impl Into<String>) -> Self {
        Self::ParameterResolution {
            stage,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ShaderError::Configuration`].
    pub fn configuration(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures caused by missing parameters or hardware slots.
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::ParameterResolution { .. } | Self::UnresolvedOperand { .. }
        )
    }
}

/// Alias for `Result<T, ShaderError>`.
pub type Result<T> = std::result::Result<T, ShaderError>;
