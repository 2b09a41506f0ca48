//! Mosaic Core
//!
//! Foundational types shared by every crate of the shader composer:
//!
//! - [`errors`]: the [`ShaderError`] taxonomy and the [`Result`] alias
//! - [`interner`]: global string interning for function and library names
//! - [`hash`]: stable hashing helpers used for configuration hashes and fingerprints
//! - [`language`]: the shading languages programs can be emitted in
//! - [`capabilities`]: hardware limits and extension flags supplied by the caller
//! - [`stage`]: vertex / fragment program stages

pub mod capabilities;
pub mod errors;
pub mod hash;
pub mod interner;
pub mod language;
pub mod stage;

pub use capabilities::{Capabilities, CapabilityFlags};
pub use errors::{Result, ShaderError};
pub use interner::Symbol;
pub use language::TargetLanguage;
pub use stage::ShaderStage;
