//! Mosaic Program Generation
//!
//! - [`ProgramAssembler`]: runs a render state's features against a fresh
//!   program set and emits source for the target language.
//! - [`ProgramCache`]: fingerprint-keyed cache of assembled programs with a
//!   mandatory full-equality check on every hit and at most one assembly in
//!   flight per fingerprint.
//! - [`ShaderGenerator`]: facade tying settings, the factory registry and the
//!   cache together.

pub mod assembler;
pub mod cache;
pub mod cache_key;
pub mod generator;
pub mod settings;

pub use assembler::{AssembledProgram, ProgramAssembler};
pub use cache::{CacheStats, CachedProgramSet, ProgramCache, ProgramSource};
pub use cache_key::Fingerprint;
pub use generator::ShaderGenerator;
pub use settings::GeneratorSettings;
