//! Mosaic Program Model
//!
//! The CPU-side representation of the programs the composer builds:
//!
//! - [`parameter`]: typed, named values flowing between stages, stored in a
//!   per-program arena and addressed through [`ParameterId`]s
//! - [`operand`] / [`invocation`]: calls into the shader libraries and their
//!   operand bindings
//! - [`function`] / [`program`] / [`program_set`]: the entry point, the
//!   vertex/fragment programs and the pair built for one render state
//! - [`writer`]: source emission for every [`TargetLanguage`]
//! - [`eval`]: a CPU reference evaluator for the built-in library subset
//!
//! [`TargetLanguage`]: mosaic_core::TargetLanguage

pub mod binding;
pub mod eval;
pub mod function;
pub mod invocation;
pub mod library;
pub mod operand;
pub mod parameter;
pub mod program;
pub mod program_set;
pub mod writer;

pub use binding::{UniformBinding, UniformSource};
pub use eval::{Evaluator, Value};
pub use function::Function;
pub use invocation::{FunctionInvocation, OrderCounter};
pub use operand::{Operand, OperandDirection, OperandMask};
pub use parameter::{AutoConstant, Content, DataType, Parameter, ParameterId, ParameterKind, Semantic};
pub use program::Program;
pub use program_set::{ProgramSet, Varying};
pub use writer::ProgramWriter;
