//! Mosaic State Cache
//!
//! A mirror of the last state pushed to a graphics context. Every setter of
//! [`StateCacheManager`] compares the request with the mirror and only calls
//! into the [`Device`] when they differ or the caller forces the call.
//!
//! The manager is owned by the thread that owns the context and takes
//! `&mut self` throughout.

pub mod device;
pub mod gl;
pub mod manager;
pub mod recording;

pub use device::Device;
pub use manager::{BlendEquationState, BlendFuncState, StateCacheManager};
pub use recording::{DeviceCall, RecordingDevice};
