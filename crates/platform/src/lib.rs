#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform capability layer for keg.
//!
//! This crate hides every difference between the supported hosts behind one
//! interface so the cleaner never branches on platform identity:
//! - Platform detection, resolved once per process
//! - The [`CapabilityProvider`] trait: tool paths and platform queries,
//!   failing loudly for anything the active backend does not define
//! - Process execution and in-place file rewriting with event emission

pub mod capability;
pub mod core;
pub mod fs;
pub mod implementations;
pub mod manager;
pub mod process;

pub use capability::{Capability, CapabilityProvider};
pub use core::{detect_platform, OsVersion, PlatformContext, PlatformKind};
pub use implementations::{linux::LinuxCapabilities, macos::MacOSCapabilities};
pub use manager::{provider, PlatformManager};
pub use process::{CommandOutput, PlatformCommand};
