#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Post-install cleaning for keg packages
//!
//! After a package is installed into its prefix the cleaner walks `bin`,
//! `sbin` and `lib`, classifies every file by content, strips native
//! executables (keeping hard links intact), sets final permissions, deletes
//! stale libtool archives, drops `share/info` and prunes empty directories.
//! Platform differences are handled entirely by `keg-platform`.

pub mod classify;
mod cleaner;
pub mod package;
pub mod prune;
pub mod strip;

pub use classify::{
    archs_for_binary, archs_for_description, classify, classify_description, Arch, ArchList,
    FileCategory,
};
pub use cleaner::{CleanReport, Cleaner};
pub use package::{InstalledPackage, ProtectedPaths, ProtectionPolicy};
pub use prune::DirectoryEntry;
pub use strip::Stripper;
