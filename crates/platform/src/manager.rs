//! Process-wide capability provider.
//!
//! The provider is resolved from the detected platform on first use and then
//! shared. `install` lets embedders and tests put a specific provider in
//! place; `teardown` drops whatever is cached so the next lookup resolves
//! again.

use keg_errors::PlatformError;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::capability::CapabilityProvider;
use crate::core::detect_platform;
use crate::implementations::provider_for;

/// Holder of the cached provider
#[derive(Debug, Default)]
pub struct PlatformManager {
    provider: RwLock<Option<Arc<dyn CapabilityProvider>>>,
}

impl PlatformManager {
    /// The global manager
    pub fn instance() -> &'static PlatformManager {
        static INSTANCE: OnceLock<PlatformManager> = OnceLock::new();
        INSTANCE.get_or_init(PlatformManager::default)
    }

    /// Return the cached provider, resolving it from the running platform the
    /// first time.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` when the host is neither macOS nor Linux.
    pub fn provider(&self) -> Result<Arc<dyn CapabilityProvider>, PlatformError> {
        if let Some(existing) = self
            .provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(existing));
        }

        let mut slot = self.provider.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have resolved while we waited for the write lock
        if let Some(existing) = slot.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let resolved = provider_for(detect_platform()?);
        *slot = Some(Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Resolve the provider eagerly.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` when the host is neither macOS nor Linux.
    pub fn init(&self) -> Result<(), PlatformError> {
        self.provider().map(|_| ())
    }

    /// Replace the cached provider with `provider`
    pub fn install(&self, provider: Arc<dyn CapabilityProvider>) {
        *self.provider.write().unwrap_or_else(PoisonError::into_inner) = Some(provider);
    }

    /// Drop the cached provider; the next lookup resolves again
    pub fn teardown(&self) {
        self.provider
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Shorthand for `PlatformManager::instance().provider()`.
///
/// # Errors
///
/// Returns `UnsupportedPlatform` when the host is neither macOS nor Linux.
pub fn provider() -> Result<Arc<dyn CapabilityProvider>, PlatformError> {
    PlatformManager::instance().provider()
}
