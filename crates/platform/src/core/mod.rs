//! Core platform abstractions and context management

use keg_errors::PlatformError;
use keg_events::{EventEmitter, EventSender};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// The closed set of hosts keg knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    MacOS,
    Linux,
}

impl PlatformKind {
    /// Map an OS name (`uname -s` output or `std::env::consts::OS`) to a kind.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` when the name matches neither known platform.
    pub fn from_os_name(name: &str) -> Result<Self, PlatformError> {
        let raw = name.trim().to_ascii_lowercase();
        if raw.contains("darwin") || raw == "macos" {
            Ok(Self::MacOS)
        } else if raw.contains("linux") {
            Ok(Self::Linux)
        } else {
            Err(PlatformError::UnsupportedPlatform { os: raw })
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MacOS => "macos",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static DETECTED: OnceLock<Result<PlatformKind, PlatformError>> = OnceLock::new();

/// Detect the running platform. The answer is computed once and cached.
///
/// # Errors
///
/// Returns `UnsupportedPlatform` on hosts other than macOS and Linux.
pub fn detect_platform() -> Result<PlatformKind, PlatformError> {
    DETECTED
        .get_or_init(|| PlatformKind::from_os_name(std::env::consts::OS))
        .clone()
}

/// A `major.minor.patch` operating system version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl OsVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the first `major.minor[.patch]` group out of a raw version string.
    ///
    /// Accepts `sw_vers -productVersion` output (`10.6.8`, `14.5`) as well as
    /// kernel releases (`6.8.0-45-generic`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidVersion` if no dotted version can be found.
    pub fn parse(raw: &str) -> Result<Self, PlatformError> {
        static VERSION_RE: OnceLock<Regex> = OnceLock::new();
        let re = VERSION_RE.get_or_init(|| {
            Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("version regex is valid")
        });

        let invalid = || PlatformError::InvalidVersion {
            raw: raw.trim().to_string(),
        };
        let caps = re.captures(raw).ok_or_else(invalid)?;
        let number = |idx: usize| -> Result<u32, PlatformError> {
            caps.get(idx)
                .map_or(Ok(0), |m| m.as_str().parse().map_err(|_| invalid()))
        };

        Ok(Self::new(number(1)?, number(2)?, number(3)?))
    }

    /// True when this version is `major.minor` or newer
    #[must_use]
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Context for platform operations, providing event emission and metadata tracking
#[derive(Debug, Clone, Default)]
pub struct PlatformContext {
    event_sender: Option<EventSender>,
    operation_metadata: HashMap<String, String>,
}

impl PlatformContext {
    /// Create a new platform context with event emission capabilities
    #[must_use]
    pub fn new(event_sender: Option<EventSender>) -> Self {
        Self {
            event_sender,
            operation_metadata: HashMap::new(),
        }
    }

    /// Create a context tagged with the package being cleaned
    #[must_use]
    pub fn with_package(event_sender: Option<EventSender>, package_name: &str) -> Self {
        let mut ctx = Self::new(event_sender);
        ctx.add_metadata("package_name", package_name);
        ctx
    }

    /// Get package name if available
    #[must_use]
    pub fn package_name(&self) -> Option<&str> {
        self.operation_metadata.get("package_name").map(String::as_str)
    }

    /// Add custom metadata to the context
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.operation_metadata.insert(key.into(), value.into());
    }

    /// Get all metadata
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.operation_metadata
    }
}

impl EventEmitter for PlatformContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_names_map_to_kinds() {
        assert_eq!(PlatformKind::from_os_name("Darwin\n").unwrap(), PlatformKind::MacOS);
        assert_eq!(PlatformKind::from_os_name("macos").unwrap(), PlatformKind::MacOS);
        assert_eq!(PlatformKind::from_os_name("Linux").unwrap(), PlatformKind::Linux);
    }

    #[test]
    fn unknown_os_is_unsupported() {
        let err = PlatformKind::from_os_name("FreeBSD").unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedPlatform { os } if os == "freebsd"));
    }

    #[test]
    fn detection_is_stable() {
        let first = detect_platform();
        let second = detect_platform();
        assert_eq!(first.is_ok(), second.is_ok());
        if let (Ok(a), Ok(b)) = (first, second) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn versions_parse() {
        assert_eq!(OsVersion::parse("10.6.8\n").unwrap(), OsVersion::new(10, 6, 8));
        assert_eq!(OsVersion::parse("14.5").unwrap(), OsVersion::new(14, 5, 0));
        assert_eq!(
            OsVersion::parse("6.8.0-45-generic").unwrap(),
            OsVersion::new(6, 8, 0)
        );
        assert!(OsVersion::parse("unknown").is_err());
    }

    #[test]
    fn version_ordering() {
        let leopard = OsVersion::new(10, 5, 8);
        assert!(!leopard.at_least(10, 6));
        assert!(OsVersion::new(10, 6, 0).at_least(10, 6));
        assert!(OsVersion::new(11, 0, 0).at_least(10, 6));
    }

    #[test]
    fn context_metadata() {
        let ctx = PlatformContext::with_package(None, "tool");
        assert_eq!(ctx.package_name(), Some("tool"));
    }
}
