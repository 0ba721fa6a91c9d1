//! Content-based file classification.
//!
//! Extensions are not trusted: the type-probe tool (`file`) looks at the bytes
//! and its description is matched against an ordered rule table.

use keg_errors::{CleanError, Error};
use keg_platform::process::execute_command;
use keg_platform::{CapabilityProvider, PlatformCommand, PlatformContext};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// What the cleaner does with a file depends only on this
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    SharedLibrary,
    Executable,
    Script,
    Other,
}

impl FileCategory {
    /// Permission bits applied once the file has been processed
    #[must_use]
    pub fn final_mode(self) -> u32 {
        match self {
            Self::Executable | Self::Script => 0o555,
            Self::SharedLibrary | Self::Other => 0o444,
        }
    }

    /// Only native executables are stripped; stripping shared libraries breaks
    /// too many of them.
    #[must_use]
    pub fn needs_strip(self) -> bool {
        matches!(self, Self::Executable)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SharedLibrary => "shared_library",
            Self::Executable => "executable",
            Self::Script => "script",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn rules() -> &'static [(Regex, FileCategory)] {
    static RULES: OnceLock<Vec<(Regex, FileCategory)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (
                r"Mach-O .*dynamically linked shared library|ELF .*shared object",
                FileCategory::SharedLibrary,
            ),
            (
                r"Mach-O .*executable|ELF .*executable",
                FileCategory::Executable,
            ),
            (r"script.*text executable", FileCategory::Script),
        ]
        .into_iter()
        .map(|(pattern, category)| {
            (
                Regex::new(pattern).expect("classification rule is valid"),
                category,
            )
        })
        .collect()
    })
}

/// Map a probe description to a category; the first matching rule wins
#[must_use]
pub fn classify_description(description: &str) -> FileCategory {
    rules()
        .iter()
        .find(|(re, _)| re.is_match(description))
        .map_or(FileCategory::Other, |(_, category)| *category)
}

/// Run the type probe on `path` and return its brief description.
///
/// Symlinks are followed (`-L`) and the file name is omitted (`-b`).
async fn probe(
    ctx: &PlatformContext,
    provider: &dyn CapabilityProvider,
    path: &Path,
) -> Result<String, Error> {
    let mut cmd = PlatformCommand::new(provider.type_probe_command()?);
    cmd.args(["-L", "-b"]).arg(path);

    let classification_error = |message: String| CleanError::ClassificationError {
        path: path.display().to_string(),
        message,
    };
    let output = execute_command(ctx, &cmd)
        .await
        .map_err(|e| classification_error(e.to_string()))?;
    if !output.status.success() {
        let stderr = output.stderr_trimmed();
        return Err(classification_error(if stderr.is_empty() {
            format!("{} exited with {}", cmd.display(), output.status)
        } else {
            stderr
        })
        .into());
    }
    Ok(output.stdout_trimmed())
}

/// Classify the file at `path` by its content.
///
/// # Errors
///
/// Returns `UnsupportedCapability` if the platform has no type probe, and
/// `ClassificationError` if the probe cannot be run or exits unsuccessfully.
pub async fn classify(
    ctx: &PlatformContext,
    provider: &dyn CapabilityProvider,
    path: &Path,
) -> Result<FileCategory, Error> {
    let description = probe(ctx, provider, path).await?;
    Ok(classify_description(&description))
}

/// Mach-O architectures recognised in probe output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Ppc7400,
    Ppc64,
    I386,
    X86_64,
    Arm64,
}

impl Arch {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ppc7400 => "ppc7400",
            Self::Ppc64 => "ppc64",
            Self::I386 => "i386",
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Architectures a binary was built for, in probe order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchList(Vec<Arch>);

impl ArchList {
    #[must_use]
    pub fn archs(&self) -> &[Arch] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, arch: Arch) -> bool {
        self.0.contains(&arch)
    }

    /// A universal binary carries both 32- and 64-bit Intel slices
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.contains(Arch::I386) && self.contains(Arch::X86_64)
    }

    /// Drop PowerPC slices
    pub fn remove_ppc(&mut self) {
        self.0.retain(|a| !matches!(a, Arch::Ppc7400 | Arch::Ppc64));
    }

    /// `-arch a -arch b` compiler flags
    #[must_use]
    pub fn as_arch_flags(&self) -> String {
        self.0
            .iter()
            .map(|a| format!("-arch {a}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn arch_rules() -> &'static [(Regex, Arch)] {
    static RULES: OnceLock<Vec<(Regex, Arch)>> = OnceLock::new();
    const KINDS: &str = "(executable|dynamically linked shared library)";
    RULES.get_or_init(|| {
        [
            (format!("Mach-O {KINDS} ppc"), Arch::Ppc7400),
            (format!("Mach-O 64-bit {KINDS} ppc64"), Arch::Ppc64),
            (format!("Mach-O {KINDS} i386"), Arch::I386),
            (format!("Mach-O 64-bit {KINDS} x86_64"), Arch::X86_64),
            (format!("Mach-O 64-bit {KINDS} arm64"), Arch::Arm64),
        ]
        .into_iter()
        .map(|(pattern, arch)| (Regex::new(&pattern).expect("arch rule is valid"), arch))
        .collect()
    })
}

/// Extract architectures from multi-line probe output.
///
/// Each line contributes at most one architecture; repeats are dropped.
#[must_use]
pub fn archs_for_description(description: &str) -> ArchList {
    let mut archs = Vec::new();
    for line in description.lines() {
        let found = arch_rules()
            .iter()
            .find(|(re, _)| re.is_match(line))
            .map(|(_, arch)| *arch);
        if let Some(arch) = found.filter(|a| !archs.contains(a)) {
            archs.push(arch);
        }
    }
    ArchList(archs)
}

/// Probe `path` and report which architectures it contains.
///
/// Universal binaries get one probe line per slice.
///
/// # Errors
///
/// Same as [`classify`].
pub async fn archs_for_binary(
    ctx: &PlatformContext,
    provider: &dyn CapabilityProvider,
    path: &Path,
) -> Result<ArchList, Error> {
    let description = probe(ctx, provider, path).await?;
    Ok(archs_for_description(&description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_libraries() {
        assert_eq!(
            classify_description("Mach-O 64-bit dynamically linked shared library x86_64"),
            FileCategory::SharedLibrary
        );
        assert_eq!(
            classify_description(
                "ELF 64-bit LSB shared object, x86-64, version 1 (SYSV), dynamically linked"
            ),
            FileCategory::SharedLibrary
        );
    }

    #[test]
    fn executables() {
        for desc in [
            "Mach-O executable i386",
            "Mach-O 64-bit executable arm64",
            "ELF 64-bit LSB executable, x86-64, version 1 (SYSV), statically linked",
            "ELF 64-bit LSB pie executable, ARM aarch64, version 1 (SYSV)",
        ] {
            assert_eq!(classify_description(desc), FileCategory::Executable, "{desc}");
        }
    }

    #[test]
    fn scripts_and_others() {
        assert_eq!(
            classify_description("POSIX shell script, ASCII text executable"),
            FileCategory::Script
        );
        assert_eq!(
            classify_description("a /usr/bin/env python3 script, ASCII text executable"),
            FileCategory::Script
        );
        assert_eq!(classify_description("ASCII text"), FileCategory::Other);
        assert_eq!(classify_description("current ar archive"), FileCategory::Other);
        assert_eq!(classify_description(""), FileCategory::Other);
    }

    #[test]
    fn modes_follow_category() {
        assert_eq!(FileCategory::SharedLibrary.final_mode(), 0o444);
        assert_eq!(FileCategory::Executable.final_mode(), 0o555);
        assert_eq!(FileCategory::Script.final_mode(), 0o555);
        assert_eq!(FileCategory::Other.final_mode(), 0o444);
        assert!(FileCategory::Executable.needs_strip());
        assert!(!FileCategory::SharedLibrary.needs_strip());
    }

    #[test]
    fn universal_binary_archs() {
        let output = "\
/usr/local/bin/tool: Mach-O universal binary with 2 architectures
/usr/local/bin/tool (for architecture i386):\tMach-O executable i386
/usr/local/bin/tool (for architecture x86_64):\tMach-O 64-bit executable x86_64";
        let archs = archs_for_description(output);
        assert_eq!(archs.archs(), &[Arch::I386, Arch::X86_64]);
        assert!(archs.is_universal());
        assert_eq!(archs.as_arch_flags(), "-arch i386 -arch x86_64");
    }

    #[test]
    fn ppc_slices_can_be_removed() {
        let output = "\
lib (for architecture ppc7400):\tMach-O dynamically linked shared library ppc
lib (for architecture ppc64):\tMach-O 64-bit dynamically linked shared library ppc64
lib (for architecture x86_64):\tMach-O 64-bit dynamically linked shared library x86_64";
        let mut archs = archs_for_description(output);
        assert_eq!(archs.archs(), &[Arch::Ppc7400, Arch::Ppc64, Arch::X86_64]);
        assert!(!archs.is_universal());
        archs.remove_ppc();
        assert_eq!(archs.archs(), &[Arch::X86_64]);
    }

    #[test]
    fn repeated_slices_are_listed_once() {
        let output = "\
Mach-O universal binary with 2 architectures: [x86_64:Mach-O 64-bit executable x86_64] [arm64]
(for architecture x86_64):\tMach-O 64-bit executable x86_64
(for architecture arm64):\tMach-O 64-bit executable arm64";
        assert_eq!(
            archs_for_description(output).archs(),
            &[Arch::X86_64, Arch::Arm64]
        );
    }

    #[test]
    fn non_macho_has_no_archs() {
        assert!(archs_for_description("ELF 64-bit LSB executable").is_empty());
    }
}
