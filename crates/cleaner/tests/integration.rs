//! Integration tests for the cleaner crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use keg_cleaner::*;
    use keg_config::CleanerConfig;
    use keg_errors::{CleanError, Error, PlatformError};
    use keg_events::{AppEvent, CleanEvent};
    use keg_platform::{CapabilityProvider, PlatformContext, PlatformKind};
    use std::fs;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    const PROBE: &str = r#"#!/bin/sh
for target; do :; done
marker=$(head -n 1 "$target")
case "$marker" in
  FAKEEXE*) echo "Mach-O 64-bit executable x86_64" ;;
  FAKELIB*) echo "Mach-O 64-bit dynamically linked shared library x86_64" ;;
  FAKEBROKEN*) echo "cannot open" >&2; exit 1 ;;
  '#!'*) echo "POSIX shell script, ASCII text executable" ;;
  *) echo "ASCII text" ;;
esac
"#;

    // Like the real tool, in-place stripping replaces the directory entry
    const STRIP: &str = r#"#!/bin/sh
out=""
while [ $# -gt 1 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
target="$1"
if [ -n "$out" ]; then
  printf 'FAKEEXE stripped\n' > "$out"
else
  printf 'FAKEEXE stripped\n' > "$target.strip"
  mv "$target.strip" "$target"
fi
echo "$target" >> "$(dirname "$0")/strip.log"
"#;

    /// Provider whose probe and strip are shell scripts in a temp dir
    #[derive(Debug)]
    struct FakeProvider {
        tools: PathBuf,
        scratch: PathBuf,
        with_probe: bool,
    }

    fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    impl FakeProvider {
        fn new(root: &Path) -> Self {
            let tools = root.join("tools");
            let scratch = root.join("scratch");
            fs::create_dir_all(&tools).unwrap();
            fs::create_dir_all(&scratch).unwrap();
            write_tool(&tools, "file", PROBE);
            write_tool(&tools, "strip", STRIP);
            Self {
                tools,
                scratch,
                with_probe: true,
            }
        }

        fn without_probe(mut self) -> Self {
            self.with_probe = false;
            self
        }

        fn stripped(&self) -> Vec<PathBuf> {
            fs::read_to_string(self.tools.join("strip.log"))
                .unwrap_or_default()
                .lines()
                .map(PathBuf::from)
                .collect()
        }
    }

    #[async_trait]
    impl CapabilityProvider for FakeProvider {
        fn kind(&self) -> PlatformKind {
            PlatformKind::Linux
        }

        fn full_name(&self) -> &'static str {
            "Fake"
        }

        fn strip_command(&self) -> Result<PathBuf, PlatformError> {
            Ok(self.tools.join("strip"))
        }

        fn type_probe_command(&self) -> Result<PathBuf, PlatformError> {
            if self.with_probe {
                Ok(self.tools.join("file"))
            } else {
                Err(self.unsupported(keg_platform::Capability::TypeProbe))
            }
        }

        async fn temp_file_path(
            &self,
            _ctx: &PlatformContext,
            prefix: &str,
        ) -> Result<PathBuf, PlatformError> {
            let failed = |e: &dyn std::fmt::Display| PlatformError::FilesystemOperationFailed {
                operation: "mktemp".to_string(),
                message: e.to_string(),
            };
            let file = tempfile::Builder::new()
                .prefix(prefix)
                .tempfile_in(&self.scratch)
                .map_err(|e| failed(&e))?;
            let (_, path) = file.keep().map_err(|e| failed(&e))?;
            Ok(path)
        }
    }

    struct Fixture {
        _root: TempDir,
        prefix: PathBuf,
        provider: Arc<FakeProvider>,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let prefix = root.path().join("Cellar/tool/1.0");
            fs::create_dir_all(&prefix).unwrap();
            let provider = Arc::new(FakeProvider::new(root.path()));
            Self {
                _root: root,
                prefix,
                provider,
            }
        }

        fn file(&self, rel: &str, contents: &str) -> PathBuf {
            let path = self.prefix.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            path
        }

        fn dir(&self, rel: &str) -> PathBuf {
            let path = self.prefix.join(rel);
            fs::create_dir_all(&path).unwrap();
            path
        }

        fn package(&self) -> InstalledPackage {
            InstalledPackage::new("tool", &self.prefix)
        }

        fn cleaner(&self) -> Cleaner {
            Cleaner::new(self.provider.clone())
        }

        fn scratch_is_empty(&self) -> bool {
            fs::read_dir(&self.provider.scratch).unwrap().next().is_none()
        }
    }

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[tokio::test]
    async fn test_hard_linked_tool_scenario() {
        let fx = Fixture::new();
        let tool = fx.file("bin/tool", "FAKEEXE original with symbols\n");
        let tool2 = fx.prefix.join("bin/tool2");
        fs::hard_link(&tool, &tool2).unwrap();
        let la = fx.file("lib/foo.la", "libtool archive\n");
        let empty = fx.dir("lib/empty");

        let report = fx.cleaner().clean(&fx.package()).await.unwrap();

        // Both names still share one inode and see the stripped bytes
        let a = fs::metadata(&tool).unwrap();
        let b = fs::metadata(&tool2).unwrap();
        assert_eq!(a.ino(), b.ino());
        assert_eq!(a.nlink(), 2);
        assert_eq!(fs::read_to_string(&tool2).unwrap(), "FAKEEXE stripped\n");
        assert_eq!(mode(&tool), 0o555);

        assert!(!la.exists());
        assert!(!empty.exists());
        assert!(!fx.prefix.join("lib").exists());
        assert!(fx.prefix.join("bin").exists());
        assert!(fx.prefix.exists());
        assert!(fx.scratch_is_empty());

        assert_eq!(report.files_inspected, 2);
        assert_eq!(report.binaries_stripped, 2);
        assert_eq!(report.stale_files_removed, 1);
        assert_eq!(report.directories_removed, 2);
    }

    #[tokio::test]
    async fn test_single_link_binary_is_stripped_in_place() {
        let fx = Fixture::new();
        let tool = fx.file("sbin/daemon", "FAKEEXE\n");

        fx.cleaner().clean(&fx.package()).await.unwrap();

        assert_eq!(fs::read_to_string(&tool).unwrap(), "FAKEEXE stripped\n");
        assert_eq!(mode(&tool), 0o555);
        assert_eq!(fx.provider.stripped(), vec![tool]);
    }

    #[tokio::test]
    async fn test_permissions_follow_category() {
        let fx = Fixture::new();
        let lib = fx.file("lib/libfoo.dylib", "FAKELIB\n");
        let script = fx.file("bin/run", "#!/bin/sh\necho hi\n");
        let data = fx.file("lib/data.txt", "plain\n");
        let header = fx.file("include/foo.h", "int foo;\n");
        fs::set_permissions(&header, fs::Permissions::from_mode(0o640)).unwrap();

        let report = fx.cleaner().clean(&fx.package()).await.unwrap();

        assert_eq!(mode(&lib), 0o444);
        assert_eq!(mode(&script), 0o555);
        assert_eq!(mode(&data), 0o444);
        // Outside the watched directories nothing changes
        assert_eq!(mode(&header), 0o640);
        assert_eq!(report.binaries_stripped, 0);
        assert!(fx.provider.stripped().is_empty());
        assert_eq!(fs::read_to_string(&lib).unwrap(), "FAKELIB\n");
    }

    #[tokio::test]
    async fn test_clean_is_idempotent() {
        let fx = Fixture::new();
        let tool = fx.file("bin/tool", "FAKEEXE\n");
        let lib = fx.file("lib/libfoo.so", "FAKELIB\n");
        fx.file("lib/foo.la", "x\n");
        fx.dir("lib/empty/deeper");
        fx.file("share/info/dir", "info\n");

        let cleaner = fx.cleaner();
        let first = cleaner.clean(&fx.package()).await.unwrap();
        assert!(first.info_removed);

        let second = cleaner.clean(&fx.package()).await.unwrap();
        assert_eq!(second.stale_files_removed, 0);
        assert_eq!(second.directories_removed, 0);
        assert!(!second.info_removed);

        assert_eq!(fs::read_to_string(&tool).unwrap(), "FAKEEXE stripped\n");
        assert_eq!(mode(&tool), 0o555);
        assert_eq!(mode(&lib), 0o444);
        assert!(!fx.prefix.join("share").exists());
    }

    #[tokio::test]
    async fn test_protected_paths_are_untouched() {
        let fx = Fixture::new();
        let kept_exe = fx.file("bin/keep", "FAKEEXE\n");
        fs::set_permissions(&kept_exe, fs::Permissions::from_mode(0o700)).unwrap();
        let kept_la = fx.file("lib/keep.la", "x\n");
        let kept_dir = fx.dir("lib/keepdir");
        let private = fx.file("lib/private/inner", "FAKEEXE\n");
        fs::set_permissions(&private, fs::Permissions::from_mode(0o700)).unwrap();
        let stripped = fx.file("bin/other", "FAKEEXE\n");

        let protected: ProtectedPaths = ["bin/keep", "lib/keep.la", "lib/keepdir", "lib/private"]
            .into_iter()
            .collect();
        let package = fx.package().with_protection(protected);

        fx.cleaner().clean(&package).await.unwrap();

        assert_eq!(fs::read_to_string(&kept_exe).unwrap(), "FAKEEXE\n");
        assert_eq!(mode(&kept_exe), 0o700);
        assert!(kept_la.exists());
        assert!(kept_dir.exists());
        assert_eq!(mode(&private), 0o700);
        assert_eq!(fs::read_to_string(&private).unwrap(), "FAKEEXE\n");
        assert_eq!(fx.provider.stripped(), vec![stripped]);
    }

    #[tokio::test]
    async fn test_protect_everything_leaves_tree_alone() {
        let fx = Fixture::new();
        let tool = fx.file("bin/tool", "FAKEEXE\n");
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let la = fx.file("lib/foo.la", "x\n");
        let empty = fx.dir("lib/empty");
        let info = fx.file("share/info/dir", "info\n");

        let package = fx.package().with_protection(ProtectedPaths::all());
        let report = fx.cleaner().clean(&package).await.unwrap();

        assert_eq!(report, CleanReport::default());
        assert_eq!(mode(&tool), 0o755);
        assert!(la.exists());
        assert!(empty.exists());
        assert!(info.exists());
    }

    #[tokio::test]
    async fn test_empty_directories_pruned_deepest_first() {
        let fx = Fixture::new();
        fx.dir("a/b/c/d");
        fx.dir("lib/x/y");
        fx.file("share/doc/README", "docs\n");

        let report = fx.cleaner().clean(&fx.package()).await.unwrap();

        assert_eq!(report.directories_removed, 7);
        assert!(!fx.prefix.join("a").exists());
        assert!(!fx.prefix.join("lib").exists());
        assert!(fx.prefix.join("share/doc/README").exists());
        assert!(fx.prefix.exists());
    }

    #[tokio::test]
    async fn test_info_directory_handling() {
        let fx = Fixture::new();
        let info = fx.file("share/info/tool.info", "info\n");

        let keep = CleanerConfig {
            keep_info: true,
            ..CleanerConfig::default()
        };
        let report = fx
            .cleaner()
            .with_config(keep)
            .clean(&fx.package())
            .await
            .unwrap();
        assert!(!report.info_removed);
        assert!(info.exists());

        let report = fx.cleaner().clean(&fx.package()).await.unwrap();
        assert!(report.info_removed);
        assert!(!fx.prefix.join("share").exists());
    }

    #[tokio::test]
    async fn test_symlinks_are_left_alone() {
        let fx = Fixture::new();
        let tool = fx.file("bin/tool", "FAKEEXE\n");
        let link = fx.prefix.join("bin/alias");
        std::os::unix::fs::symlink("tool", &link).unwrap();
        std::os::unix::fs::symlink("missing", fx.prefix.join("bin/dangling")).unwrap();

        let report = fx.cleaner().clean(&fx.package()).await.unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(fs::symlink_metadata(fx.prefix.join("bin/dangling")).is_ok());
        assert_eq!(report.files_inspected, 1);
        assert_eq!(fx.provider.stripped(), vec![tool]);
    }

    #[tokio::test]
    async fn test_unclassifiable_files() {
        let fx = Fixture::new();
        let odd = fx.file("lib/odd", "FAKEBROKEN\n");

        let err = fx.cleaner().clean(&fx.package()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Clean(CleanError::ClassificationError { ref path, .. }) if path.ends_with("lib/odd")
        ));

        let skip = CleanerConfig {
            skip_unclassifiable: true,
            ..CleanerConfig::default()
        };
        let report = fx
            .cleaner()
            .with_config(skip)
            .clean(&fx.package())
            .await
            .unwrap();
        assert_eq!(report.files_skipped, 1);
        assert!(odd.exists());
    }

    #[tokio::test]
    async fn test_missing_capability_fails_loudly() {
        let root = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::new(root.path()).without_probe());
        let prefix = root.path().join("prefix");
        fs::create_dir_all(prefix.join("bin")).unwrap();
        fs::write(prefix.join("bin/tool"), "FAKEEXE\n").unwrap();

        let err = Cleaner::new(provider)
            .clean(&InstalledPackage::new("tool", &prefix))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::UnsupportedCapability { ref capability, ref platform })
                if capability == "file" && platform == "Fake"
        ));
    }

    #[tokio::test]
    async fn test_missing_prefix_is_nothing_to_clean() {
        let fx = Fixture::new();
        let package = InstalledPackage::new("ghost", fx.prefix.join("absent"));
        let report = fx.cleaner().clean(&package).await.unwrap();
        assert_eq!(report, CleanReport::default());
    }

    #[tokio::test]
    async fn test_unsupported_platform_is_reported() {
        let err = PlatformKind::from_os_name("plan9").unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedPlatform { ref os } if os == "plan9"));
    }

    #[tokio::test]
    async fn test_unsupported_platform_touches_nothing() {
        let fx = Fixture::new();
        let tool = fx.file("bin/tool", "FAKEEXE\n");
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o700)).unwrap();
        let la = fx.file("lib/foo.la", "x\n");
        let empty = fx.dir("lib/empty");

        let err = Cleaner::for_os("FreeBSD").unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::UnsupportedPlatform { ref os }) if os == "FreeBSD"
        ));

        assert_eq!(mode(&tool), 0o700);
        assert!(la.exists());
        assert!(empty.exists());
        assert!(Cleaner::for_os("Darwin").is_ok());
        assert!(Cleaner::for_os("Linux").is_ok());
    }

    #[tokio::test]
    async fn test_protected_watched_directory_is_not_descended() {
        let fx = Fixture::new();
        let tool = fx.file("bin/tool", "FAKEEXE\n");
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o700)).unwrap();
        let la = fx.file("bin/foo.la", "x\n");
        let lib = fx.file("lib/libfoo.so", "FAKELIB\n");

        let package = fx
            .package()
            .with_protection(ProtectedPaths::new().with("bin"));
        let report = fx.cleaner().clean(&package).await.unwrap();

        assert_eq!(mode(&tool), 0o700);
        assert_eq!(fs::read_to_string(&tool).unwrap(), "FAKEEXE\n");
        assert!(la.exists());
        assert!(fx.provider.stripped().is_empty());
        assert_eq!(mode(&lib), 0o444);
        assert_eq!(report.files_inspected, 1);
    }

    #[tokio::test]
    async fn test_symlinked_watched_directory_is_not_followed() {
        let fx = Fixture::new();
        let outside = fx._root.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let victim = outside.join("data.txt");
        fs::write(&victim, "plain\n").unwrap();
        fs::set_permissions(&victim, fs::Permissions::from_mode(0o644)).unwrap();
        let exe = outside.join("tool");
        fs::write(&exe, "FAKEEXE\n").unwrap();
        fs::write(outside.join("old.la"), "x\n").unwrap();
        std::os::unix::fs::symlink(&outside, fx.prefix.join("lib")).unwrap();

        let report = fx.cleaner().clean(&fx.package()).await.unwrap();

        assert_eq!(report.files_inspected, 0);
        assert_eq!(mode(&victim), 0o644);
        assert_eq!(fs::read_to_string(&exe).unwrap(), "FAKEEXE\n");
        assert!(outside.join("old.la").exists());
        assert!(fs::symlink_metadata(fx.prefix.join("lib")).is_ok());
    }

    #[tokio::test]
    async fn test_info_under_protected_share_is_kept() {
        let fx = Fixture::new();
        let info = fx.file("share/info/tool.info", "info\n");

        let package = fx
            .package()
            .with_protection(ProtectedPaths::new().with("share"));
        let report = fx.cleaner().clean(&package).await.unwrap();

        assert!(!report.info_removed);
        assert!(info.exists());
    }

    #[tokio::test]
    async fn test_info_keeps_protected_entries() {
        let fx = Fixture::new();
        let kept = fx.file("share/info/keep.info", "keep\n");
        let dropped = fx.file("share/info/drop.info", "drop\n");
        let nested = fx.file("share/info/sub/other.info", "other\n");

        let package = fx
            .package()
            .with_protection(ProtectedPaths::new().with("share/info/keep.info"));
        let report = fx.cleaner().clean(&package).await.unwrap();

        assert!(!report.info_removed);
        assert!(kept.exists());
        assert!(!dropped.exists());
        assert!(!nested.exists());
        assert!(!fx.prefix.join("share/info/sub").exists());
    }

    #[tokio::test]
    async fn test_events_describe_the_clean() {
        let fx = Fixture::new();
        fx.file("bin/tool", "FAKEEXE\n");
        fx.dir("lib/empty");

        let (tx, mut rx) = keg_events::channel();
        fx.cleaner()
            .with_event_sender(tx)
            .clean(&fx.package())
            .await
            .unwrap();

        let mut clean_events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Clean(e) = event {
                clean_events.push(e);
            }
        }

        assert!(matches!(clean_events.first(), Some(CleanEvent::Started { .. })));
        assert!(matches!(
            clean_events.last(),
            Some(CleanEvent::Completed { binaries_stripped: 1, .. })
        ));
        assert!(clean_events
            .iter()
            .any(|e| matches!(e, CleanEvent::BinaryStripped { hard_links: 1, .. })));
        assert!(clean_events.iter().any(|e| matches!(
            e,
            CleanEvent::PermissionsSet { mode: 0o555, .. }
        )));
        assert!(clean_events
            .iter()
            .any(|e| matches!(e, CleanEvent::DirectoryPruned { path } if path.ends_with("lib/empty"))));
    }

    #[tokio::test]
    async fn test_archs_for_binary_uses_probe() {
        let fx = Fixture::new();
        let tool = fx.file("bin/tool", "FAKEEXE\n");
        let ctx = PlatformContext::default();

        let archs = archs_for_binary(&ctx, fx.provider.as_ref(), &tool)
            .await
            .unwrap();
        assert_eq!(archs.archs(), &[Arch::X86_64]);
        assert!(!archs.is_universal());

        let category = classify(&ctx, fx.provider.as_ref(), &tool).await.unwrap();
        assert_eq!(category, FileCategory::Executable);
    }
}
