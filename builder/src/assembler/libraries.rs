//! Static library collection.
//!
//! Windows and macOS leave finished libraries in one flat directory, so they
//! are copied as-is (and stripped of local symbols on macOS). Linux spreads
//! archives over `obj.target`, often as GNU thin archives whose members are
//! references into the build tree; those are rewritten member-wise into
//! regular archives under `lib/`. Archives sharing a file name accumulate
//! into one destination.

use super::{AssemblyLayout, OutputArtifact};
use crate::error::{BuilderError, Result};
use crate::exec::{CommandExecutor, CommandSpec, absolute_dir, run_checked};
use crate::scan::{Artifact, ArtifactClass, DirectoryScan, ScanMode, classify_library};
use crate::target::HostOs;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io::Read;

/// Magic bytes opening a GNU thin archive.
pub const THIN_ARCHIVE_MAGIC: &[u8; 8] = b"!<thin>\n";

/// Upper bound on member paths passed to a single `ar rs`.
const MEMBERS_PER_INSERT: usize = 256;

/// Storage format of a static archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Members are references to object files on disk.
    Thin,
    /// Members are stored inside the archive.
    Regular,
}

/// Determine whether `path` is a thin or regular archive.
///
/// # Errors
///
/// Returns [`BuilderError::AssemblyFailure`] if the file cannot be read.
pub fn archive_kind(path: &Utf8Path) -> Result<ArchiveKind> {
    let mut magic = Vec::with_capacity(THIN_ARCHIVE_MAGIC.len());
    fs::File::open(path)
        .and_then(|file| file.take(8).read_to_end(&mut magic))
        .map_err(|e| BuilderError::assembly("read", path, e))?;
    if magic.as_slice() == THIN_ARCHIVE_MAGIC {
        Ok(ArchiveKind::Thin)
    } else {
        Ok(ArchiveKind::Regular)
    }
}

/// Collect the platform's static libraries into the layout's `lib/`.
///
/// Returns one [`OutputArtifact::MergedLibrary`] per distinct destination,
/// in scan order.
///
/// # Errors
///
/// Returns [`BuilderError::AssemblyFailure`] on filesystem errors and
/// [`BuilderError::ToolchainFailure`] when `ar` or `strip` fails.
pub fn collect(
    executor: &dyn CommandExecutor,
    host_os: HostOs,
    layout: &AssemblyLayout,
) -> Result<Vec<OutputArtifact>> {
    let release = layout.release_dir();
    let extension = host_os.static_lib_extension();
    match host_os {
        HostOs::Windows => {
            let scan = DirectoryScan::new(release.join("lib"), ScanMode::Flat, extension);
            copy_all(executor, &relevant(&scan)?, layout, false)
        }
        HostOs::Darwin => {
            let scan = DirectoryScan::new(release, ScanMode::Flat, extension);
            copy_all(executor, &relevant(&scan)?, layout, true)
        }
        HostOs::Linux => {
            let scan = DirectoryScan::new(release.join("obj.target"), ScanMode::Recursive, extension);
            merge_all(executor, &relevant(&scan)?, layout)
        }
    }
}

/// Scan and keep only libraries that pass the exclusion filter.
fn relevant(scan: &DirectoryScan) -> Result<Vec<Artifact>> {
    let artifacts = scan.classify(classify_library)?;
    for excluded in artifacts
        .iter()
        .filter(|a| a.class == ArtifactClass::ExcludedStaticLib)
    {
        debug!("skipping {}", excluded.path);
    }
    Ok(artifacts
        .into_iter()
        .filter(|a| a.class == ArtifactClass::RelevantStaticLib)
        .collect())
}

fn copy_all(
    executor: &dyn CommandExecutor,
    libraries: &[Artifact],
    layout: &AssemblyLayout,
    strip: bool,
) -> Result<Vec<OutputArtifact>> {
    libraries
        .iter()
        .map(|library| {
            let dest = destination_for(layout, &library.path);
            info!("copying {}", library.file_name());
            fs::copy(&library.path, &dest)
                .map_err(|e| BuilderError::assembly("copy", library.path.clone(), e))?;
            if strip {
                info!("stripping {}", library.file_name());
                run_checked(executor, &CommandSpec::new("strip").arg("-x").arg(dest.as_str()))?;
            }
            Ok(OutputArtifact::MergedLibrary(dest))
        })
        .collect()
}

fn merge_all(
    executor: &dyn CommandExecutor,
    libraries: &[Artifact],
    layout: &AssemblyLayout,
) -> Result<Vec<OutputArtifact>> {
    let mut outputs: Vec<OutputArtifact> = Vec::new();
    for library in libraries {
        let dest = destination_for(layout, &library.path);
        info!("merging {} into {}", library.path, dest);
        merge_archive(executor, &library.path, &dest)?;

        let artifact = OutputArtifact::MergedLibrary(dest);
        if !outputs.contains(&artifact) {
            outputs.push(artifact);
        }
    }
    Ok(outputs)
}

/// Insert every member of `source` into `dest`, creating `dest` if needed.
///
/// Both paths are made absolute before `ar` runs elsewhere. Thin archive
/// members are listed and inserted from the archive's own directory, which
/// their recorded paths are relative to. Regular archives are first
/// extracted into a scratch directory. When two members share a name the
/// later insertion replaces the earlier one.
///
/// # Errors
///
/// Returns [`BuilderError::ToolchainFailure`] if `ar` fails, or
/// [`BuilderError::AssemblyFailure`] if the scratch directory cannot be
/// created.
pub fn merge_archive(
    executor: &dyn CommandExecutor,
    source: &Utf8Path,
    dest: &Utf8Path,
) -> Result<()> {
    let source = &absolute_dir(source)?;
    let dest = &absolute_dir(dest)?;
    match archive_kind(source)? {
        ArchiveKind::Thin => {
            let archive_dir = source.parent().unwrap_or(Utf8Path::new("/"));
            let members = list_members(executor, source, archive_dir)?;
            insert_members(executor, dest, &members, archive_dir)
        }
        ArchiveKind::Regular => {
            let scratch = tempfile::Builder::new()
                .prefix("libnode-merge-")
                .tempdir()
                .map_err(|e| BuilderError::assembly("create scratch directory for", source, e))?;
            let scratch_dir = Utf8Path::from_path(scratch.path()).ok_or_else(|| {
                BuilderError::assembly(
                    "use scratch directory for",
                    source,
                    std::io::Error::new(std::io::ErrorKind::InvalidData, "path is not UTF-8"),
                )
            })?;

            run_checked(
                executor,
                &CommandSpec::new("ar")
                    .arg("x")
                    .arg(source.as_str())
                    .current_dir(scratch_dir),
            )?;
            let members = list_members(executor, source, scratch_dir)?;
            insert_members(executor, dest, &members, scratch_dir)
        }
    }
}

fn list_members(
    executor: &dyn CommandExecutor,
    source: &Utf8Path,
    cwd: &Utf8Path,
) -> Result<Vec<String>> {
    let output = run_checked(
        executor,
        &CommandSpec::new("ar")
            .arg("t")
            .arg(source.as_str())
            .current_dir(cwd),
    )?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

fn insert_members(
    executor: &dyn CommandExecutor,
    dest: &Utf8Path,
    members: &[String],
    cwd: &Utf8Path,
) -> Result<()> {
    for batch in members.chunks(MEMBERS_PER_INSERT) {
        run_checked(
            executor,
            &CommandSpec::new("ar")
                .arg("rs")
                .arg(dest.as_str())
                .args(batch.iter().cloned())
                .current_dir(cwd),
        )?;
    }
    Ok(())
}

/// Return the destination path a library would be collected to.
#[must_use]
pub fn destination_for(layout: &AssemblyLayout, library: &Utf8Path) -> Utf8PathBuf {
    layout
        .lib_dir()
        .join(library.file_name().unwrap_or(library.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingExecutor;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        layout: AssemblyLayout,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let layout = AssemblyLayout::new(&root, "node-v20.0.0", Utf8Path::new("embedding.h"));
        fs::create_dir_all(layout.lib_dir()).expect("mkdir lib");
        Workspace { _dir: dir, layout }
    }

    fn write(path: &Utf8Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, contents).expect("write");
    }

    fn thin(path: &Utf8Path) {
        write(path, b"!<thin>\n/\n");
    }

    fn regular(path: &Utf8Path) {
        write(path, b"!<arch>\n/\n");
    }

    fn first_arg(command: &CommandSpec) -> &str {
        command.arguments().first().map_or("", String::as_str)
    }

    #[rstest]
    fn detects_thin_and_regular_archives(workspace: Workspace) {
        let root = &workspace.layout.workdir;
        thin(&root.join("thin.a"));
        regular(&root.join("regular.a"));
        write(&root.join("short.a"), b"!<");

        assert_eq!(archive_kind(&root.join("thin.a")).expect("read"), ArchiveKind::Thin);
        assert_eq!(archive_kind(&root.join("regular.a")).expect("read"), ArchiveKind::Regular);
        assert_eq!(archive_kind(&root.join("short.a")).expect("read"), ArchiveKind::Regular);
    }

    #[rstest]
    fn missing_archive_is_an_assembly_failure(workspace: Workspace) {
        let err = archive_kind(&workspace.layout.workdir.join("absent.a")).expect_err("missing");
        assert!(matches!(err, BuilderError::AssemblyFailure { operation: "read", .. }));
    }

    #[rstest]
    fn windows_copies_without_stripping(workspace: Workspace) {
        let lib = workspace.layout.release_dir().join("lib");
        write(&lib.join("node.lib"), b"node");
        write(&lib.join("gtest.lib"), b"gtest");
        write(&lib.join("v8_init.lib"), b"init");
        let executor = RecordingExecutor::succeeding();

        let outputs = collect(&executor, HostOs::Windows, &workspace.layout).expect("collect");

        let dest = workspace.layout.lib_dir().join("node.lib");
        assert_eq!(outputs, [OutputArtifact::MergedLibrary(dest.clone())]);
        assert_eq!(fs::read(dest).expect("copied"), b"node");
        assert!(executor.calls().is_empty());
    }

    #[rstest]
    fn darwin_copies_then_strips_each_library(workspace: Workspace) {
        let release = workspace.layout.release_dir();
        write(&release.join("libnode.a"), b"node");
        write(&release.join("libuv.a"), b"uv");
        write(&release.join("libicutools.a"), b"tools");
        write(&release.join("nested/libhidden.a"), b"deep");
        let executor = RecordingExecutor::succeeding();

        let outputs = collect(&executor, HostOs::Darwin, &workspace.layout).expect("collect");

        assert_eq!(outputs.len(), 2);
        let stripped: Vec<String> = executor
            .calls_to("strip")
            .iter()
            .map(|c| c.arguments().join(" "))
            .collect();
        let lib_dir = workspace.layout.lib_dir();
        assert_eq!(
            stripped,
            [
                format!("-x {}", lib_dir.join("libnode.a")),
                format!("-x {}", lib_dir.join("libuv.a")),
            ]
        );
        assert!(!lib_dir.join("libhidden.a").exists());
    }

    #[rstest]
    fn linux_merges_same_named_archives_into_one_destination(workspace: Workspace) {
        let obj = workspace.layout.release_dir().join("obj.target");
        thin(&obj.join("deps/v8/libv8_base.a"));
        thin(&obj.join("tools/v8_gypfiles/libv8_base.a"));
        thin(&obj.join("deps/googletest/libgtest.a"));
        let executor = RecordingExecutor::succeeding().with_archive_listing("a.o\nb.o\n");

        let outputs = collect(&executor, HostOs::Linux, &workspace.layout).expect("collect");

        let dest = workspace.layout.lib_dir().join("libv8_base.a");
        assert_eq!(outputs, [OutputArtifact::MergedLibrary(dest.clone())]);

        let inserts = executor
            .calls()
            .into_iter()
            .filter(|c| first_arg(c) == "rs")
            .collect::<Vec<_>>();
        assert_eq!(inserts.len(), 2, "one insert per source archive");
        for insert in &inserts {
            assert_eq!(insert.arguments()[1], dest.as_str());
            assert_eq!(&insert.arguments()[2..], ["a.o", "b.o"]);
        }
        let dirs: Vec<Option<&Utf8Path>> = inserts.iter().map(CommandSpec::working_dir).collect();
        assert_eq!(
            dirs,
            [
                Some(obj.join("deps/v8").as_path()),
                Some(obj.join("tools/v8_gypfiles").as_path()),
            ]
        );
        assert!(executor.calls().iter().all(|c| !c.arguments().iter().any(|a| a.contains("gtest"))));
    }

    #[rstest]
    fn regular_archive_is_extracted_before_insertion(workspace: Workspace) {
        let source = workspace.layout.workdir.join("libzlib.a");
        regular(&source);
        let dest = workspace.layout.lib_dir().join("libzlib.a");
        let executor = RecordingExecutor::succeeding().with_archive_listing("inflate.o\n");

        merge_archive(&executor, &source, &dest).expect("merge");

        let calls = executor.calls();
        let ops: Vec<&str> = calls.iter().map(first_arg).collect();
        assert_eq!(ops, ["x", "t", "rs"]);
        let scratch = calls[0].working_dir().expect("extract runs in scratch dir");
        assert_ne!(scratch, workspace.layout.workdir.as_path());
        assert_eq!(calls[2].working_dir(), Some(scratch));
        assert_eq!(calls[2].arguments(), ["rs", dest.as_str(), "inflate.o"]);
    }

    #[test]
    fn relative_paths_reach_ar_as_absolute_paths() {
        let dir = tempfile::Builder::new()
            .prefix("relative-merge-")
            .tempdir_in(".")
            .expect("temp dir in cwd");
        let root = Utf8Path::new(dir.path().file_name().and_then(|n| n.to_str()).expect("utf-8"));
        let source = root.join("obj.target/deps/uv/libuv.a");
        let dest = root.join("libnode/lib/libuv.a");
        thin(&source);
        let executor = RecordingExecutor::succeeding().with_archive_listing("uv-common.o\n");

        merge_archive(&executor, &source, &dest).expect("merge");

        let calls = executor.calls();
        let ops: Vec<&str> = calls.iter().map(first_arg).collect();
        assert_eq!(ops, ["t", "rs"]);
        let archive_dir = calls[0].working_dir().expect("listing runs beside the archive");
        assert!(archive_dir.is_absolute());
        assert!(archive_dir.ends_with("obj.target/deps/uv"));
        for call in &calls {
            assert!(Utf8Path::new(&call.arguments()[1]).is_absolute(), "{call}");
        }
        assert!(calls[1].arguments()[1].ends_with("libnode/lib/libuv.a"));
    }

    #[rstest]
    fn large_member_lists_are_batched(workspace: Workspace) {
        let source = workspace.layout.workdir.join("libv8.a");
        thin(&source);
        let listing: String = (0..600).map(|i| format!("obj{i}.o\n")).collect();
        let executor = RecordingExecutor::succeeding().with_archive_listing(&listing);

        merge_archive(&executor, &source, &workspace.layout.lib_dir().join("libv8.a"))
            .expect("merge");

        let sizes: Vec<usize> = executor
            .calls()
            .iter()
            .filter(|c| first_arg(c) == "rs")
            .map(|c| c.arguments().len() - 2)
            .collect();
        assert_eq!(sizes, [256, 256, 88]);
    }

    #[rstest]
    fn empty_archive_inserts_nothing(workspace: Workspace) {
        let source = workspace.layout.workdir.join("libempty.a");
        thin(&source);
        let executor = RecordingExecutor::succeeding();

        merge_archive(&executor, &source, &workspace.layout.lib_dir().join("libempty.a"))
            .expect("merge");

        assert_eq!(executor.calls().len(), 1);
    }

    #[rstest]
    fn failing_ar_aborts_the_merge(workspace: Workspace) {
        let obj = workspace.layout.release_dir().join("obj.target");
        thin(&obj.join("libnode.a"));
        let executor = RecordingExecutor::failing_on("ar");

        let err = collect(&executor, HostOs::Linux, &workspace.layout).expect_err("ar fails");
        assert!(matches!(err, BuilderError::ToolchainFailure { ref tool, .. } if tool == "ar"));
        assert_eq!(executor.calls().len(), 1);
    }

    #[rstest]
    fn empty_build_tree_collects_nothing(workspace: Workspace) {
        let executor = RecordingExecutor::succeeding();
        for os in HostOs::ALL {
            let outputs = collect(&executor, os, &workspace.layout).expect("collect");
            assert!(outputs.is_empty());
        }
    }

    #[test]
    fn destination_uses_the_file_name() {
        let layout = AssemblyLayout::new(Utf8Path::new("/work"), "node-v20.0.0", Utf8Path::new("h.h"));
        assert_eq!(
            destination_for(&layout, Utf8Path::new("/x/obj.target/deps/libuv.a")),
            Utf8Path::new("/work/libnode/lib/libuv.a")
        );
    }

    /// Exercises the real `ar` when available, checking that merging two
    /// thin archives with the same name yields the union of their members.
    #[cfg(target_os = "linux")]
    #[rstest]
    fn real_ar_merge_yields_member_union(workspace: Workspace) {
        use crate::exec::SystemCommandExecutor;

        let ar_available = std::process::Command::new("ar")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success());
        if !ar_available {
            return;
        }

        let root = workspace.layout.workdir.clone();
        let executor = SystemCommandExecutor;
        for (dir, member) in [("one", "alpha.o"), ("two", "beta.o")] {
            let archive_dir = root.join(dir);
            write(&archive_dir.join(member), member.as_bytes());
            run_checked(
                &executor,
                &CommandSpec::new("ar")
                    .args(["crT", "libsame.a", member])
                    .current_dir(archive_dir),
            )
            .expect("create thin archive");
        }

        let dest = workspace.layout.lib_dir().join("libsame.a");
        for dir in ["one", "two"] {
            merge_archive(&executor, &root.join(dir).join("libsame.a"), &dest).expect("merge");
        }

        assert_eq!(archive_kind(&dest).expect("read"), ArchiveKind::Regular);
        let listing = run_checked(&executor, &CommandSpec::new("ar").arg("t").arg(dest.as_str()))
            .expect("list");
        let mut members: Vec<String> = String::from_utf8_lossy(&listing.stdout)
            .lines()
            .filter_map(|line| Utf8Path::new(line.trim()).file_name().map(str::to_owned))
            .collect();
        members.sort_unstable();
        assert_eq!(members, ["alpha.o", "beta.o"]);
    }
}
