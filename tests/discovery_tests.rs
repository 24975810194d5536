//! Integration tests for project discovery, root resolution and sampling

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use firmcheck::discovery::policy::{ExclusionPolicy, ExclusionRule};
use firmcheck::discovery::registry::{FsPlatformRegistry, InstalledPlatform, PlatformRegistry, RegistryError};
use firmcheck::discovery::{DiscoveryError, RootOrigin, RootSet, build_matrix, discover_candidates, resolve_roots};
use firmcheck_core::SampleCap;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Create `rel` under `root` with a manifest (and optionally a skip marker).
fn project(root: &Path, rel: &str, skip: bool) -> PathBuf {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("platformio.ini"), "[env:uno]\nplatform = atmelavr\n").unwrap();
    if skip {
        fs::write(dir.join(".skiptest"), "").unwrap();
    }
    dir
}

struct StaticRegistry(Vec<InstalledPlatform>);

impl PlatformRegistry for StaticRegistry {
    fn installed(&self) -> Result<Vec<InstalledPlatform>, RegistryError> {
        Ok(self.0.clone())
    }
}

fn platform(package_dir: &Path, name: &str, embedded: bool) -> InstalledPlatform {
    InstalledPlatform {
        name: name.to_string(),
        package_dir: package_dir.to_path_buf(),
        embedded,
    }
}

mod candidates {
    use super::*;

    #[test]
    fn test_only_manifest_dirs_without_marker_qualify() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let blink = project(root, "blink", false);
        project(root, "skipped", true);
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/README.md"), "no manifest here").unwrap();

        let found = discover_candidates(root);
        assert_eq!(found, vec![blink]);
        for dir in &found {
            assert!(dir.join("platformio.ini").is_file());
            assert!(!dir.join(".skiptest").exists());
        }
    }

    #[test]
    fn test_skipped_parent_does_not_hide_nested_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let parent = project(root, "suite", true);
        let nested = project(root, "suite/inner", false);

        let found = discover_candidates(root);
        assert!(!found.contains(&parent));
        assert_eq!(found, vec![nested]);
    }

    #[test]
    fn test_nested_projects_are_not_pruned() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let outer = project(root, "outer", false);
        let inner = project(root, "outer/lib/inner", false);

        let found: BTreeSet<PathBuf> = discover_candidates(root).into_iter().collect();
        assert_eq!(found, BTreeSet::from([outer, inner]));
    }

    #[test]
    fn test_manifest_must_be_a_direct_child() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/platformio.ini")).unwrap();
        assert!(discover_candidates(root).is_empty());
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_candidates(&tmp.path().join("does-not-exist")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subtree_does_not_hide_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let readable = project(root, "a_readable", false);
        project(root, "b_locked/inner", false);
        let locked = root.join("b_locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let found = discover_candidates(root);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(found.contains(&readable));
    }

    #[test]
    fn test_root_itself_can_be_a_project() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("platformio.ini"), "[env:a]\n").unwrap();
        assert_eq!(discover_candidates(tmp.path()), vec![tmp.path().to_path_buf()]);
    }
}

mod roots {
    use super::*;

    #[test]
    fn test_no_registry_means_local_root_only() {
        let roots = resolve_roots(Path::new("examples"), None, &ExclusionPolicy::default()).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots.roots()[0].origin, RootOrigin::Local);
        assert_eq!(roots.roots()[0].path, PathBuf::from("examples"));
    }

    #[test]
    fn test_embedded_platforms_are_added_in_registry_order() {
        let tmp = tempfile::tempdir().unwrap();
        let avr = tmp.path().join("atmelavr");
        let ststm32 = tmp.path().join("ststm32");
        fs::create_dir_all(avr.join("examples")).unwrap();
        fs::create_dir_all(ststm32.join("examples")).unwrap();

        let registry = StaticRegistry(vec![
            platform(&avr, "atmelavr", true),
            platform(tmp.path(), "native", false),
            platform(&ststm32, "ststm32", true),
        ]);
        let roots = resolve_roots(Path::new("examples"), Some(&registry), &ExclusionPolicy::empty()).unwrap();

        let origins: Vec<RootOrigin> = roots.roots().iter().map(|r| r.origin.clone()).collect();
        assert_eq!(
            origins,
            vec![
                RootOrigin::Local,
                RootOrigin::Platform("atmelavr".to_string()),
                RootOrigin::Platform("ststm32".to_string()),
            ]
        );
        assert_eq!(roots.roots()[1].path, avr.join("examples"));
    }

    #[test]
    fn test_excluded_platform_skipped_even_without_examples() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = StaticRegistry(vec![platform(&tmp.path().join("ststm8"), "ststm8", true)]);
        let policy = ExclusionPolicy::new(vec![ExclusionRule::new("ststm8", "permanent")]);
        let roots = resolve_roots(Path::new("examples"), Some(&registry), &policy).unwrap();
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn test_missing_platform_examples_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path().join("teensy");
        fs::create_dir_all(&pkg).unwrap();
        let registry = StaticRegistry(vec![platform(&pkg, "teensy", true)]);

        let err = resolve_roots(Path::new("examples"), Some(&registry), &ExclusionPolicy::empty()).unwrap_err();
        match err {
            DiscoveryError::MissingExamplesDir { platform, path } => {
                assert_eq!(platform, "teensy");
                assert_eq!(path, pkg.join("examples"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_capitalised_examples_dir_is_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path().join("nordicnrf52");
        fs::create_dir_all(pkg.join("Examples")).unwrap();
        let registry = StaticRegistry(vec![platform(&pkg, "nordicnrf52", true)]);

        let roots = resolve_roots(Path::new("examples"), Some(&registry), &ExclusionPolicy::empty()).unwrap();
        assert_eq!(roots.roots()[1].path, pkg.join("Examples"));
    }

    #[test]
    fn test_fs_registry_reads_platform_json() {
        let tmp = tempfile::tempdir().unwrap();
        let platforms = tmp.path().join("platforms");
        let avr = platforms.join("atmelavr");
        fs::create_dir_all(&avr).unwrap();
        fs::write(
            avr.join("platform.json"),
            r#"{"name": "atmelavr", "packages": {"tool-avrdude": {"type": "uploader"}}}"#,
        )
        .unwrap();
        let native = platforms.join("native");
        fs::create_dir_all(&native).unwrap();
        fs::write(native.join("platform.json"), r#"{"name": "native"}"#).unwrap();
        fs::create_dir_all(platforms.join("broken")).unwrap();

        let installed = FsPlatformRegistry::new(tmp.path()).installed().unwrap();
        assert_eq!(
            installed,
            vec![platform(&avr, "atmelavr", true), platform(&native, "native", false)]
        );
    }

    #[test]
    fn test_fs_registry_without_platforms_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(FsPlatformRegistry::new(tmp.path()).installed().unwrap().is_empty());
    }
}

mod sampling {
    use super::*;

    fn five_projects(root: &Path) -> Vec<PathBuf> {
        ["a", "b", "c", "d", "e"].iter().map(|n| project(root, n, false)).collect()
    }

    #[test]
    fn test_five_candidates_three_sampled() {
        let tmp = tempfile::tempdir().unwrap();
        five_projects(tmp.path());
        let roots = RootSet::new(tmp.path());

        let (samples, matrix) = build_matrix(&roots, SampleCap::new(3, false), &mut StdRng::seed_from_u64(1));
        assert_eq!(samples[0].discovered, 5);
        assert_eq!(matrix.len(), 3);
    }

    #[test]
    fn test_five_candidates_one_sampled_when_constrained() {
        let tmp = tempfile::tempdir().unwrap();
        five_projects(tmp.path());
        let roots = RootSet::new(tmp.path());

        let (_, matrix) = build_matrix(&roots, SampleCap::new(3, true), &mut StdRng::seed_from_u64(1));
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_empty_root_contributes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let full = tmp.path().join("full");
        let empty = tmp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        project(&full, "x", false);
        project(&full, "y", false);

        let mut roots = RootSet::new(&full);
        roots.push(&empty, RootOrigin::Extra);
        let (samples, matrix) = build_matrix(&roots, SampleCap::Constrained, &mut StdRng::seed_from_u64(3));
        assert_eq!(samples[1].selected.len(), 0);
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_matrix_is_sorted_across_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("zz");
        let second = tmp.path().join("aa");
        project(&first, "p", false);
        project(&second, "q", false);

        let mut roots = RootSet::new(&first);
        roots.push(&second, RootOrigin::Extra);
        let (_, matrix) = build_matrix(&roots, SampleCap::default(), &mut StdRng::seed_from_u64(0));
        assert_eq!(matrix.entries(), [second.join("q"), first.join("p")].as_slice());
    }

    #[test]
    fn test_overlapping_roots_do_not_duplicate() {
        let tmp = tempfile::tempdir().unwrap();
        let only = project(tmp.path(), "one", false);

        let mut roots = RootSet::new(tmp.path());
        roots.push(tmp.path(), RootOrigin::Extra);
        let (samples, matrix) = build_matrix(&roots, SampleCap::default(), &mut StdRng::seed_from_u64(0));
        assert_eq!(samples.len(), 2);
        assert_eq!(matrix.entries(), [only].as_slice());
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..12 {
            project(tmp.path(), &format!("p{i:02}"), false);
        }
        let roots = RootSet::new(tmp.path());

        let (_, a) = build_matrix(&roots, SampleCap::default(), &mut StdRng::seed_from_u64(99));
        let (_, b) = build_matrix(&roots, SampleCap::default(), &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
