use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use repo_groom::backup::manifest::BackupManifest;
use repo_groom::backup::BackupStore;
use repo_groom::scanner::digest::hash_file;
use repo_groom::{AppConfig, Mode, Pipeline, SilentReporter};

fn config_for(root: &Path) -> AppConfig {
    AppConfig {
        root_path: root.to_string_lossy().into_owned(),
        // Keep the cleanup-focused scenarios free of layout moves.
        layout_buckets: Vec::new(),
        ..AppConfig::default()
    }
}

/// The worked scenario: two byte-identical config files and one temporary.
///   root/
///     a/config.json   ("{\"key\": 1}")
///     b/config.json   ("{\"key\": 1}")   ← duplicate of a/config.json
///     tmp/cache.log   ("stale lines")    ← temporary
fn create_scenario_tree(root: &Path) {
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::create_dir_all(root.join("tmp")).unwrap();
    fs::write(root.join("a/config.json"), "{\"key\": 1}").unwrap();
    fs::write(root.join("b/config.json"), "{\"key\": 1}").unwrap();
    fs::write(root.join("tmp/cache.log"), "stale lines").unwrap();
}

fn tree_digests(root: &Path) -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    collect_digests(root, root, &mut out);
    out.sort();
    out
}

fn collect_digests(dir: &Path, root: &Path, out: &mut Vec<(PathBuf, String)>) {
    for entry in fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        let name = entry.file_name();
        if path.is_dir() {
            if name == "backups" {
                continue;
            }
            collect_digests(&path, root, out);
        } else {
            out.push((
                path.strip_prefix(root).unwrap().to_path_buf(),
                hash_file(&path).unwrap(),
            ));
        }
    }
}

#[test]
fn preview_reports_the_plan_without_mutating() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_scenario_tree(&root);
    let before = tree_digests(&root);

    let config = config_for(&root);
    let report = Pipeline::new(&config)
        .run(Mode::Preview, true, &SilentReporter)
        .unwrap();

    let plan = report.cleanup_plan.as_ref().unwrap();
    assert_eq!(plan.removals.len(), 2);
    let planned: Vec<&Path> = plan.removals.iter().map(|r| r.rel_path.as_path()).collect();
    assert!(planned.contains(&Path::new("b/config.json")));
    assert!(planned.contains(&Path::new("tmp/cache.log")));
    assert!(report.backup_manifest.is_none());
    assert!(!report.has_errors());

    // Preview is a pure read.
    assert_eq!(tree_digests(&root), before);
}

#[test]
fn dry_run_plan_matches_what_execute_applies() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_scenario_tree(&root);

    let config = config_for(&root);
    let preview = Pipeline::new(&config)
        .run(Mode::Preview, true, &SilentReporter)
        .unwrap();
    let previewed: Vec<PathBuf> = preview.cleanup_plan.as_ref().unwrap().paths();

    let execute = Pipeline::new(&config)
        .run(Mode::Execute, true, &SilentReporter)
        .unwrap();
    let executed_plan: Vec<PathBuf> = execute.cleanup_plan.as_ref().unwrap().paths();
    assert_eq!(previewed, executed_plan);

    // Every planned removal was applied, nothing else.
    let cleanup = &execute.phases[1];
    assert_eq!(cleanup.acted_on, previewed.len());
    assert!(cleanup.errors.is_empty());
    for path in &previewed {
        assert!(!root.join(path).exists(), "{} still on disk", path.display());
    }
}

#[test]
fn execute_backs_up_every_removed_file_first() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_scenario_tree(&root);
    let digest_b = hash_file(&root.join("b/config.json")).unwrap();
    let digest_log = hash_file(&root.join("tmp/cache.log")).unwrap();

    let config = config_for(&root);
    let report = Pipeline::new(&config)
        .run(Mode::Execute, true, &SilentReporter)
        .unwrap();
    assert!(!report.has_errors());

    let manifest_path = report.backup_manifest.as_ref().unwrap();
    let manifest = BackupManifest::load(manifest_path).unwrap();
    let run_dir = manifest_path.parent().unwrap();

    for (rel, digest) in [
        (Path::new("b/config.json"), &digest_b),
        (Path::new("tmp/cache.log"), &digest_log),
    ] {
        let entry = manifest
            .entries
            .iter()
            .find(|e| e.original_path == rel)
            .unwrap_or_else(|| panic!("no manifest entry for {}", rel.display()));
        assert_eq!(&entry.digest, digest);
        let copy = run_dir.join(&entry.backup_path);
        assert!(copy.is_file());
        assert_eq!(&hash_file(&copy).unwrap(), digest);
    }

    // Survivor untouched, losers gone.
    assert!(root.join("a/config.json").is_file());
    assert!(!root.join("b/config.json").exists());
    assert!(!root.join("tmp/cache.log").exists());
}

#[test]
fn restore_reproduces_the_pre_execution_tree() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_scenario_tree(&root);
    let before = tree_digests(&root);

    let config = config_for(&root);
    let report = Pipeline::new(&config)
        .run(Mode::Execute, true, &SilentReporter)
        .unwrap();
    assert!(!report.has_errors());
    assert_ne!(tree_digests(&root), before);

    let run_dir = report
        .backup_manifest
        .as_ref()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    let store = BackupStore::open(&run_dir).unwrap();
    let restored = store.restore(&root).unwrap();
    assert_eq!(restored, 2);

    assert_eq!(tree_digests(&root), before);
}

#[test]
fn duplicate_group_of_three_keeps_exactly_one_survivor() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    fs::create_dir_all(root.join("one")).unwrap();
    fs::create_dir_all(root.join("two")).unwrap();
    fs::create_dir_all(root.join("three")).unwrap();
    for dir in ["one", "two", "three"] {
        fs::write(root.join(dir).join("payload.bin"), vec![0xAB; 2048]).unwrap();
    }

    let config = config_for(&root);
    let report = Pipeline::new(&config)
        .run(Mode::Execute, true, &SilentReporter)
        .unwrap();
    assert!(!report.has_errors());

    let on_disk: Vec<bool> = ["one", "two", "three"]
        .iter()
        .map(|d| root.join(d).join("payload.bin").is_file())
        .collect();
    assert_eq!(on_disk.iter().filter(|present| **present).count(), 1);

    // Both removed copies are in the manifest.
    let manifest = BackupManifest::load(report.backup_manifest.as_ref().unwrap()).unwrap();
    assert_eq!(manifest.entries.len(), 2);
}

#[test]
fn redaction_applies_once_and_only_once() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join(".env"),
        "API_KEY=sk-proj4Xb9TqLmZnW2vKdY8eRsA1cF\nDATABASE_URL=postgres://admin:s3cr3t@db:5432/prod\n",
    )
    .unwrap();

    let config = config_for(&root);
    let first = Pipeline::new(&config)
        .run(Mode::Execute, true, &SilentReporter)
        .unwrap();
    assert_eq!(first.secret_findings.len(), 2);

    let content = fs::read_to_string(root.join(".env")).unwrap();
    assert!(content.contains("your_api_key_here"));
    assert!(!content.contains("s3cr3t"));

    // Second run over the already-redacted tree: zero findings, zero writes.
    let second = Pipeline::new(&config)
        .run(Mode::Execute, true, &SilentReporter)
        .unwrap();
    assert!(second.secret_findings.is_empty());
    let redact_phase = second
        .phases
        .iter()
        .find(|p| p.phase.as_str() == "redact")
        .unwrap();
    assert_eq!(redact_phase.acted_on, 0);
}

#[test]
fn execute_reorganizes_and_rewrites_references() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("video_agent.py"), "def run():\n    pass\n").unwrap();
    fs::write(root.join("main.py"), "import video_agent\nvideo_agent.run()\n").unwrap();

    let config = AppConfig {
        root_path: root.to_string_lossy().into_owned(),
        ..AppConfig::default()
    };
    let report = Pipeline::new(&config)
        .run(Mode::Execute, true, &SilentReporter)
        .unwrap();
    assert!(!report.has_errors());

    assert!(root.join("src/agents/video_agent.py").is_file());
    assert!(!root.join("video_agent.py").exists());
    let main_py = fs::read_to_string(root.join("main.py")).unwrap();
    assert!(main_py.contains("import src.agents.video_agent"));

    // The pre-move file and the rewritten file are both restorable.
    let manifest = BackupManifest::load(report.backup_manifest.as_ref().unwrap()).unwrap();
    assert!(manifest.contains(Path::new("video_agent.py")));
    assert!(manifest.contains(Path::new("main.py")));
}

#[test]
fn unreadable_files_are_reported_not_fatal() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    create_scenario_tree(&root);

    let config = config_for(&root);
    // A fresh scan of a healthy tree reports no errors and exits clean.
    let report = Pipeline::new(&config)
        .run(Mode::Preview, true, &SilentReporter)
        .unwrap();
    assert!(!report.has_errors());
    assert_eq!(report.error_count(), 0);
}
