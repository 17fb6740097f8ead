/// Integration tests for rulemove
///
/// These tests run the complete pipeline (rule compilation, glob listing,
/// planning and execution) against temporary directory trees.
///
/// Test categories:
/// 1. Dry-run output
/// 2. Live moves
/// 3. Unmatched files
/// 4. Pre-flight errors
use rulemove::config::{FileConfig, Overrides};
use rulemove::{
    DryRunOps, Error, ExecutionMode, FileLister, GlobLister, ListError, LiveOps, PlanError,
    RuleError, Settings, run_cli, run_with,
};
use std::fs::{self, File};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A source tree and a separate destination root, both temporary.
struct TestFixture {
    source: TempDir,
    destination: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        TestFixture {
            source: TempDir::new().expect("Failed to create temp directory"),
            destination: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    fn source(&self) -> &Path {
        self.source.path()
    }

    fn destination(&self) -> &Path {
        self.destination.path()
    }

    /// Create a file under the source root, creating parents as needed.
    fn create_file(&self, name: &str) {
        let file_path = self.source().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(name.as_bytes())
            .expect("Failed to write file content");
    }

    fn create_files(&self, names: &[&str]) {
        for name in names {
            self.create_file(name);
        }
    }

    fn settings(&self, rules: &[&str]) -> Settings {
        Settings {
            source_root: self.source().to_path_buf(),
            destination_root: self.destination().to_path_buf(),
            glob: "*".to_string(),
            rules: rules.iter().map(|r| r.to_string()).collect(),
            concurrency: NonZeroUsize::new(3).unwrap(),
            mode: ExecutionMode::Live,
            stop_on_unmatched: false,
            verbosity: 0,
        }
    }

    fn dry_settings(&self, rules: &[&str], destination: &str) -> Settings {
        Settings {
            destination_root: PathBuf::from(destination),
            concurrency: NonZeroUsize::new(1).unwrap(),
            mode: ExecutionMode::DryRun,
            ..self.settings(rules)
        }
    }

    fn assert_source_has(&self, rel_path: &str) {
        let path = self.source().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_source_lacks(&self, rel_path: &str) {
        let path = self.source().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    fn assert_moved_to(&self, rel_path: &str, original_name: &str) {
        let path = self.destination().join(rel_path);
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("File should exist: {}", path.display()));
        assert_eq!(content, original_name, "Wrong file at {}", path.display());
    }

    fn destination_is_empty(&self) -> bool {
        fs::read_dir(self.destination())
            .expect("Failed to read directory")
            .next()
            .is_none()
    }

    /// Runs a dry run into a buffer and returns the printed lines.
    async fn dry_run(&self, settings: &Settings) -> Result<Vec<String>, Error> {
        let ops = Arc::new(DryRunOps::new(Vec::new()));
        let lister = GlobLister::new(self.source());
        run_with(settings, &lister, Arc::clone(&ops), false).await?;
        Ok(ops.rendered().lines().map(str::to_string).collect())
    }
}

const IMAGE_RULE: &str = r"s!^(?<base>.+)\.jpg$!images/${base}.jpg!";
const SCENE_RULE: &str =
    r"s!^scene(?<sceneNo>\d+)-(?<part>\d+)-(?<subPart>\d+)\.mp4!scenes/${sceneNo}/${part}/${subPart}.mp4!";

fn basic_tree(fixture: &TestFixture) {
    fixture.create_files(&["001.jpg", "002.jpg", "003.jpg"]);
    for part in 1..=3 {
        for sub in 1..=3 {
            fixture.create_file(&format!("scene01-{:02}-{:02}.mp4", part, sub));
        }
    }
}

// ============================================================================
// Test Suite 1: Dry-run output
// ============================================================================

#[tokio::test]
async fn test_dry_run_basic_tree_exact_output() {
    let fixture = TestFixture::new();
    basic_tree(&fixture);

    let mut settings = fixture.dry_settings(&[IMAGE_RULE, SCENE_RULE], "/eg");
    settings.stop_on_unmatched = true;
    let lines = fixture.dry_run(&settings).await.unwrap();

    assert_eq!(
        lines,
        vec![
            "mkdir /eg/images",
            "mkdir /eg/scenes/01/01",
            "mkdir /eg/scenes/01/02",
            "mkdir /eg/scenes/01/03",
            "mv 001.jpg /eg/images/001.jpg",
            "mv 002.jpg /eg/images/002.jpg",
            "mv 003.jpg /eg/images/003.jpg",
            "mv scene01-01-01.mp4 /eg/scenes/01/01/01.mp4",
            "mv scene01-01-02.mp4 /eg/scenes/01/01/02.mp4",
            "mv scene01-01-03.mp4 /eg/scenes/01/01/03.mp4",
            "mv scene01-02-01.mp4 /eg/scenes/01/02/01.mp4",
            "mv scene01-02-02.mp4 /eg/scenes/01/02/02.mp4",
            "mv scene01-02-03.mp4 /eg/scenes/01/02/03.mp4",
            "mv scene01-03-01.mp4 /eg/scenes/01/03/01.mp4",
            "mv scene01-03-02.mp4 /eg/scenes/01/03/02.mp4",
            "mv scene01-03-03.mp4 /eg/scenes/01/03/03.mp4",
        ]
    );

    // Nothing was touched
    fixture.assert_source_has("001.jpg");
    fixture.assert_source_has("scene01-03-03.mp4");
}

#[tokio::test]
async fn test_dry_run_shared_parent_single_mkdir() {
    let fixture = TestFixture::new();
    fixture.create_files(&["001.jpg", "002.jpg"]);

    let settings = fixture.dry_settings(&[IMAGE_RULE], "/eg");
    let lines = fixture.dry_run(&settings).await.unwrap();

    assert_eq!(
        lines,
        vec![
            "mkdir /eg/images",
            "mv 001.jpg /eg/images/001.jpg",
            "mv 002.jpg /eg/images/002.jpg",
        ]
    );
}

#[tokio::test]
async fn test_dry_run_escapes_paths_with_spaces_and_quotes() {
    let fixture = TestFixture::new();
    fixture.create_files(&["holiday photo.jpg", "bob's.jpg"]);

    let settings = fixture.dry_settings(&[IMAGE_RULE], "/eg");
    let lines = fixture.dry_run(&settings).await.unwrap();

    assert_eq!(
        lines,
        vec![
            "mkdir /eg/images",
            r"mv 'bob\'s.jpg' '/eg/images/bob\'s.jpg'",
            "mv 'holiday photo.jpg' '/eg/images/holiday photo.jpg'",
        ]
    );
}

#[tokio::test]
async fn test_dry_run_first_matching_rule_wins() {
    let fixture = TestFixture::new();
    fixture.create_files(&["cover.jpg", "page.jpg"]);

    let settings = fixture.dry_settings(
        &[
            r"s!^cover\.jpg$!covers/front.jpg!",
            IMAGE_RULE,
            r"s!^(?<any>.+)$!misc/${any}!",
        ],
        "/lib",
    );
    let lines = fixture.dry_run(&settings).await.unwrap();

    assert_eq!(
        lines,
        vec![
            "mkdir /lib/covers",
            "mkdir /lib/images",
            "mv cover.jpg /lib/covers/front.jpg",
            "mv page.jpg /lib/images/page.jpg",
        ]
    );
}

#[tokio::test]
async fn test_dry_run_globstar_keeps_relative_sources() {
    let fixture = TestFixture::new();
    fixture.create_files(&["in/2021/a.jpg", "in/b.jpg", "notes.txt"]);

    let mut settings = fixture.dry_settings(
        &[r"s!^(?:.+/)?(?<name>[^/]+)\.jpg$!flat/${name}.jpg!"],
        "/out",
    );
    settings.glob = "**/*.jpg".to_string();
    let lines = fixture.dry_run(&settings).await.unwrap();

    assert_eq!(
        lines,
        vec![
            "mkdir /out/flat",
            "mv in/2021/a.jpg /out/flat/a.jpg",
            "mv in/b.jpg /out/flat/b.jpg",
        ]
    );
}

#[tokio::test]
async fn test_case_insensitive_rule_flag() {
    let fixture = TestFixture::new();
    fixture.create_files(&["A.JPG", "b.jpg"]);

    let settings = fixture.dry_settings(&[r"s!^(?<base>.+)\.jpg$!images/${base}.jpg!i"], "/eg");
    let lines = fixture.dry_run(&settings).await.unwrap();

    assert_eq!(
        lines,
        vec![
            "mkdir /eg/images",
            "mv A.JPG /eg/images/A.jpg",
            "mv b.jpg /eg/images/b.jpg",
        ]
    );
}

// ============================================================================
// Test Suite 2: Live moves
// ============================================================================

#[tokio::test]
async fn test_live_run_moves_basic_tree() {
    let fixture = TestFixture::new();
    basic_tree(&fixture);

    let mut settings = fixture.settings(&[IMAGE_RULE, SCENE_RULE]);
    settings.stop_on_unmatched = true;
    let summary = run_cli(&settings).await.unwrap();

    assert_eq!(summary.report.directories_created, 4);
    assert_eq!(summary.report.files_moved, 12);
    assert_eq!(summary.unmatched, 0);

    fixture.assert_moved_to("images/001.jpg", "001.jpg");
    fixture.assert_moved_to("images/003.jpg", "003.jpg");
    fixture.assert_moved_to("scenes/01/02/03.mp4", "scene01-02-03.mp4");
    fixture.assert_source_lacks("001.jpg");
    fixture.assert_source_lacks("scene01-02-03.mp4");
}

#[tokio::test]
async fn test_live_run_into_existing_directories() {
    let fixture = TestFixture::new();
    fixture.create_files(&["001.jpg"]);
    fs::create_dir_all(fixture.destination().join("images")).unwrap();

    let settings = fixture.settings(&[IMAGE_RULE]);
    run_cli(&settings).await.unwrap();

    fixture.assert_moved_to("images/001.jpg", "001.jpg");
}

#[tokio::test]
async fn test_live_run_many_files_parallel() {
    let fixture = TestFixture::new();
    for i in 0..60 {
        fixture.create_file(&format!("{:04}-{}.jpg", 2000 + i % 5, i));
    }

    let mut settings = fixture.settings(&[r"s!^(?<year>\d{4})-(?<n>\d+)\.jpg$!${year}/${n}.jpg!"]);
    settings.concurrency = NonZeroUsize::new(8).unwrap();
    let summary = run_cli(&settings).await.unwrap();

    assert_eq!(summary.report.directories_created, 5);
    assert_eq!(summary.report.files_moved, 60);
    fixture.assert_moved_to("2003/8.jpg", "2003-8.jpg");
    fixture.assert_moved_to("2004/59.jpg", "2004-59.jpg");
}

#[tokio::test]
async fn test_live_move_failure_is_reported() {
    let fixture = TestFixture::new();
    fixture.create_files(&["001.jpg"]);
    // A file where the destination directory should be blocks creation.
    fs::write(fixture.destination().join("images"), "not a directory").unwrap();

    let settings = fixture.settings(&[IMAGE_RULE]);
    let result = run_cli(&settings).await;

    assert!(matches!(result, Err(Error::Operation(_))));
    fixture.assert_source_has("001.jpg");
}

#[tokio::test]
async fn test_live_run_with_explicit_ops() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.jpg"]);

    let settings = fixture.settings(&[IMAGE_RULE]);
    let lister = GlobLister::new(fixture.source());
    let ops = Arc::new(LiveOps::new(fixture.source()));
    let summary = run_with(&settings, &lister, ops, false).await.unwrap();

    assert_eq!(summary.mode, ExecutionMode::Live);
    fixture.assert_moved_to("images/a.jpg", "a.jpg");
}

#[tokio::test]
async fn test_live_run_with_dot_relative_source_root() {
    let source = tempfile::tempdir_in(".").expect("Failed to create temp directory");
    let destination = TempDir::new().expect("Failed to create temp directory");
    fs::write(source.path().join("001.jpg"), "001.jpg").unwrap();
    fs::write(source.path().join("002.jpg"), "002.jpg").unwrap();

    let settings = Settings {
        source_root: Path::new(".").join(source.path().file_name().unwrap()),
        destination_root: destination.path().to_path_buf(),
        glob: "*".to_string(),
        rules: vec![IMAGE_RULE.to_string()],
        concurrency: NonZeroUsize::new(2).unwrap(),
        mode: ExecutionMode::Live,
        stop_on_unmatched: true,
        verbosity: 0,
    };
    let summary = run_cli(&settings).await.unwrap();

    assert_eq!(summary.report.files_moved, 2);
    assert_eq!(summary.unmatched, 0);
    for name in ["001.jpg", "002.jpg"] {
        assert!(!source.path().join(name).exists());
        let moved = destination.path().join("images").join(name);
        assert_eq!(fs::read_to_string(moved).unwrap(), name);
    }
}

/// Lists through a `GlobLister` only once another task has had a chance to run.
#[derive(Clone)]
struct WaitingLister {
    inner: GlobLister,
    ready: Arc<AtomicBool>,
}

impl FileLister for WaitingLister {
    fn list(&self, pattern: &str) -> Result<Vec<String>, ListError> {
        for _ in 0..200 {
            if self.ready.load(Ordering::SeqCst) {
                return self.inner.list(pattern);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_listing_leaves_runtime_free_for_other_tasks() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a.jpg"]);

    let ready = Arc::new(AtomicBool::new(false));
    let lister = WaitingLister {
        inner: GlobLister::new(fixture.source()),
        ready: Arc::clone(&ready),
    };
    tokio::spawn(async move { ready.store(true, Ordering::SeqCst) });

    let settings = fixture.settings(&[IMAGE_RULE]);
    let ops = Arc::new(LiveOps::new(fixture.source()));
    let summary = run_with(&settings, &lister, ops, false).await.unwrap();

    assert_eq!(summary.report.files_moved, 1);
    fixture.assert_moved_to("images/a.jpg", "a.jpg");
}

// ============================================================================
// Test Suite 3: Unmatched files
// ============================================================================

#[tokio::test]
async fn test_stop_unmatched_leaves_everything_in_place() {
    let fixture = TestFixture::new();
    fixture.create_files(&["001.jpg", "notes.txt", "002.jpg"]);

    let mut settings = fixture.settings(&[IMAGE_RULE]);
    settings.stop_on_unmatched = true;
    let result = run_cli(&settings).await;

    match result {
        Err(Error::Plan(PlanError::UnmatchedFile { path })) => assert_eq!(path, "notes.txt"),
        other => panic!("unexpected result: {:?}", other),
    }
    fixture.assert_source_has("001.jpg");
    fixture.assert_source_has("002.jpg");
    assert!(fixture.destination_is_empty());
}

#[tokio::test]
async fn test_unmatched_files_are_skipped_by_default() {
    let fixture = TestFixture::new();
    fixture.create_files(&["001.jpg", "notes.txt"]);

    let settings = fixture.settings(&[IMAGE_RULE]);
    let summary = run_cli(&settings).await.unwrap();

    assert_eq!(summary.unmatched, 1);
    fixture.assert_moved_to("images/001.jpg", "001.jpg");
    fixture.assert_source_has("notes.txt");
}

#[tokio::test]
async fn test_unresolved_placeholder_aborts_before_any_move() {
    let fixture = TestFixture::new();
    fixture.create_files(&["a-1.png", "b.png"]);

    let settings =
        fixture.settings(&[r"s!^(?<name>[a-z]+)(?:-(?<n>\d+))?\.png$!${n}/${name}.png!"]);
    let result = run_cli(&settings).await;

    assert!(matches!(result, Err(Error::Plan(PlanError::Resolve(_)))));
    fixture.assert_source_has("a-1.png");
    assert!(fixture.destination_is_empty());
}

// ============================================================================
// Test Suite 4: Pre-flight errors
// ============================================================================

#[tokio::test]
async fn test_no_files_found() {
    let fixture = TestFixture::new();

    let settings = fixture.settings(&[IMAGE_RULE]);
    let result = run_cli(&settings).await;

    assert!(matches!(result, Err(Error::Plan(PlanError::NoFilesFound))));
}

#[tokio::test]
async fn test_no_rules_configured() {
    let fixture = TestFixture::new();
    fixture.create_files(&["001.jpg"]);

    let settings = fixture.settings(&[]);
    let result = run_cli(&settings).await;

    assert!(matches!(result, Err(Error::Rule(RuleError::NoRulesConfigured))));
    fixture.assert_source_has("001.jpg");
}

#[tokio::test]
async fn test_invalid_rule_is_rejected_before_listing() {
    let fixture = TestFixture::new();
    fixture.create_files(&["001.jpg"]);

    let settings = fixture.settings(&[IMAGE_RULE, "s!broken"]);
    let result = run_cli(&settings).await;

    match result {
        Err(Error::Rule(RuleError::InvalidSyntax { rule, .. })) => assert_eq!(rule, "s!broken"),
        other => panic!("unexpected result: {:?}", other),
    }
    fixture.assert_source_has("001.jpg");
}

#[test]
fn test_missing_destination() {
    let result = Settings::resolve(
        FileConfig::default(),
        Overrides {
            rules: vec![IMAGE_RULE.to_string()],
            ..Default::default()
        },
    );
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().to_string(),
        "a destination must be specified with --to"
    );
}
