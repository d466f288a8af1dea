use changelog_keeper::utils::testing::{TestChangelog, TestVersion, TestWorkdir};
use changelog_keeper::{
    ChangeCategory, ChangelogKeeper, ConsistencyViolation, Entry, Error, Operation, Phase, load,
};
use chrono::Local;

fn keeper() -> ChangelogKeeper {
    ChangelogKeeper::default()
}

fn add(category: ChangeCategory, entry: &str) -> Operation {
    Operation::Add {
        category,
        entry: entry.to_string(),
    }
}

fn release(version: &str, reference: Option<&str>) -> Operation {
    Operation::Release {
        version: version.to_string(),
        reference: reference.map(str::to_string),
    }
}

fn yank(version: &str) -> Operation {
    Operation::Yank {
        version: version.to_string(),
    }
}

#[test]
fn test_integration_create() {
    let workdir = TestWorkdir::new().unwrap();
    keeper()
        .run_on(Operation::Create, workdir.changelog_path())
        .unwrap();

    assert_eq!(workdir.read().unwrap(), "# Changelog\n\n## [Unreleased]\n");

    let changelog = load(workdir.changelog_path()).unwrap();
    assert_eq!(changelog.header, vec!["# Changelog".to_string(), String::new()]);
    assert_eq!(changelog.len(), 1);
    let version = changelog.get(0usize).unwrap();
    assert_eq!(version.name(), "Unreleased");
    assert_eq!(version.phase(), Phase::Pending);
    assert!(version.changes().is_empty());
}

#[test]
fn test_integration_add_then_release() {
    let workdir = TestWorkdir::new().unwrap();
    let path = workdir.changelog_path();
    let keeper = keeper();

    keeper.run_on(Operation::Create, path).unwrap();
    keeper
        .run_on(add(ChangeCategory::Fixed, "Fixed a bug"), path)
        .unwrap();
    assert!(
        workdir
            .read()
            .unwrap()
            .contains("- <Unreleased-Fixed/>Fixed a bug\n")
    );

    keeper.run_on(release("1.0.0", Some("v1.0.0")), path).unwrap();

    let content = workdir.read().unwrap();
    assert!(!content.contains("<Unreleased-"));
    assert!(content.contains("- Fixed a bug\n"));

    let changelog = load(path).unwrap();
    assert_eq!(changelog.len(), 2);

    let pending = changelog.get(0usize).unwrap();
    assert_eq!(pending.name(), "Unreleased");
    assert_eq!(pending.phase(), Phase::Pending);
    assert!(pending.changes().is_empty());

    let released = changelog.get(1usize).unwrap();
    assert_eq!(released.name(), "1.0.0");
    assert_eq!(released.reference(), Some("v1.0.0"));
    assert_eq!(released.phase(), Phase::Released);
    assert_eq!(
        released.state().release_day(),
        Some(Local::now().date_naive())
    );
    let fixed = released.entries(ChangeCategory::Fixed).unwrap();
    assert_eq!(fixed.len(), 1);
    assert!(fixed.contains(&Entry::from_text("Fixed a bug")));
}

#[test]
fn test_integration_yank_changes_only_phase() {
    let workdir = TestWorkdir::new().unwrap();
    let path = workdir.changelog_path();
    let keeper = keeper();

    keeper.run_on(Operation::Create, path).unwrap();
    keeper
        .run_on(add(ChangeCategory::Security, "Patched a hole"), path)
        .unwrap();
    keeper.run_on(release("1.0.0", Some("v1.0.0")), path).unwrap();
    let before = load(path).unwrap();

    keeper.run_on(yank("1.0.0"), path).unwrap();
    let after = load(path).unwrap();

    let old = before.get("1.0.0").unwrap();
    let new = after.get("1.0.0").unwrap();
    assert_eq!(new.phase(), Phase::Yanked);
    assert_eq!(new.name(), old.name());
    assert_eq!(new.reference(), old.reference());
    assert_eq!(new.state().release_day(), old.state().release_day());
    assert_eq!(new.changes(), old.changes());
    assert!(workdir.read().unwrap().contains(" [YANKED]\n"));
}

#[test]
fn test_integration_yank_by_reference() {
    let workdir = TestWorkdir::new().unwrap();
    let text = TestChangelog::new()
        .version(TestVersion::pending("Unreleased"))
        .version(TestVersion::released("2.0.0", "2024-05-01").reference("v2"))
        .render()
        .unwrap();
    workdir.write(&text).unwrap();

    keeper().run_on(yank("v2"), workdir.changelog_path()).unwrap();
    let changelog = load(workdir.changelog_path()).unwrap();
    assert!(changelog.get("2.0.0").unwrap().is_yanked());
}

#[test]
fn test_integration_check_failures() {
    let cases = [
        (
            "# Changelog\n\n## [1.0.0] - 2024-01-01\n",
            ConsistencyViolation::NoPendingVersion,
        ),
        (
            "# Changelog\n\n## [1.0.0] - 2024-01-01\n\n## [Unreleased]\n",
            ConsistencyViolation::PendingNotFirst,
        ),
        (
            "# Changelog\n\n## [Unreleased]\n\n## [Next]\n",
            ConsistencyViolation::MultiplePending,
        ),
    ];

    let mut messages = Vec::new();
    for (text, violation) in cases {
        let workdir = TestWorkdir::new().unwrap();
        workdir.write(text).unwrap();

        let err = keeper()
            .run_on(Operation::Check, workdir.changelog_path())
            .unwrap_err();
        assert!(matches!(&err, Error::Consistency(v) if *v == violation));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(workdir.read().unwrap(), text);
        messages.push(err.to_string());
    }

    messages.dedup();
    assert_eq!(messages.len(), 3);
}

#[test]
fn test_integration_mutation_refused_leaves_file_untouched() {
    let workdir = TestWorkdir::new().unwrap();
    let text = "# Changelog\n\n## [1.0.0] - 2024-01-01\n\n## [Unreleased]\n";
    workdir.write(text).unwrap();

    let err = keeper()
        .run_on(add(ChangeCategory::Added, "x"), workdir.changelog_path())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Consistency(ConsistencyViolation::PendingNotFirst)
    ));
    assert_eq!(workdir.read().unwrap(), text);
}

#[test]
fn test_integration_release_name_with_whitespace_is_refused() {
    let workdir = TestWorkdir::new().unwrap();
    let path = workdir.changelog_path();
    keeper().run_on(Operation::Create, path).unwrap();
    let before = workdir.read().unwrap();

    let err = keeper().run_on(release("1.0 beta", None), path).unwrap_err();
    assert!(matches!(err, Error::InvalidVersionName { .. }));
    assert_eq!(err.exit_code(), 3);

    let err = keeper()
        .run_on(release("1.0.0", Some("v1 final")), path)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidReference { .. }));

    assert_eq!(workdir.read().unwrap(), before);
    assert!(load(path).is_ok());
}

#[test]
fn test_integration_lifecycle_errors() {
    let workdir = TestWorkdir::new().unwrap();
    let path = workdir.changelog_path();
    let keeper = keeper();
    let text = TestChangelog::new()
        .version(TestVersion::pending("Unreleased").entry(ChangeCategory::Added, "pending"))
        .version(TestVersion::released("1.0.0", "2024-01-01").reference("v1"))
        .render()
        .unwrap();
    workdir.write(&text).unwrap();

    let err = keeper.run_on(yank("Unreleased"), path).unwrap_err();
    assert!(matches!(err, Error::NotReleased { .. }));
    assert_eq!(err.exit_code(), 3);

    let err = keeper.run_on(release("1.0.0", None), path).unwrap_err();
    assert!(matches!(err, Error::DuplicateVersion { .. }));

    let err = keeper.run_on(release("1.1.0", Some("v1")), path).unwrap_err();
    assert!(matches!(err, Error::DuplicateReference { .. }));

    let err = keeper.run_on(yank("3.0.0"), path).unwrap_err();
    assert!(matches!(err, Error::VersionNotFound { .. }));

    assert_eq!(workdir.read().unwrap(), text);
}

#[test]
fn test_integration_multiline_entry() {
    let workdir = TestWorkdir::new().unwrap();
    let path = workdir.changelog_path();
    let keeper = keeper();

    keeper.run_on(Operation::Create, path).unwrap();
    keeper
        .run_on(add(ChangeCategory::Changed, "Reworked parser\nwith details"), path)
        .unwrap();

    let content = workdir.read().unwrap();
    assert!(content.contains(
        "- <Unreleased-Changed/>Reworked parser\n  <Unreleased-Changed/>with details\n"
    ));

    let changelog = load(path).unwrap();
    let changed = changelog
        .get("Unreleased")
        .unwrap()
        .entries(ChangeCategory::Changed)
        .unwrap();
    assert!(changed.contains(&Entry::from_text("Reworked parser\nwith details")));
}

#[test]
fn test_integration_trailing_content_survives() {
    let workdir = TestWorkdir::new().unwrap();
    let path = workdir.changelog_path();
    let text = "# Changelog\n\nAll notable changes.\n\n## [Unreleased]\n\n## [1.0.0](https://example.com/v1.0.0) - 2024-01-01\n\n### Added\n\n- First release\n\n[Unreleased]: https://example.com/compare/v1.0.0...HEAD\n[1.0.0]: https://example.com/v1.0.0";
    workdir.write(text).unwrap();

    keeper()
        .run_on(add(ChangeCategory::Fixed, "Late fix"), path)
        .unwrap();

    let content = workdir.read().unwrap();
    assert!(content.starts_with("# Changelog\n\nAll notable changes.\n\n## [Unreleased]\n"));
    assert!(content.ends_with(
        "- First release\n\n[Unreleased]: https://example.com/compare/v1.0.0...HEAD\n[1.0.0]: https://example.com/v1.0.0"
    ));
}

#[test]
fn test_integration_check_is_idempotent() {
    let workdir = TestWorkdir::new().unwrap();
    let path = workdir.changelog_path();
    let keeper = keeper();

    keeper.run_on(Operation::Create, path).unwrap();
    keeper
        .run_on(add(ChangeCategory::Removed, "Dropped old flag"), path)
        .unwrap();
    let first = workdir.read().unwrap();

    keeper.run_on(Operation::Check, path).unwrap();
    assert_eq!(workdir.read().unwrap(), first);
}

#[test]
fn test_integration_parse_error_exit_code() {
    let workdir = TestWorkdir::new().unwrap();
    workdir
        .write("# Changelog\n\n## Unreleased changes\n")
        .unwrap();

    let err = keeper()
        .run_on(Operation::Check, workdir.changelog_path())
        .unwrap_err();
    assert!(matches!(err, Error::HeadingParseError { .. }));
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("## Unreleased changes"));
}

#[test]
fn test_integration_missing_file() {
    let workdir = TestWorkdir::new().unwrap();
    let err = keeper()
        .run_on(Operation::Check, workdir.changelog_path())
        .unwrap_err();
    assert!(matches!(err, Error::FileReadError { .. }));
    assert_eq!(err.exit_code(), 1);
}
