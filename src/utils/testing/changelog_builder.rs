// builder for creating test changelogs

use crate::error::Result;
use crate::utils::changelog::{ChangeCategory, Changelog, Entry, Version, VersionState, encode};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// represents a version to be placed in a test changelog
#[derive(Debug, Clone)]
pub struct TestVersion {
    pub name: String,
    pub reference: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub yanked: bool,
    pub entries: Vec<(ChangeCategory, String)>,
}

impl TestVersion {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: None,
            date: None,
            yanked: false,
            entries: Vec::new(),
        }
    }

    /// released on the given `yyyy-mm-dd` day, panics on a malformed date
    pub fn released(name: impl Into<String>, date: &str) -> Self {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("test date is valid");
        Self {
            date: Some(day.and_time(NaiveTime::MIN)),
            ..Self::pending(name)
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn yanked(mut self) -> Self {
        self.yanked = true;
        self
    }

    /// multi-line entries are separated with `\n`
    pub fn entry(mut self, category: ChangeCategory, text: impl Into<String>) -> Self {
        self.entries.push((category, text.into()));
        self
    }
}

/// builder for test changelogs
#[derive(Debug, Clone)]
pub struct TestChangelog {
    header: Vec<String>,
    versions: Vec<TestVersion>,
    rest: Vec<String>,
}

impl TestChangelog {
    /// starts with the default `# Changelog` header
    pub fn new() -> Self {
        Self {
            header: vec!["# Changelog".to_string(), String::new()],
            versions: Vec::new(),
            rest: Vec::new(),
        }
    }

    pub fn header<S: Into<String>>(mut self, header: impl IntoIterator<Item = S>) -> Self {
        self.header = header.into_iter().map(Into::into).collect();
        self
    }

    /// versions are kept in the order they are added, newest first
    pub fn version(mut self, version: TestVersion) -> Self {
        self.versions.push(version);
        self
    }

    pub fn rest<S: Into<String>>(mut self, rest: impl IntoIterator<Item = S>) -> Self {
        self.rest = rest.into_iter().map(Into::into).collect();
        self
    }

    /// build the in-memory changelog
    pub fn build(&self) -> Result<Changelog> {
        let mut changelog = Changelog::with_header(self.header.iter().cloned());
        for test_version in &self.versions {
            let state = VersionState::new(
                test_version.name.as_str(),
                test_version.reference.clone(),
                test_version.date,
                test_version.yanked,
            )?;
            let mut version = Version::new(state);
            for (category, text) in &test_version.entries {
                version
                    .changes_mut()
                    .entry(*category)
                    .or_default()
                    .insert(Entry::from_text(text));
            }
            changelog.push_back(version)?;
        }
        changelog.rest = self.rest.clone();
        Ok(changelog)
    }

    /// build and encode as it would be written to disk
    pub fn render(&self) -> Result<String> {
        Ok(encode(&self.build()?))
    }
}

impl Default for TestChangelog {
    fn default() -> Self {
        Self::new()
    }
}

/// temporary directory holding a single changelog file
pub struct TestWorkdir {
    dir: TempDir,
    file: PathBuf,
}

impl TestWorkdir {
    pub fn new() -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let file = dir.path().join("CHANGELOG.md");
        Ok(Self { dir, file })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn changelog_path(&self) -> &Path {
        &self.file
    }

    pub fn write(&self, content: &str) -> std::io::Result<()> {
        fs::write(&self.file, content)
    }

    pub fn read(&self) -> std::io::Result<String> {
        fs::read_to_string(&self.file)
    }
}
