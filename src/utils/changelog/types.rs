// changelog data structures

use crate::error::{Error, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// classification of a change entry, ordered by canonical name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeCategory {
    Added,
    Changed,
    Deprecated,
    Fixed,
    Removed,
    Security,
}

impl ChangeCategory {
    pub const ALL: [ChangeCategory; 6] = [
        ChangeCategory::Added,
        ChangeCategory::Changed,
        ChangeCategory::Deprecated,
        ChangeCategory::Fixed,
        ChangeCategory::Removed,
        ChangeCategory::Security,
    ];

    /// capitalized name used in headings and markers
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeCategory::Added => "Added",
            ChangeCategory::Changed => "Changed",
            ChangeCategory::Deprecated => "Deprecated",
            ChangeCategory::Fixed => "Fixed",
            ChangeCategory::Removed => "Removed",
            ChangeCategory::Security => "Security",
        }
    }

    /// exact lookup by canonical name
    pub fn from_canonical(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChangeCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == lowered)
            .ok_or_else(|| {
                let supported: Vec<String> =
                    Self::ALL.iter().map(|c| c.as_str().to_lowercase()).collect();
                format!(
                    "invalid change category: {}, use one of: {}",
                    s,
                    supported.join(", ")
                )
            })
    }
}

/// lifecycle of a version, transitions only go forward:
/// `Pending -> Released -> Yanked`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pending = 0,
    Released = 1,
    Yanked = 2,
}

impl Phase {
    /// true for every phase that carries a release date
    pub fn is_released(self) -> bool {
        self != Phase::Pending
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pending => write!(f, "pending"),
            Phase::Released => write!(f, "released"),
            Phase::Yanked => write!(f, "yanked"),
        }
    }
}

/// identity and lifecycle data of a version
///
/// `release` and `yank` are the only mutators. Equality ignores the time of day
/// of the release date.
#[derive(Debug, Clone)]
pub struct VersionState {
    name: String,
    reference: Option<String>,
    release_date: Option<NaiveDateTime>,
    phase: Phase,
}

impl VersionState {
    pub fn new(
        name: impl Into<String>,
        reference: Option<String>,
        release_date: Option<NaiveDateTime>,
        is_yanked: bool,
    ) -> Result<Self> {
        let name = name.into();
        let phase = match (release_date.is_some(), is_yanked) {
            (false, true) => return Err(Error::NotReleased { name }),
            (false, false) => Phase::Pending,
            (true, false) => Phase::Released,
            (true, true) => Phase::Yanked,
        };
        Ok(Self {
            name,
            reference: reference.filter(|r| !r.is_empty()),
            release_date,
            phase,
        })
    }

    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: None,
            release_date: None,
            phase: Phase::Pending,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn release_date(&self) -> Option<NaiveDateTime> {
        self.release_date
    }

    pub fn release_day(&self) -> Option<NaiveDate> {
        self.release_date.map(|d| d.date())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn release(
        &mut self,
        name: impl Into<String>,
        reference: Option<String>,
        date: NaiveDateTime,
    ) -> Result<()> {
        if self.phase.is_released() {
            return Err(Error::AlreadyReleased {
                name: self.name.clone(),
            });
        }
        let name = name.into();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::InvalidVersionName { name });
        }
        if let Some(reference) = &reference
            && reference.contains(char::is_whitespace)
        {
            return Err(Error::InvalidReference {
                reference: reference.clone(),
            });
        }
        self.name = name;
        self.reference = reference.filter(|r| !r.is_empty());
        self.release_date = Some(date);
        self.phase = Phase::Released;
        Ok(())
    }

    pub fn yank(&mut self) -> Result<()> {
        if !self.phase.is_released() {
            return Err(Error::NotReleased {
                name: self.name.clone(),
            });
        }
        self.phase = Phase::Yanked;
        Ok(())
    }
}

impl PartialEq for VersionState {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.reference == other.reference
            && self.phase == other.phase
            && self.release_day() == other.release_day()
    }
}

impl Eq for VersionState {}

/// one bullet of a changelog, possibly spanning several lines
///
/// Two entries are equal when their line sequences are equal, line by line and
/// byte for byte. Ordering is lexicographic over the lines, which is the order
/// entries are written in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entry(Vec<String>);

impl Entry {
    /// build an entry from raw lines, an empty list becomes a single empty line
    pub fn new(lines: Vec<String>) -> Self {
        if lines.is_empty() {
            return Self(vec![String::new()]);
        }
        Self(lines)
    }

    /// split user supplied text on line breaks
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines().map(str::to_string).collect())
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn into_lines(self) -> Vec<String> {
        self.0
    }

    pub fn joined(&self) -> String {
        self.0.join(" ")
    }
}

impl<S: Into<String>> FromIterator<S> for Entry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

pub type Changes = BTreeMap<ChangeCategory, BTreeSet<Entry>>;

/// one section of the changelog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    state: VersionState,
    changes: Changes,
}

impl Version {
    pub fn new(state: VersionState) -> Self {
        Self {
            state,
            changes: BTreeMap::new(),
        }
    }

    pub fn pending(name: impl Into<String>) -> Self {
        Self::new(VersionState::pending(name))
    }

    pub fn state(&self) -> &VersionState {
        &self.state
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn reference(&self) -> Option<&str> {
        self.state.reference()
    }

    pub fn release_date(&self) -> Option<NaiveDateTime> {
        self.state.release_date()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_released(&self) -> bool {
        self.state.phase().is_released()
    }

    pub fn is_yanked(&self) -> bool {
        self.state.phase() == Phase::Yanked
    }

    pub fn changes(&self) -> &Changes {
        &self.changes
    }

    /// raw access for the codec and the reconciler, bypasses the phase check
    pub(crate) fn changes_mut(&mut self) -> &mut Changes {
        &mut self.changes
    }

    pub fn entries(&self, category: ChangeCategory) -> Option<&BTreeSet<Entry>> {
        self.changes.get(&category)
    }

    pub fn entry_count(&self) -> usize {
        self.changes.values().map(BTreeSet::len).sum()
    }

    pub fn add_entry(&mut self, category: ChangeCategory, entry: Entry) -> Result<()> {
        if self.is_released() {
            return Err(Error::VersionClosed {
                name: self.name().to_string(),
            });
        }
        self.changes.entry(category).or_default().insert(entry);
        Ok(())
    }

    pub(crate) fn prune_empty(&mut self) {
        self.changes.retain(|_, entries| !entries.is_empty());
    }
}

/// how a caller addresses a version inside a changelog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    Position(usize),
    /// name first, then reference
    Key(&'a str),
}

impl From<usize> for Selector<'_> {
    fn from(position: usize) -> Self {
        Selector::Position(position)
    }
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(key: &'a str) -> Self {
        Selector::Key(key)
    }
}

impl fmt::Display for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Position(position) => write!(f, "#{}", position),
            Selector::Key(key) => write!(f, "{}", key),
        }
    }
}

/// represents a complete changelog document
///
/// Position 0 is the most recently active version. The name and reference
/// indexes are rebuilt after every structural mutation.
#[derive(Debug, Clone, Default)]
pub struct Changelog {
    pub header: Vec<String>,
    versions: Vec<Version>,
    names: HashMap<String, usize>,
    references: HashMap<String, usize>,
    pub rest: Vec<String>,
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub(crate) fn versions_mut(&mut self) -> &mut [Version] {
        &mut self.versions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Version> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.names.contains_key(key) || self.references.contains_key(key)
    }

    pub fn position<'a>(&self, selector: impl Into<Selector<'a>>) -> Result<usize> {
        let selector = selector.into();
        let found = match selector {
            Selector::Position(position) => (position < self.versions.len()).then_some(position),
            Selector::Key(key) => self
                .names
                .get(key)
                .or_else(|| self.references.get(key))
                .copied(),
        };
        found.ok_or_else(|| Error::VersionNotFound {
            key: selector.to_string(),
        })
    }

    pub fn get<'a>(&self, selector: impl Into<Selector<'a>>) -> Result<&Version> {
        let position = self.position(selector)?;
        Ok(&self.versions[position])
    }

    /// insert as the most recent version
    pub fn push_front(&mut self, version: Version) -> Result<()> {
        self.ensure_available(version.name(), version.reference(), None)?;
        self.versions.insert(0, version);
        self.reindex();
        Ok(())
    }

    /// insert as the oldest version
    pub fn push_back(&mut self, version: Version) -> Result<()> {
        self.ensure_available(version.name(), version.reference(), None)?;
        self.versions.push(version);
        self.reindex();
        Ok(())
    }

    pub fn add_entry<'a>(
        &mut self,
        selector: impl Into<Selector<'a>>,
        category: ChangeCategory,
        entry: Entry,
    ) -> Result<()> {
        let position = self.position(selector)?;
        self.versions[position].add_entry(category, entry)
    }

    pub fn release<'a>(
        &mut self,
        selector: impl Into<Selector<'a>>,
        name: &str,
        reference: Option<&str>,
    ) -> Result<()> {
        self.release_on(selector, name, reference, Local::now().naive_local())
    }

    pub fn release_on<'a>(
        &mut self,
        selector: impl Into<Selector<'a>>,
        name: &str,
        reference: Option<&str>,
        date: NaiveDateTime,
    ) -> Result<()> {
        let position = self.position(selector)?;
        self.ensure_available(name, reference, Some(position))?;
        self.versions[position].state.release(
            name,
            reference.map(str::to_string),
            date,
        )?;
        self.reindex();
        Ok(())
    }

    pub fn yank<'a>(&mut self, selector: impl Into<Selector<'a>>) -> Result<()> {
        let position = self.position(selector)?;
        self.versions[position].state.yank()
    }

    /// versions that are neither released nor yanked
    pub fn pending_positions(&self) -> Vec<usize> {
        self.versions
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_released())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn summary(&self) -> ChangelogSummary {
        ChangelogSummary {
            versions: self
                .versions
                .iter()
                .map(|v| VersionSummary {
                    name: v.name().to_string(),
                    reference: v.reference().map(str::to_string),
                    phase: v.phase(),
                    release_date: v.state.release_day(),
                    entries: v
                        .changes
                        .iter()
                        .map(|(category, entries)| (*category, entries.len()))
                        .collect(),
                })
                .collect(),
        }
    }

    fn ensure_available(
        &self,
        name: &str,
        reference: Option<&str>,
        owner: Option<usize>,
    ) -> Result<()> {
        let taken_by_other = |slot: Option<&usize>| slot.is_some_and(|p| Some(*p) != owner);

        if taken_by_other(self.names.get(name)) {
            return Err(Error::DuplicateVersion {
                name: name.to_string(),
            });
        }
        if let Some(reference) = reference.filter(|r| !r.is_empty())
            && taken_by_other(self.references.get(reference))
        {
            return Err(Error::DuplicateReference {
                reference: reference.to_string(),
            });
        }
        Ok(())
    }

    fn reindex(&mut self) {
        self.names.clear();
        self.references.clear();
        for (position, version) in self.versions.iter().enumerate() {
            self.names.insert(version.name().to_string(), position);
            if let Some(reference) = version.reference() {
                self.references.insert(reference.to_string(), position);
            }
        }
    }
}

impl PartialEq for Changelog {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.versions == other.versions && self.rest == other.rest
    }
}

impl Eq for Changelog {}

impl<'a> IntoIterator for &'a Changelog {
    type Item = &'a Version;
    type IntoIter = std::slice::Iter<'a, Version>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.iter()
    }
}

/// serializable overview of a changelog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogSummary {
    pub versions: Vec<VersionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub name: String,
    pub reference: Option<String>,
    pub phase: Phase,
    pub release_date: Option<NaiveDate>,
    pub entries: BTreeMap<ChangeCategory, usize>,
}
