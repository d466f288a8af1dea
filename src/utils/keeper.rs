// operations executed against a changelog file

use super::changelog::{ChangeCategory, Changelog, ChangelogConfig, Entry, Version, parser};
use crate::error::{ConsistencyViolation, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// a single operation together with the arguments it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// write a fresh changelog with an empty pending version
    Create,
    /// record an entry in the pending version
    Add {
        category: ChangeCategory,
        entry: String,
    },
    /// validate the changelog and rewrite it in normalized form
    Check,
    /// close the pending version under a release name
    Release {
        version: String,
        reference: Option<String>,
    },
    /// withdraw a released version
    Yank { version: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Add { .. } => write!(f, "add"),
            Operation::Check => write!(f, "check"),
            Operation::Release { .. } => write!(f, "release"),
            Operation::Yank { .. } => write!(f, "yank"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    pub file: PathBuf,
}

impl Request {
    pub fn new(operation: Operation, file: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            file: file.into(),
        }
    }
}

/// runs one operation per call: load, mutate in memory, then write back
#[derive(Debug, Clone, Default)]
pub struct ChangelogKeeper {
    config: ChangelogConfig,
}

impl ChangelogKeeper {
    pub fn new(config: ChangelogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChangelogConfig {
        &self.config
    }

    /// execute the request; the file is written only when every step succeeded
    pub fn run(&self, request: &Request) -> Result<Changelog> {
        info!(operation = %request.operation, file = %request.file.display(), "running operation");

        let changelog = match &request.operation {
            Operation::Create => self.create()?,
            operation => {
                let mut changelog = parser::load(&request.file)?;
                self.apply(operation, &mut changelog)?;
                changelog
            }
        };

        parser::save(&changelog, &request.file)?;
        Ok(changelog)
    }

    /// apply an operation to an already loaded changelog
    pub fn apply(&self, operation: &Operation, changelog: &mut Changelog) -> Result<()> {
        if *operation != Operation::Create {
            check(changelog)?;
        }

        match operation {
            Operation::Create => {
                *changelog = self.create()?;
            }
            Operation::Check => {}
            Operation::Add { category, entry } => {
                debug!(category = %category, "adding entry to pending version");
                changelog.add_entry(0usize, *category, Entry::from_text(entry))?;
            }
            Operation::Release { version, reference } => {
                changelog.release(0usize, version, reference.as_deref())?;
                changelog.push_front(Version::pending(self.config.unreleased_name.as_str()))?;
                info!(version = %version, "released version");
            }
            Operation::Yank { version } => {
                changelog.yank(version.as_str())?;
                info!(version = %version, "yanked version");
            }
        }
        Ok(())
    }

    /// fresh changelog with the configured header and one pending version
    pub fn create(&self) -> Result<Changelog> {
        let mut changelog = Changelog::with_header(self.config.header.iter().cloned());
        changelog.push_front(Version::pending(self.config.unreleased_name.as_str()))?;
        Ok(changelog)
    }

    /// shorthand for running an operation against the given file
    pub fn run_on<P: AsRef<Path>>(&self, operation: Operation, path: P) -> Result<Changelog> {
        self.run(&Request::new(operation, path.as_ref()))
    }
}

/// a changelog needs exactly one pending version and it has to come first
pub fn check(changelog: &Changelog) -> std::result::Result<(), ConsistencyViolation> {
    let pending = changelog.pending_positions();

    if pending.is_empty() {
        return Err(ConsistencyViolation::NoPendingVersion);
    }
    if pending[0] != 0 {
        return Err(ConsistencyViolation::PendingNotFirst);
    }
    if pending.len() != 1 {
        return Err(ConsistencyViolation::MultiplePending);
    }
    Ok(())
}
