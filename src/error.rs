use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    FileReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    FileWriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    TomlParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    DuplicateVersion {
        name: String,
    },
    DuplicateReference {
        reference: String,
    },
    VersionNotFound {
        key: String,
    },
    VersionClosed {
        name: String,
    },
    AlreadyReleased {
        name: String,
    },
    NotReleased {
        name: String,
    },
    InvalidVersionName {
        name: String,
    },
    InvalidReference {
        reference: String,
    },
    HeadingParseError {
        line: String,
    },
    EmptyVersionName {
        line: String,
    },
    CategoryParseError {
        line: String,
    },
    EntryOutsideCategory {
        line: String,
    },
    UnresolvedEntries {
        entries: Vec<String>,
    },
    Consistency(ConsistencyViolation),
}

/// structural problems of a whole changelog detected before an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyViolation {
    NoPendingVersion,
    PendingNotFirst,
    MultiplePending,
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyViolation::NoPendingVersion => {
                write!(f, "there is no unreleased version in the changelog")
            }
            ConsistencyViolation::PendingNotFirst => {
                write!(f, "unreleased version is not the first version in the changelog")
            }
            ConsistencyViolation::MultiplePending => {
                write!(f, "there has to be exactly one unreleased version")
            }
        }
    }
}

/// coarse classification used by the command line driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// an entity of the model refused an operation
    Model,
    /// the file content could not be decoded
    Parse,
    /// the document as a whole is structurally invalid
    Consistency,
    Io,
    Config,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Model => 3,
            ErrorKind::Parse => 4,
            ErrorKind::Consistency => 5,
            ErrorKind::Io => 1,
            ErrorKind::Config => 1,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileReadError { .. } | Error::FileWriteError { .. } => ErrorKind::Io,
            Error::TomlParseError { .. } => ErrorKind::Config,
            Error::DuplicateVersion { .. }
            | Error::DuplicateReference { .. }
            | Error::VersionNotFound { .. }
            | Error::VersionClosed { .. }
            | Error::AlreadyReleased { .. }
            | Error::NotReleased { .. }
            | Error::InvalidVersionName { .. }
            | Error::InvalidReference { .. } => ErrorKind::Model,
            Error::HeadingParseError { .. }
            | Error::EmptyVersionName { .. }
            | Error::CategoryParseError { .. }
            | Error::EntryOutsideCategory { .. }
            | Error::UnresolvedEntries { .. } => ErrorKind::Parse,
            Error::Consistency(_) => ErrorKind::Consistency,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileReadError { path, source } => {
                write!(f, "failed to read file: {} ({})", path.display(), source)
            }
            Error::FileWriteError { path, source } => {
                write!(f, "failed to write file: {} ({})", path.display(), source)
            }
            Error::TomlParseError { path, source } => {
                write!(
                    f,
                    "failed to parse toml file: {} ({})",
                    path.display(),
                    source
                )
            }
            Error::DuplicateVersion { name } => {
                write!(f, "version already exists in changelog: {}", name)
            }
            Error::DuplicateReference { reference } => {
                write!(f, "version link already exists in changelog: {}", reference)
            }
            Error::VersionNotFound { key } => {
                write!(f, "version is not present in the changelog: {}", key)
            }
            Error::VersionClosed { name } => {
                write!(
                    f,
                    "cannot modify changes for released or yanked version: {}",
                    name
                )
            }
            Error::AlreadyReleased { name } => {
                write!(f, "released or yanked version cannot be released: {}", name)
            }
            Error::NotReleased { name } => {
                write!(f, "unreleased version cannot be yanked: {}", name)
            }
            Error::InvalidVersionName { name } => {
                write!(f, "version name must be a single non-empty word: '{}'", name)
            }
            Error::InvalidReference { reference } => {
                write!(f, "version link must not contain whitespace: '{}'", reference)
            }
            Error::HeadingParseError { line } => {
                write!(f, "cannot parse the version heading line: '{}'", line)
            }
            Error::EmptyVersionName { line } => {
                write!(
                    f,
                    "cannot parse the version name in version heading line: '{}'",
                    line
                )
            }
            Error::CategoryParseError { line } => {
                write!(f, "cannot parse the change category line: '{}'", line)
            }
            Error::EntryOutsideCategory { line } => {
                write!(f, "entry found outside of a category section: '{}'", line)
            }
            Error::UnresolvedEntries { entries } => {
                let joined: Vec<String> = entries.iter().map(|e| format!("'{}'", e)).collect();
                write!(
                    f,
                    "changelog is invalid and some conflicts could not be fixed: {}",
                    joined.join(", ")
                )
            }
            Error::Consistency(violation) => {
                write!(f, "changelog check failed: {}", violation)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FileReadError { source, .. } => Some(source),
            Error::FileWriteError { source, .. } => Some(source),
            Error::TomlParseError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConsistencyViolation> for Error {
    fn from(violation: ConsistencyViolation) -> Self {
        Error::Consistency(violation)
    }
}
