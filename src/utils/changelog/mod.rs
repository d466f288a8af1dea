// changelog model, codec and merge reconciliation

pub mod config;
pub mod markers;
pub mod parser;
pub mod types;

pub use config::ChangelogConfig;
pub use markers::{annotate, marker, reconcile};
pub use parser::{decode, encode, load, save};
pub use types::{
    ChangeCategory, Changelog, ChangelogSummary, Entry, Phase, Selector, Version, VersionState,
    VersionSummary,
};
