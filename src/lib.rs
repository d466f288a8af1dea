pub mod error;
pub mod utils;

pub use error::*;
pub use utils::changelog::{
    ChangeCategory, Changelog, ChangelogConfig, ChangelogSummary, Entry, Phase, Selector, Version,
    VersionState, VersionSummary, decode, encode, load, save,
};
pub use utils::config::KeeperConfig;
pub use utils::keeper::{ChangelogKeeper, Operation, Request, check};
