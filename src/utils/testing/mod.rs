// testing utilities for generating changelog files

pub mod changelog_builder;
pub mod scenarios;

pub use changelog_builder::{TestChangelog, TestVersion, TestWorkdir};
pub use scenarios::{MergeScenario, move_line};
