// pre-defined merge scenarios

use super::changelog_builder::{TestChangelog, TestVersion};
use crate::error::Result;
use crate::utils::changelog::{ChangeCategory, Changelog};

/// move the first line containing `needle` right below the first line equal to `anchor`
///
/// this is what a merge or rebase does to a changelog: lines keep their text but end
/// up in a different place. returns the input unchanged when either line is missing.
pub fn move_line(text: &str, needle: &str, anchor: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    let Some(from) = lines.iter().position(|l| l.contains(needle)) else {
        return text.to_string();
    };
    let moved = lines.remove(from);
    let Some(to) = lines.iter().position(|l| *l == anchor) else {
        return text.to_string();
    };
    lines.insert(to + 1, moved);

    let mut result = lines.join("\n");
    if text.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// a changelog as it looks after a merge, and what loading it should produce
pub struct MergedChangelog {
    pub text: String,
    /// `None` when the merge damaged an entry beyond repair
    pub expected: Option<Changelog>,
}

/// pre-defined merge scenarios
pub enum MergeScenario {
    /// a pending entry lands under the heading of an older release
    EntryBelowRelease,
    /// another branch released while this one added an entry, the new entry lands
    /// among the lines of the fresh release
    ReleasedMeanwhile,
    /// the continuation line of a pending entry is separated from its first line
    SplitMultilineEntry,
    /// a pending entry lands right below a release heading, before its first category
    EntryAboveCategory,
}

impl MergeScenario {
    pub fn build(self) -> Result<MergedChangelog> {
        match self {
            MergeScenario::EntryBelowRelease => Self::build_entry_below_release(),
            MergeScenario::ReleasedMeanwhile => Self::build_released_meanwhile(),
            MergeScenario::SplitMultilineEntry => Self::build_split_multiline_entry(),
            MergeScenario::EntryAboveCategory => Self::build_entry_above_category(),
        }
    }

    fn build_entry_below_release() -> Result<MergedChangelog> {
        let builder = TestChangelog::new()
            .version(
                TestVersion::pending("Unreleased").entry(ChangeCategory::Added, "new feature"),
            )
            .version(
                TestVersion::released("1.0.0", "2024-01-01")
                    .reference("v1.0.0")
                    .entry(ChangeCategory::Fixed, "old fix"),
            );
        let text = move_line(&builder.render()?, "new feature", "### Fixed");
        Ok(MergedChangelog {
            text,
            expected: Some(builder.build()?),
        })
    }

    fn build_released_meanwhile() -> Result<MergedChangelog> {
        let builder = TestChangelog::new()
            .version(
                TestVersion::pending("Unreleased").entry(ChangeCategory::Added, "feature a"),
            )
            .version(
                TestVersion::released("1.0.0", "2024-03-01").entry(ChangeCategory::Added, "shared"),
            )
            .version(
                TestVersion::released("0.9.0", "2024-02-01")
                    .entry(ChangeCategory::Removed, "legacy"),
            );
        let text = move_line(&builder.render()?, "feature a", "- shared");
        Ok(MergedChangelog {
            text,
            expected: Some(builder.build()?),
        })
    }

    fn build_split_multiline_entry() -> Result<MergedChangelog> {
        let builder = TestChangelog::new()
            .version(
                TestVersion::pending("Unreleased")
                    .entry(ChangeCategory::Changed, "first line\nsecond line"),
            )
            .version(
                TestVersion::released("1.0.0", "2024-01-01")
                    .entry(ChangeCategory::Fixed, "old fix"),
            );
        let text = move_line(&builder.render()?, "second line", "- old fix");
        Ok(MergedChangelog {
            text,
            expected: None,
        })
    }

    fn build_entry_above_category() -> Result<MergedChangelog> {
        let builder = TestChangelog::new()
            .version(
                TestVersion::pending("Unreleased")
                    .entry(ChangeCategory::Added, "feature a")
                    .entry(ChangeCategory::Added, "feature b"),
            )
            .version(
                TestVersion::released("1.0.0", "2024-01-01")
                    .entry(ChangeCategory::Fixed, "old fix"),
            );
        let text = move_line(&builder.render()?, "feature b", "## [1.0.0] - 2024-01-01");
        Ok(MergedChangelog {
            text,
            expected: Some(builder.build()?),
        })
    }
}
