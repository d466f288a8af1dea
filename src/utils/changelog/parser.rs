// changelog parser

use super::markers;
use super::types::{ChangeCategory, Changelog, Entry, Version, VersionState};
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

pub const VERSION_HEADING_PREFIX: &str = "## ";
pub const CATEGORY_HEADING_PREFIX: &str = "### ";
pub const ENTRY_FIRST_PREFIX: &str = "- ";
pub const ENTRY_CONTINUATION_PREFIX: &str = "  ";

const DATE_SEPARATOR: &str = " - ";
const DATE_FORMAT: &str = "%Y-%m-%d";
const YANKED_SUFFIX: &str = " [YANKED]";

static VERSION_HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn version_heading_regex() -> &'static Regex {
    VERSION_HEADING_RE.get_or_init(|| {
        Regex::new(
            r"^## \[(?P<name>\S*)\](?:\((?P<reference>\S*)\))?(?: - (?P<date>[0-9]{4}-[0-9]{2}-[0-9]{2})(?: \[(?P<yanked>YANKED)\])?)?$",
        )
        .expect("version heading pattern is valid")
    })
}

enum Line<'a> {
    VersionHeading,
    CategoryHeading,
    EntryFirst(&'a str),
    EntryContinuation(&'a str),
}

fn classify(line: &str) -> Option<Line<'_>> {
    if line.starts_with(VERSION_HEADING_PREFIX) {
        return Some(Line::VersionHeading);
    }
    if line.starts_with(CATEGORY_HEADING_PREFIX) {
        return Some(Line::CategoryHeading);
    }
    if let Some(content) = line.strip_prefix(ENTRY_FIRST_PREFIX) {
        return Some(Line::EntryFirst(content));
    }
    line.strip_prefix(ENTRY_CONTINUATION_PREFIX)
        .map(Line::EntryContinuation)
}

/// parse a `## [name](reference) - yyyy-mm-dd [YANKED]` line
pub fn parse_version_heading(line: &str) -> Result<Version> {
    let captures = version_heading_regex()
        .captures(line)
        .ok_or_else(|| Error::HeadingParseError {
            line: line.to_string(),
        })?;

    let name = captures.name("name").map_or("", |m| m.as_str());
    if name.is_empty() {
        return Err(Error::EmptyVersionName {
            line: line.to_string(),
        });
    }

    let reference = captures.name("reference").map(|m| m.as_str().to_string());
    let release_date = match captures.name("date") {
        Some(date) => {
            let date = NaiveDate::parse_from_str(date.as_str(), DATE_FORMAT).map_err(|_| {
                Error::HeadingParseError {
                    line: line.to_string(),
                }
            })?;
            Some(date.and_time(NaiveTime::MIN))
        }
        None => None,
    };
    let is_yanked = captures.name("yanked").is_some();

    Ok(Version::new(VersionState::new(
        name,
        reference,
        release_date,
        is_yanked,
    )?))
}

pub fn format_version_heading(version: &Version) -> String {
    let mut heading = format!("{}[{}]", VERSION_HEADING_PREFIX, version.name());
    if let Some(reference) = version.reference() {
        heading.push_str(&format!("({})", reference));
    }
    if let Some(date) = version.release_date() {
        heading.push_str(DATE_SEPARATOR);
        heading.push_str(&date.format(DATE_FORMAT).to_string());
        if version.is_yanked() {
            heading.push_str(YANKED_SUFFIX);
        }
    }
    heading
}

/// category headings are written by the tool itself, so only canonical names are accepted
pub fn parse_category_heading(line: &str) -> Result<ChangeCategory> {
    line.strip_prefix(CATEGORY_HEADING_PREFIX)
        .and_then(|name| ChangeCategory::from_canonical(name.trim()))
        .ok_or_else(|| Error::CategoryParseError {
            line: line.to_string(),
        })
}

pub fn format_category_heading(category: ChangeCategory) -> String {
    format!("{}{}", CATEGORY_HEADING_PREFIX, category)
}

/// decode changelog text and put displaced entries back where they belong
pub fn decode(text: &str) -> Result<Changelog> {
    let mut changelog = decode_raw(text)?;
    markers::reconcile(&mut changelog)?;
    Ok(changelog)
}

/// decode without reconciliation, markers are left in place
pub fn decode_raw(text: &str) -> Result<Changelog> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|line| line.starts_with(VERSION_HEADING_PREFIX))
        .unwrap_or(lines.len());

    let mut changelog = Changelog::with_header(lines[..start].iter().copied());
    let body = &lines[start..];

    // entries in construction order, one map per version. the category cursor
    // survives version headings so a displaced entry still lands somewhere
    let mut collected: Vec<BTreeMap<ChangeCategory, Vec<Vec<String>>>> = Vec::new();
    let mut category: Option<ChangeCategory> = None;
    let mut last_recognized: Option<usize> = None;

    for (idx, line) in body.iter().enumerate() {
        let Some(kind) = classify(line) else {
            continue;
        };
        last_recognized = Some(idx);

        let (content, continuation) = match kind {
            Line::VersionHeading => {
                changelog.push_back(parse_version_heading(line)?)?;
                collected.push(BTreeMap::new());
                continue;
            }
            Line::CategoryHeading => {
                category = Some(parse_category_heading(line)?);
                continue;
            }
            Line::EntryFirst(content) => (content, false),
            Line::EntryContinuation(content) => (content, true),
        };

        let (Some(changes), Some(category)) = (collected.last_mut(), category) else {
            return Err(Error::EntryOutsideCategory {
                line: line.to_string(),
            });
        };
        let entries = changes.entry(category).or_default();
        match entries.last_mut() {
            Some(entry) if continuation => entry.push(content.to_string()),
            _ => entries.push(vec![content.to_string()]),
        }
    }

    for (version, changes) in changelog.versions_mut().iter_mut().zip(collected) {
        for (category, entries) in changes {
            version
                .changes_mut()
                .entry(category)
                .or_default()
                .extend(entries.into_iter().map(Entry::new));
        }
    }

    if let Some(last) = last_recognized {
        changelog.rest = body[last + 1..].iter().map(|l| l.to_string()).collect();
    }

    debug!(
        versions = changelog.len(),
        header_lines = changelog.header.len(),
        rest_lines = changelog.rest.len(),
        "decoded changelog"
    );
    Ok(changelog)
}

/// encode a changelog, stamping ownership markers on pending entries
pub fn encode(changelog: &Changelog) -> String {
    render(&markers::annotate(changelog))
}

fn render(changelog: &Changelog) -> String {
    let mut output = String::new();
    for line in &changelog.header {
        output.push_str(line);
        output.push('\n');
    }

    let mut sections: Vec<String> = Vec::new();
    for version in changelog {
        sections.push(format!("{}\n", format_version_heading(version)));

        for (category, entries) in version.changes() {
            if entries.is_empty() {
                continue;
            }
            sections.push(format!("{}\n", format_category_heading(*category)));

            let mut block = String::new();
            for entry in entries {
                for (line_no, line) in entry.lines().iter().enumerate() {
                    let prefix = if line_no == 0 {
                        ENTRY_FIRST_PREFIX
                    } else {
                        ENTRY_CONTINUATION_PREFIX
                    };
                    block.push_str(prefix);
                    block.push_str(line);
                    block.push('\n');
                }
            }
            sections.push(block);
        }
    }

    output.push_str(&sections.join("\n"));
    output.push_str(&changelog.rest.join("\n"));
    output
}

/// load a changelog file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Changelog> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let changelog = decode(&content)?;
    info!(path = %path.display(), versions = changelog.len(), "loaded changelog");
    Ok(changelog)
}

/// overwrite a changelog file with the encoded changelog
pub fn save<P: AsRef<Path>>(changelog: &Changelog, path: P) -> Result<()> {
    let path = path.as_ref();
    let content = encode(changelog);
    fs::write(path, &content).map_err(|e| Error::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(path = %path.display(), bytes = content.len(), "saved changelog");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::changelog::types::Phase;
    use chrono::NaiveDateTime;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn version(
        name: &str,
        reference: Option<&str>,
        date: Option<NaiveDateTime>,
        yanked: bool,
    ) -> Version {
        Version::new(VersionState::new(name, reference.map(str::to_string), date, yanked).unwrap())
    }

    #[test]
    fn test_version_heading_round_trip() {
        for name in ["Unreleased", "1.0.0"] {
            for reference in [None, Some("v1.0.0")] {
                for (date, yanked) in [
                    (None, false),
                    (Some(day(2023, 11, 5)), false),
                    (Some(day(2023, 11, 5)), true),
                ] {
                    let original = version(name, reference, date, yanked);
                    let line = format_version_heading(&original);
                    assert_eq!(parse_version_heading(&line).unwrap(), original, "{}", line);
                }
            }
        }
    }

    #[test]
    fn test_version_heading_exact_form() {
        let yanked = version("1.2.0", Some("https://x/v1.2.0"), Some(day(2024, 2, 9)), true);
        assert_eq!(
            format_version_heading(&yanked),
            "## [1.2.0](https://x/v1.2.0) - 2024-02-09 [YANKED]"
        );
        assert_eq!(
            format_version_heading(&Version::pending("Unreleased")),
            "## [Unreleased]"
        );
    }

    #[test]
    fn test_version_heading_failures() {
        assert!(matches!(
            parse_version_heading("Some random line"),
            Err(Error::HeadingParseError { .. })
        ));
        assert!(matches!(
            parse_version_heading("## []()"),
            Err(Error::EmptyVersionName { .. })
        ));
        assert!(matches!(
            parse_version_heading("## [1.0.0] [YANKED]"),
            Err(Error::HeadingParseError { .. })
        ));
        assert!(matches!(
            parse_version_heading("## [1.0.0] - 2024-13-40"),
            Err(Error::HeadingParseError { .. })
        ));
        assert!(matches!(
            parse_version_heading("## [1.0.0] - 24-01-01"),
            Err(Error::HeadingParseError { .. })
        ));

        let message = parse_version_heading("## Version 1").unwrap_err().to_string();
        assert!(message.contains("## Version 1"));
    }

    #[test]
    fn test_parsed_heading_phase() {
        let parsed = parse_version_heading("## [0.1.0](v0.1.0) - 2020-01-02 [YANKED]").unwrap();
        assert_eq!(parsed.phase(), Phase::Yanked);
        assert_eq!(parsed.reference(), Some("v0.1.0"));
        assert_eq!(parsed.state().release_day(), NaiveDate::from_ymd_opt(2020, 1, 2));
    }

    #[test]
    fn test_category_heading() {
        assert_eq!(
            parse_category_heading("### Security").unwrap(),
            ChangeCategory::Security
        );
        assert!(matches!(
            parse_category_heading("### Features"),
            Err(Error::CategoryParseError { .. })
        ));
        assert_eq!(format_category_heading(ChangeCategory::Deprecated), "### Deprecated");
    }

    #[test]
    fn test_decode_collects_multiline_entries() {
        let text = "# Changelog\n\n## [1.0.0] - 2024-01-01\n\n### Fixed\n\n- first\n  second\n- third\n";
        let changelog = decode(text).unwrap();

        assert_eq!(changelog.header, vec!["# Changelog".to_string(), String::new()]);
        let fixed = changelog.get("1.0.0").unwrap().entries(ChangeCategory::Fixed).unwrap();
        assert!(fixed.contains(&Entry::from_text("first\nsecond")));
        assert!(fixed.contains(&Entry::from_text("third")));
        assert!(changelog.rest.is_empty());
    }

    #[test]
    fn test_orphan_continuation_starts_entry() {
        let text = "## [1.0.0] - 2024-01-01\n### Added\n  orphan\n  tail\n";
        let changelog = decode(text).unwrap();
        let added = changelog.get("1.0.0").unwrap().entries(ChangeCategory::Added).unwrap();
        assert!(added.contains(&Entry::from_text("orphan\ntail")));
    }

    #[test]
    fn test_unrecognized_lines_are_skipped_and_rest_kept() {
        let text = "intro\n## [1.0.0] - 2024-01-01\nsome prose\n### Added\n- one\n\n[1.0.0]: https://example.com\nfooter";
        let changelog = decode(text).unwrap();
        assert_eq!(changelog.header, vec!["intro".to_string()]);
        assert_eq!(
            changelog.rest,
            vec![
                String::new(),
                "[1.0.0]: https://example.com".to_string(),
                "footer".to_string()
            ]
        );
        assert_eq!(changelog.get(0usize).unwrap().entry_count(), 1);
    }

    #[test]
    fn test_entry_outside_category_fails() {
        let text = "## [1.0.0] - 2024-01-01\n- stray\n";
        assert!(matches!(decode(text), Err(Error::EntryOutsideCategory { .. })));
    }

    #[test]
    fn test_category_cursor_carries_over_version_heading() {
        let text = "## [2.0.0] - 2024-02-01\n### Added\n- new\n## [1.0.0] - 2024-01-01\n- stray\n### Fixed\n- old\n";
        let changelog = decode_raw(text).unwrap();
        let older = changelog.get("1.0.0").unwrap();
        assert!(
            older
                .entries(ChangeCategory::Added)
                .unwrap()
                .contains(&Entry::from_text("stray"))
        );
        assert!(
            older
                .entries(ChangeCategory::Fixed)
                .unwrap()
                .contains(&Entry::from_text("old"))
        );
    }

    #[test]
    fn test_duplicate_headings_fail() {
        let text = "## [1.0.0] - 2024-01-01\n## [1.0.0] - 2024-01-02\n";
        assert!(matches!(decode(text), Err(Error::DuplicateVersion { .. })));
    }

    #[test]
    fn test_encode_layout() {
        let mut changelog = Changelog::with_header(["# Changelog", ""]);
        changelog
            .push_back(version("1.0.0", Some("v1.0.0"), Some(day(2024, 1, 1)), false))
            .unwrap();
        let released = &mut changelog.versions_mut()[0];
        released
            .changes_mut()
            .entry(ChangeCategory::Fixed)
            .or_default()
            .insert(Entry::from_text("b bug"));
        released
            .changes_mut()
            .entry(ChangeCategory::Added)
            .or_default()
            .insert(Entry::from_text("z feature\nmore"));
        released
            .changes_mut()
            .entry(ChangeCategory::Fixed)
            .or_default()
            .insert(Entry::from_text("a bug"));
        changelog.rest = vec![String::new(), "[1.0.0]: link".to_string()];

        let expected = "# Changelog\n\n## [1.0.0](v1.0.0) - 2024-01-01\n\n### Added\n\n- z feature\n  more\n\n### Fixed\n\n- a bug\n- b bug\n\n[1.0.0]: link";
        assert_eq!(encode(&changelog), expected);
        assert_eq!(decode(expected).unwrap(), changelog);
    }

    #[test]
    fn test_encode_marks_pending_entries_only() {
        let mut changelog = Changelog::with_header(["# Changelog", ""]);
        changelog.push_back(Version::pending("Unreleased")).unwrap();
        changelog
            .push_back(version("1.0.0", None, Some(day(2024, 1, 1)), false))
            .unwrap();
        changelog
            .add_entry(0usize, ChangeCategory::Added, Entry::from_text("new\nthing"))
            .unwrap();
        changelog.versions_mut()[1]
            .changes_mut()
            .entry(ChangeCategory::Fixed)
            .or_default()
            .insert(Entry::from_text("old"));

        let text = encode(&changelog);
        assert!(text.contains("- <Unreleased-Added/>new\n  <Unreleased-Added/>thing\n"));
        assert!(text.contains("- old\n"));
        assert!(!text.contains("<1.0.0-"));
        assert_eq!(decode(&text).unwrap(), changelog);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let mut first = Changelog::with_header(["# Changelog", ""]);
        first.push_back(Version::pending("Unreleased")).unwrap();
        let mut second = first.clone();

        for text in ["beta", "alpha", "gamma"] {
            first
                .add_entry(0usize, ChangeCategory::Changed, Entry::from_text(text))
                .unwrap();
        }
        for text in ["gamma", "beta", "alpha"] {
            second
                .add_entry(0usize, ChangeCategory::Changed, Entry::from_text(text))
                .unwrap();
        }

        assert_eq!(encode(&first), encode(&second));
        assert_eq!(encode(&first), encode(&first));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load(dir.path().join("CHANGELOG.md"));
        assert!(matches!(result, Err(Error::FileReadError { .. })));
    }
}
