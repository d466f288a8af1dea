// ownership markers for entries of the pending version
//
// Every physical line of a pending entry is written as `<{version}-{category}/>text`.
// After a merge or rebase has moved lines around, the marker still names the section
// the entry belongs to, and loading moves it back there.

use super::types::{ChangeCategory, Changelog, Entry, Selector};
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

static MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_RE.get_or_init(|| {
        Regex::new(r"^<(?P<version>\S+?)-(?P<category>[A-Za-z]+)/>")
            .expect("marker pattern is valid")
    })
}

pub fn marker(version: &str, category: ChangeCategory) -> String {
    format!("<{}-{}/>", version, category)
}

/// copy of the changelog where every entry of a pending version carries its marker
pub fn annotate(changelog: &Changelog) -> Changelog {
    let mut annotated = changelog.clone();
    for version in annotated.versions_mut() {
        if version.is_released() {
            continue;
        }
        let name = version.name().to_string();
        for (category, entries) in version.changes_mut().iter_mut() {
            let tag = marker(&name, *category);
            *entries = std::mem::take(entries)
                .into_iter()
                .map(|entry| {
                    entry
                        .into_lines()
                        .into_iter()
                        .map(|line| format!("{}{}", tag, line))
                        .collect::<Entry>()
                })
                .collect();
        }
    }
    annotated
}

enum Ownership {
    Unmarked,
    Owned {
        position: usize,
        category: ChangeCategory,
        entry: Entry,
    },
    Conflict,
}

fn resolve(entry: &Entry, changelog: &Changelog) -> Ownership {
    let found: Vec<_> = entry
        .lines()
        .iter()
        .map(|line| marker_regex().captures(line))
        .collect();

    if found.iter().all(Option::is_none) {
        return Ownership::Unmarked;
    }
    if found.iter().any(Option::is_none) {
        return Ownership::Conflict;
    }

    let owners: BTreeSet<(&str, &str)> = found
        .iter()
        .flatten()
        .filter_map(|c| Some((c.name("version")?.as_str(), c.name("category")?.as_str())))
        .collect();
    let mut owners = owners.into_iter();
    let (Some((version, category)), None) = (owners.next(), owners.next()) else {
        return Ownership::Conflict;
    };

    let Ok(position) = changelog.position(Selector::Key(version)) else {
        return Ownership::Conflict;
    };
    let Ok(category) = category.parse::<ChangeCategory>() else {
        return Ownership::Conflict;
    };

    let stripped = entry
        .lines()
        .iter()
        .map(|line| marker_regex().replace(line, "").into_owned())
        .collect();
    Ownership::Owned {
        position,
        category,
        entry: stripped,
    }
}

struct Relocation {
    from: (usize, ChangeCategory),
    original: Entry,
    to: (usize, ChangeCategory),
    entry: Entry,
}

/// move marked entries to the section their marker names and strip the markers
///
/// Fails with a single report when any entry is only partially marked, carries
/// markers of different owners, or names a version or category that does not
/// exist. Returns how many entries changed section.
pub fn reconcile(changelog: &mut Changelog) -> Result<usize> {
    let mut relocations = Vec::new();
    let mut invalid: BTreeSet<Entry> = BTreeSet::new();

    for (position, version) in changelog.iter().enumerate() {
        for (category, entries) in version.changes() {
            for entry in entries {
                match resolve(entry, changelog) {
                    Ownership::Unmarked => {}
                    Ownership::Owned {
                        position: target,
                        category: target_category,
                        entry: stripped,
                    } => relocations.push(Relocation {
                        from: (position, *category),
                        original: entry.clone(),
                        to: (target, target_category),
                        entry: stripped,
                    }),
                    Ownership::Conflict => {
                        warn!(
                            version = version.name(),
                            category = %category,
                            entry = %entry.joined(),
                            "entry cannot be reconciled"
                        );
                        invalid.insert(entry.clone());
                    }
                }
            }
        }
    }

    if !invalid.is_empty() {
        return Err(Error::UnresolvedEntries {
            entries: invalid.iter().map(Entry::joined).collect(),
        });
    }

    let versions = changelog.versions_mut();
    for relocation in &relocations {
        let (position, category) = relocation.from;
        if let Some(entries) = versions[position].changes_mut().get_mut(&category) {
            entries.remove(&relocation.original);
        }
    }

    let mut moved = 0;
    for relocation in relocations {
        let (position, category) = relocation.to;
        if relocation.from != relocation.to {
            moved += 1;
            debug!(
                from_version = versions[relocation.from.0].name(),
                from_category = %relocation.from.1,
                to_version = versions[position].name(),
                to_category = %category,
                "relocated entry"
            );
        }
        versions[position]
            .changes_mut()
            .entry(category)
            .or_default()
            .insert(relocation.entry);
    }

    for version in versions.iter_mut() {
        version.prune_empty();
    }

    if moved > 0 {
        info!(entries = moved, "reconciled displaced changelog entries");
    }
    Ok(moved)
}
