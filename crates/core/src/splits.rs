//! Reconciliation of split archives produced by the resource compiler.
//!
//! The compiler writes one `<package>_<suffix>` sibling per requested split, but its suffix
//! does not always match the requested spelling: filters may be reordered, qualifiers
//! normalized, or a platform version qualifier added. Each produced file is attributed to
//! exactly one requested split and renamed to `<package>_<canonical suffix>`.

use crate::error::{RespackError, Result};
use globset::GlobBuilder;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use respack_api::SplitSpec;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static GLOB_META: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\\{}\[\]*?]").unwrap());

static VERSION_QUALIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+$").unwrap());

type SplitKey = BTreeSet<BTreeSet<String>>;

/// Escapes glob metacharacters so `text` only matches itself.
pub fn escape_glob(text: &str) -> String {
    GLOB_META.replace_all(text, r"\$0").into_owned()
}

fn qualifiers(filter: &str) -> BTreeSet<String> {
    filter
        .split('-')
        .map(str::to_lowercase)
        .filter(|q| !q.is_empty() && !VERSION_QUALIFIER.is_match(q))
        .collect()
}

fn split_key<'a>(filters: impl Iterator<Item = &'a str>) -> SplitKey {
    filters.map(qualifiers).collect()
}

fn produced_key(suffix: &str) -> SplitKey {
    split_key(suffix.split(['_', ',']))
}

fn requested_key(split: &SplitSpec) -> SplitKey {
    split_key(split.raw().split(','))
}

/// Maps each produced filename suffix to the canonical suffix of the split it belongs to.
///
/// Exact canonical matches are taken first. The rest are matched by their qualifier sets,
/// and only when the pairing is unambiguous. Anything left over on either side fails with
/// [`RespackError::UnrecognizedSplits`]. Entries come back in requested order.
pub fn map_filenames_to_splits(
    produced: &[String],
    splits: &[SplitSpec],
) -> Result<IndexMap<String, String>> {
    let mut by_split: Vec<Option<&str>> = vec![None; splits.len()];
    let mut claimed: BTreeSet<&str> = BTreeSet::new();

    for (i, split) in splits.iter().enumerate() {
        let canonical = split.canonical_suffix();
        if let Some(suffix) = produced
            .iter()
            .find(|s| **s == canonical && !claimed.contains(s.as_str()))
        {
            by_split[i] = Some(suffix.as_str());
            claimed.insert(suffix.as_str());
        }
    }

    let open_produced: Vec<(&str, SplitKey)> = produced
        .iter()
        .filter(|s| !claimed.contains(s.as_str()))
        .map(|s| (s.as_str(), produced_key(s)))
        .collect();
    let open_requested: Vec<(usize, SplitKey)> = splits
        .iter()
        .enumerate()
        .filter(|(i, _)| by_split[*i].is_none())
        .map(|(i, split)| (i, requested_key(split)))
        .collect();

    for (i, key) in &open_requested {
        let candidates: Vec<&str> = open_produced
            .iter()
            .filter(|(_, produced)| produced == key)
            .map(|(suffix, _)| *suffix)
            .collect();
        let [suffix] = candidates.as_slice() else {
            continue;
        };
        let competing = open_requested
            .iter()
            .filter(|(_, other)| other == key)
            .count();
        if competing == 1 {
            by_split[*i] = Some(*suffix);
            claimed.insert(*suffix);
        }
    }

    let unmatched_requested: Vec<String> = splits
        .iter()
        .zip(&by_split)
        .filter(|(_, suffix)| suffix.is_none())
        .map(|(split, _)| split.raw().to_string())
        .collect();
    let unmatched_produced: Vec<String> = produced
        .iter()
        .filter(|s| !claimed.contains(s.as_str()))
        .cloned()
        .collect();
    if !unmatched_requested.is_empty() || !unmatched_produced.is_empty() {
        return Err(RespackError::UnrecognizedSplits {
            unmatched_requested,
            unmatched_produced,
        });
    }

    Ok(splits
        .iter()
        .zip(by_split)
        .filter_map(|(split, suffix)| suffix.map(|s| (s.to_string(), split.canonical_suffix())))
        .collect())
}

/// Lists the suffixes of the `<package file name>_*` siblings of `package_out`.
pub fn find_split_suffixes(package_out: &Path) -> Result<Vec<String>> {
    let prefix = split_prefix(package_out)?;
    let matcher = GlobBuilder::new(&format!("{}*", escape_glob(&prefix)))
        .literal_separator(true)
        .backslash_escape(true)
        .build()?
        .compile_matcher();

    let dir = output_dir(package_out);
    let mut suffixes = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if matcher.is_match(name) {
            suffixes.push(name[prefix.len()..].to_string());
        }
    }
    suffixes.sort();
    debug!("Found split outputs {:?} in {}", suffixes, dir.display());
    Ok(suffixes)
}

/// Renames the compiler's split outputs to their canonical names and returns the
/// canonical path of every split, in requested order.
pub fn find_and_rename_split_packages(
    package_out: &Path,
    splits: &[SplitSpec],
) -> Result<Vec<PathBuf>> {
    let prefix = split_prefix(package_out)?;
    let produced = find_split_suffixes(package_out)?;
    let mapping = map_filenames_to_splits(&produced, splits)?;

    let dir = output_dir(package_out);
    let mut outputs = Vec::with_capacity(mapping.len());
    for (produced, canonical) in &mapping {
        let target = dir.join(format!("{prefix}{canonical}"));
        if produced != canonical {
            let source = dir.join(format!("{prefix}{produced}"));
            info!("Renaming split {} to {}", source.display(), target.display());
            fs::rename(&source, &target)?;
        }
        outputs.push(target);
    }
    Ok(outputs)
}

fn split_prefix(package_out: &Path) -> Result<String> {
    let name = package_out
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            RespackError::Internal(format!(
                "package output {} has no usable file name",
                package_out.display()
            ))
        })?;
    Ok(format!("{name}_"))
}

fn output_dir(package_out: &Path) -> PathBuf {
    match package_out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
