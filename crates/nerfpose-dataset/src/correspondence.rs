use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// How a recorded name was matched to a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The recorded name exists verbatim on disk.
    Exact,
    /// Taken from the caller supplied mapping.
    Explicit,
    /// Paired by sorted position; not verified.
    Positional,
}

/// Matching policy for [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrespondenceConfig {
    /// Pair the leftover names by sorted position when both sets have the same size.
    pub positional_fallback: bool,
    /// Recorded name to on-disk name, checked before anything else.
    pub mapping: BTreeMap<String, String>,
}

/// A resolved correspondence between recorded names and on-disk names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileCorrespondenceMap {
    entries: BTreeMap<String, (String, MatchKind)>,
    unmapped: Vec<String>,
}

impl FileCorrespondenceMap {
    /// On-disk name of a recorded name, if resolved.
    pub fn get(&self, recorded: &str) -> Option<&str> {
        self.entries.get(recorded).map(|(actual, _)| actual.as_str())
    }

    /// Match kind of a recorded name, if resolved.
    pub fn kind(&self, recorded: &str) -> Option<MatchKind> {
        self.entries.get(recorded).map(|(_, kind)| *kind)
    }

    /// Resolved pairs in recorded-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, MatchKind)> {
        self.entries
            .iter()
            .map(|(recorded, (actual, kind))| (recorded.as_str(), actual.as_str(), *kind))
    }

    /// Recorded names that could not be resolved, sorted.
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }

    /// Number of resolved names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when at least one pair came from the positional fallback.
    pub fn has_positional(&self) -> bool {
        self.entries
            .values()
            .any(|(_, kind)| *kind == MatchKind::Positional)
    }
}

/// Reconcile the image names recorded by the reconstruction with the files on disk.
///
/// Each recorded name is matched, in order of preference, through the explicit
/// mapping of `config` (when its target exists), then verbatim. With the
/// positional fallback enabled and equally sized sets, the names left over are
/// sorted and paired by index. Everything else is reported as unmapped.
///
/// No on-disk name is used twice, so with equally sized sets and the fallback
/// enabled the result is a bijection.
///
/// # Arguments
///
/// * `actual_file_names` - File names found on disk.
/// * `recorded_names` - Names stored in the reconstruction.
/// * `config` - The matching policy.
pub fn resolve<A, R>(
    actual_file_names: &[A],
    recorded_names: &[R],
    config: &CorrespondenceConfig,
) -> FileCorrespondenceMap
where
    A: AsRef<str>,
    R: AsRef<str>,
{
    let actual = actual_file_names
        .iter()
        .map(|s| s.as_ref().to_string())
        .collect::<BTreeSet<_>>();
    let recorded = recorded_names
        .iter()
        .map(|s| s.as_ref().to_string())
        .collect::<BTreeSet<_>>();

    let mut entries = BTreeMap::new();
    let mut used = BTreeSet::new();

    for name in recorded.iter() {
        let Some(target) = config.mapping.get(name) else {
            continue;
        };
        if actual.contains(target) && !used.contains(target) {
            used.insert(target.clone());
            entries.insert(name.clone(), (target.clone(), MatchKind::Explicit));
        } else {
            log::warn!("mapping target {target} for {name} is not available on disk");
        }
    }

    for name in recorded.iter() {
        if entries.contains_key(name) {
            continue;
        }
        if actual.contains(name) && !used.contains(name) {
            used.insert(name.clone());
            entries.insert(name.clone(), (name.clone(), MatchKind::Exact));
        }
    }

    let leftover_recorded = recorded
        .iter()
        .filter(|name| !entries.contains_key(*name))
        .cloned()
        .collect::<Vec<_>>();
    let leftover_actual = actual
        .iter()
        .filter(|name| !used.contains(*name))
        .cloned()
        .collect::<Vec<_>>();

    let mut unmapped = leftover_recorded;

    if !unmapped.is_empty() {
        if config.positional_fallback && actual.len() == recorded.len() {
            // both sides consumed the same number of names so the leftovers match in size
            for (recorded, actual) in unmapped.drain(..).zip(leftover_actual) {
                log::warn!("positional match {recorded} -> {actual}, not verified");
                entries.insert(recorded, (actual, MatchKind::Positional));
            }
        } else {
            log::warn!(
                "{} recorded names have no file on disk ({} files, {} recorded)",
                unmapped.len(),
                actual.len(),
                recorded.len()
            );
        }
    }

    FileCorrespondenceMap { entries, unmapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional() -> CorrespondenceConfig {
        CorrespondenceConfig {
            positional_fallback: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_match() {
        let actual = ["a.png", "b.png", "c.png"];
        let recorded = ["b.png", "a.png"];
        let map = resolve(&actual, &recorded, &CorrespondenceConfig::default());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a.png"), Some("a.png"));
        assert_eq!(map.kind("b.png"), Some(MatchKind::Exact));
        assert!(map.unmapped().is_empty());
    }

    #[test]
    fn test_positional_bijection() {
        let actual = ["img_0.jpg", "img_1.jpg", "img_2.jpg", "img_3.jpg", "img_4.jpg"];
        let recorded = ["0004.png", "0000.png", "0002.png", "0001.png", "0003.png"];
        let map = resolve(&actual, &recorded, &positional());

        assert_eq!(map.len(), 5);
        assert!(map.unmapped().is_empty());
        assert!(map.has_positional());
        assert_eq!(map.get("0000.png"), Some("img_0.jpg"));
        assert_eq!(map.get("0004.png"), Some("img_4.jpg"));

        let targets = map.iter().map(|(_, a, _)| a).collect::<BTreeSet<_>>();
        assert_eq!(targets.len(), 5);
    }

    #[test]
    fn test_positional_is_opt_in() {
        let actual = ["x.jpg", "y.jpg"];
        let recorded = ["a.png", "b.png"];
        let map = resolve(&actual, &recorded, &CorrespondenceConfig::default());
        assert!(map.is_empty());
        assert_eq!(map.unmapped(), ["a.png", "b.png"]);
    }

    #[test]
    fn test_count_mismatch_reports_unmapped() {
        let actual = ["a.png", "b.png", "c.png", "d.png", "e.png"];
        let recorded = ["a.png", "x.png", "y.png"];
        let map = resolve(&actual, &recorded, &positional());

        assert!(map.len() <= 3);
        assert_eq!(map.get("a.png"), Some("a.png"));
        assert_eq!(map.unmapped(), ["x.png", "y.png"]);
        assert!(!map.has_positional());
    }

    #[test]
    fn test_positional_pairs_leftovers_only() {
        let actual = ["a.png", "m.png", "n.png"];
        let recorded = ["a.png", "q.png", "p.png"];
        let map = resolve(&actual, &recorded, &positional());

        assert_eq!(map.kind("a.png"), Some(MatchKind::Exact));
        assert_eq!(map.get("p.png"), Some("m.png"));
        assert_eq!(map.get("q.png"), Some("n.png"));
        assert_eq!(map.kind("q.png"), Some(MatchKind::Positional));
    }

    #[test]
    fn test_explicit_mapping() {
        let actual = ["a.png", "b.png"];
        let recorded = ["frame_b", "a.png", "frame_z"];
        let config = CorrespondenceConfig {
            positional_fallback: false,
            mapping: BTreeMap::from([
                ("frame_b".to_string(), "b.png".to_string()),
                ("frame_z".to_string(), "z.png".to_string()),
            ]),
        };
        let map = resolve(&actual, &recorded, &config);

        assert_eq!(map.get("frame_b"), Some("b.png"));
        assert_eq!(map.kind("frame_b"), Some(MatchKind::Explicit));
        assert_eq!(map.kind("a.png"), Some(MatchKind::Exact));
        // the target of frame_z does not exist
        assert_eq!(map.unmapped(), ["frame_z"]);
    }
}
