//! Set difference between the source listing and the bucket's key set.

use bridge_traits::source::SourceFile;
use std::collections::HashSet;

/// A source file that has no marker yet, paired with the key its marker
/// will be written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorCandidate {
    pub file: SourceFile,
    pub key: String,
}

/// Files whose marker key is absent from `existing`, in source order.
///
/// A file id listed more than once is emitted only for its first occurrence.
pub fn select_new_files<F>(
    files: &[SourceFile],
    existing: &HashSet<String>,
    key_for: F,
) -> Vec<MirrorCandidate>
where
    F: Fn(&str) -> String,
{
    let mut seen = HashSet::with_capacity(files.len());

    files
        .iter()
        .filter(|file| seen.insert(file.id.as_str()))
        .filter_map(|file| {
            let key = key_for(&file.id);
            (!existing.contains(&key)).then(|| MirrorCandidate {
                file: file.clone(),
                key,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str) -> SourceFile {
        SourceFile::new(id, format!("{}.txt", id), None)
    }

    fn keys(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn ids(candidates: &[MirrorCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.file.id.as_str()).collect()
    }

    #[test]
    fn test_keeps_source_order() {
        let files = vec![file("C"), file("B"), file("A")];
        let selected = select_new_files(&files, &keys(&["B"]), str::to_string);

        assert_eq!(ids(&selected), vec!["C", "A"]);
        assert_eq!(selected[0].key, "C");
    }

    #[test]
    fn test_everything_known() {
        let files = vec![file("A"), file("B")];
        assert!(select_new_files(&files, &keys(&["A", "B", "Z"]), str::to_string).is_empty());
    }

    #[test]
    fn test_duplicate_ids_emitted_once() {
        let files = vec![file("A"), file("B"), file("A")];
        let selected = select_new_files(&files, &HashSet::new(), str::to_string);

        assert_eq!(ids(&selected), vec!["A", "B"]);
    }

    #[test]
    fn test_prefixed_keys() {
        let files = vec![file("A"), file("B")];
        let selected = select_new_files(&files, &keys(&["drive/A", "B"]), |id| {
            format!("drive/{}", id)
        });

        assert_eq!(ids(&selected), vec!["B"]);
        assert_eq!(selected[0].key, "drive/B");
    }
}
