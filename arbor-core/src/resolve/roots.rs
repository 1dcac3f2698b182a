//! De-duplication of the physical root's children.

use std::path::PathBuf;

use tracing::info;

use crate::fs::{FsEntry, contains_sub_path, normalize_path, paths_equal};

/// Drop exact (case-insensitive) repeats, then every path lying strictly
/// below another one. Order follows first occurrence.
pub fn dedupe_root_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut distinct: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        let normalized = normalize_path(path);
        if !distinct.iter().any(|known| paths_equal(known, &normalized)) {
            distinct.push(normalized);
        }
    }

    distinct
        .iter()
        .filter(|candidate| {
            let nested = distinct
                .iter()
                .any(|other| contains_sub_path(other, candidate));
            if nested {
                info!("found duplicate path: {}", candidate.display());
            }
            !nested
        })
        .cloned()
        .collect()
}

/// Apply [`dedupe_root_paths`] to directory entries; files are kept and
/// appended after the surviving directories.
pub fn normalize_root_path_list(entries: Vec<FsEntry>) -> Vec<FsEntry> {
    let (directories, files): (Vec<FsEntry>, Vec<FsEntry>) =
        entries.into_iter().partition(|entry| entry.is_dir);

    let paths: Vec<PathBuf> =
        directories.iter().map(|entry| entry.path.clone()).collect();
    let survivors = dedupe_root_paths(&paths);

    let mut result: Vec<FsEntry> = survivors
        .iter()
        .filter_map(|survivor| {
            directories
                .iter()
                .find(|entry| paths_equal(&entry.path, survivor))
                .cloned()
        })
        .collect();
    result.extend(files);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(raw: &[&str]) -> Vec<PathBuf> {
        raw.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn nested_roots_collapse_to_the_topmost() {
        let result =
            dedupe_root_paths(&paths(&["/movies", "/movies/action", "/tv"]));
        assert_eq!(result, paths(&["/movies", "/tv"]));
    }

    #[test]
    fn case_only_differences_are_duplicates() {
        let result = dedupe_root_paths(&paths(&[
            "/Media/Movies",
            "/media/movies",
            "/MEDIA/movies/Kids",
        ]));
        assert_eq!(result, paths(&["/Media/Movies"]));
    }

    #[test]
    fn sibling_prefixes_are_not_nested() {
        let result = dedupe_root_paths(&paths(&["/movies", "/movies-4k"]));
        assert_eq!(result, paths(&["/movies", "/movies-4k"]));
    }

    #[test]
    fn files_survive_normalization() {
        let entries = vec![
            FsEntry::file("/data/root/default/Movies/movies.collection", 0),
            FsEntry::directory("/movies/action"),
            FsEntry::directory("/movies"),
        ];
        let result = normalize_root_path_list(entries);
        let names: Vec<_> =
            result.iter().map(|entry| entry.path.clone()).collect();
        assert_eq!(
            names,
            paths(&["/movies", "/data/root/default/Movies/movies.collection"])
        );
    }
}
