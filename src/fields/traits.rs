//! Content classification of download items.
//!
//! The file type histogram weighs each extension by the bytes it contributes,
//! and backs the `kind`, `kind_N`, and `traits` fields.

use super::value::FileEntry;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

pub const KIND_AUDIO: &[&str] = &["flac", "mp3", "ogg", "wav", "dts", "ac3", "alac", "wma"];
pub const KIND_VIDEO: &[&str] = &[
    "avi", "mkv", "m4v", "vob", "mp4", "mpg", "mpeg", "m2ts", "ts", "ogv", "wmv",
];
pub const KIND_IMAGE: &[&str] = &["jpg", "png", "gif", "tif", "bmp", "svg"];
pub const KIND_DOCS: &[&str] = &[
    "chm", "pdf", "cbr", "cbz", "odt", "ods", "doc", "xls", "ppt", "epub", "mobi", "azw3", "djvu",
];
pub const KIND_ARCHIVE: &[&str] = &["rar", "zip", "tgz", "bz2", "iso", "bin"];

const DEFINITELY_TV: &[&str] = &[".hdtv.", ".pdtv.", ".dsr."];

const BAD_TITLE_WORDS: &[&str] = &[
    "bdrip", "brrip", "hdrip", "dvdrip", "ntsc", "hdtv", "dvd-r", "dvdr", "dvd5", "dvd9", "web-dl",
    "blu-ray", "bluray", "bd25", "bd50", "480p", "576p", "720p", "1080p", "2160p", "mp3", "ac3",
    "dts",
];

static TV_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Normal episodes: Show.S01E02 / Show.1x02
        r"(?i)^(?P<show>.+?)[._ ]S?(?P<season>\d{1,2})[xE](?P<episode>\d{2}(?:-?E\d{2})?)",
        // Daily shows
        r"(?i)^(?P<show>.+?)[._ ](?P<date>\d{4}\.\d{2}\.\d{2})",
        // Full seasons
        r"(?i)^(?P<show>.+?)[._ ]S(?P<season>\d{1,2})(?:[._ -]|$)",
        // Mini series
        r"(?i)^(?P<show>.+?)[._ ](?:Part[._ ]?(?:\d+|[ivx]{1,3})|Pilot)(?:[._ -]|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid tv pattern"))
    .collect()
});

static MOVIE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^(?P<show>.+?)[._ ][\[(]?(?P<year>\d{4})[)\]]?(?:[._ ]\w+)*?[._ ](?:BDRip|BRRip|HDRip|DVDRip|PAL|NTSC)(?:[._ -]|$)",
        r"(?i)^(?P<show>.+?)[._ ][\[(]?(?P<year>\d{4})[)\]]?(?:[._ ]\w+)*?[._ ](?:Blu-ray|BluRay|BD25|BD50)(?:[._ -]|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid movie pattern"))
    .collect()
});

/// Normalized extension of a file path, without the dot.
fn file_type(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ext.len() > 1 && ext.starts_with('r') && ext[1..].chars().all(|c| c.is_ascii_digit()) {
        "rar".to_string()
    } else if ext == "jpeg" {
        "jpg".to_string()
    } else if ext == "mpeg" {
        "mpg".to_string()
    } else {
        ext
    }
}

/// File types and their weight in percent, sorted in descending order.
pub fn get_filetypes(files: &[FileEntry]) -> Vec<(u32, String)> {
    let mut histo: BTreeMap<String, u64> = BTreeMap::new();
    for file in files {
        *histo.entry(file_type(&file.path)).or_default() += file.size;
    }

    let total: u64 = histo.values().sum();
    let mut weighted: Vec<(u32, String)> = histo
        .into_iter()
        .map(|(ext, size)| {
            let percent = if total > 0 {
                (size as f64 * 100.0 / total as f64 + 0.499) as u32
            } else {
                0
            };
            (percent, ext)
        })
        .collect();
    weighted.sort_by(|a, b| b.cmp(a));
    weighted
}

/// Non-empty file types making up at least `limit` percent of the total size.
pub fn dominant_kinds(files: &[FileEntry], limit: u32) -> Vec<String> {
    get_filetypes(files)
        .into_iter()
        .filter(|(percent, ext)| !ext.is_empty() && *percent >= limit)
        .map(|(_, ext)| ext)
        .collect()
}

fn has_bad_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    BAD_TITLE_WORDS.iter().any(|word| lower.contains(word))
}

/// Content type guessed from an item name: `tv`, `movie`, or nothing.
pub fn name_trait(name: &str) -> Option<&'static str> {
    if name.is_empty() || name.starts_with("VTS_") {
        return None;
    }

    let lower = name.to_lowercase();
    let definitely_tv = DEFINITELY_TV.iter().any(|marker| lower.contains(marker));
    let mut candidates: Vec<(&'static str, &Vec<Regex>)> = vec![("tv", &*TV_PATTERNS)];
    if !definitely_tv {
        candidates.push(("movie", &*MOVIE_PATTERNS));
    }

    for (kind, patterns) in candidates {
        let hit = patterns.iter().any(|pattern| {
            pattern
                .captures(name)
                .and_then(|caps| caps.name("show"))
                .is_some_and(|show| !has_bad_title(show.as_str()))
        });
        if hit {
            return Some(kind);
        }
    }

    definitely_tv.then_some("tv")
}

/// Hierarchical classifiers like `["tv", "mkv"]` or `["audio", "flac"]`.
pub fn detect_traits(
    name: &str,
    alias: Option<&str>,
    filetype: Option<&str>,
    traits_by_alias: &HashMap<String, String>,
) -> Vec<String> {
    let filetype = filetype.map(|ft| ft.trim_start_matches('.'));
    let ft = filetype.unwrap_or_default();

    if let Some(theme) = alias.and_then(|alias| traits_by_alias.get(alias)) {
        return vec![theme.clone(), filetype.unwrap_or("other").to_string()];
    }

    let (mut kind, refine) = if KIND_AUDIO.contains(&ft) {
        ("audio", false)
    } else if KIND_VIDEO.contains(&ft) {
        ("video", true)
    } else if KIND_IMAGE.contains(&ft) {
        ("img", false)
    } else if KIND_DOCS.contains(&ft) {
        ("docs", false)
    } else if KIND_ARCHIVE.contains(&ft) {
        ("misc", true)
    } else {
        return Vec::new();
    };

    if refine {
        if let Some(contents) = name_trait(name) {
            kind = contents;
        }
    }

    vec![kind.to_string(), ft.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, u64)]) -> Vec<FileEntry> {
        entries
            .iter()
            .map(|(path, size)| FileEntry::new(*path, *size))
            .collect()
    }

    #[test]
    fn test_filetypes_are_weighted_by_size() {
        let histo = get_filetypes(&files(&[
            ("album/01.flac", 800),
            ("album/cover.JPEG", 150),
            ("album/info.nfo", 50),
        ]));
        assert_eq!(
            histo,
            vec![
                (80, "flac".to_string()),
                (15, "jpg".to_string()),
                (5, "nfo".to_string())
            ]
        );
    }

    #[test]
    fn test_split_rar_volumes_count_as_rar() {
        let histo = get_filetypes(&files(&[("x.r00", 50), ("x.r01", 50)]));
        assert_eq!(histo, vec![(100, "rar".to_string())]);
    }

    #[test]
    fn test_dominant_kinds_respects_limit() {
        let list = files(&[("a.mkv", 900), ("a.nfo", 50), ("README", 50)]);
        assert_eq!(dominant_kinds(&list, 50), vec!["mkv".to_string()]);
        assert_eq!(
            dominant_kinds(&list, 0),
            vec!["mkv".to_string(), "nfo".to_string()]
        );
    }

    #[test]
    fn test_name_trait() {
        assert_eq!(name_trait("Some.Show.S01E02.720p.HDTV.x264-GRP"), Some("tv"));
        assert_eq!(name_trait("A.Movie.2010.720p.BDRip.x264-GRP"), Some("movie"));
        assert_eq!(name_trait("VTS_01_1"), None);
        assert_eq!(name_trait("holiday pictures"), None);
    }

    #[test]
    fn test_detect_traits() {
        let themes = HashMap::from([("music".to_string(), "audio".to_string())]);
        assert_eq!(
            detect_traits("x", None, Some("flac"), &themes),
            vec!["audio", "flac"]
        );
        assert_eq!(
            detect_traits("Show.S02E03.HDTV", None, Some("mkv"), &themes),
            vec!["tv", "mkv"]
        );
        assert_eq!(
            detect_traits("anything", Some("music"), None, &themes),
            vec!["audio", "other"]
        );
        assert!(detect_traits("x", None, Some("nfo"), &themes).is_empty());
    }
}
