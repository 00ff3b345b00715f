/// Maximum length of a sanitized path segment, in characters.
pub const MAX_SEGMENT_CHARS: usize = 200;

/// Extension of generated pointer files.
pub const STRM_EXTENSION: &str = "strm";

/// Playable media, represented locally by a pointer file.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "flv", "ts", "iso", "rmvb", "m2ts",
];

/// Subtitle sidecars, downloaded in full.
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "txt", "vtt", "ttml", "dfxp"];

/// How the synchronizer treats a remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Directory,
    Media,
    Sidecar,
    Ignored,
}

/// Turn an arbitrary remote name into a single safe path segment.
///
/// Replaces `\ / : * ? < > | " TAB` with `_`, trims surrounding whitespace and
/// caps the result at [`MAX_SEGMENT_CHARS`] characters. Non-ASCII is kept.
/// Names that would resolve to the current or parent directory (empty, `.`,
/// `..`) become `_`. The function is a fixed point on its own output.
pub fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '<' | '>' | '|' | '\t' | '"' => '_',
            other => other,
        })
        .collect();
    let truncated: String = replaced.trim().chars().take(MAX_SEGMENT_CHARS).collect();
    let clean = truncated.trim_end();
    match clean {
        "" | "." | ".." => "_".to_string(),
        _ => clean.to_string(),
    }
}

/// Split a filename into stem and extension (extension without the dot).
///
/// Leading dots belong to the stem, so `.hidden` has no extension.
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    let leading_dots = filename.len() - filename.trim_start_matches('.').len();
    match filename[leading_dots..].rfind('.') {
        Some(pos) => {
            let dot = leading_dots + pos;
            (&filename[..dot], Some(&filename[dot + 1..]))
        }
        None => (filename, None),
    }
}

/// Lower-cased text after the last dot, if any.
///
/// Unlike [`split_extension`] a dotfile counts: `.srt` has extension `srt`.
fn suffix_after_dot(filename: &str) -> Option<String> {
    filename
        .rfind('.')
        .map(|pos| filename[pos + 1..].to_lowercase())
}

/// Classify a remote entry by type and filename extension.
///
/// With `sidecar_only` set, media files are ignored instead of getting a
/// pointer file.
pub fn classify(name: &str, is_directory: bool, sidecar_only: bool) -> ItemKind {
    if is_directory {
        return ItemKind::Directory;
    }
    let Some(ext) = suffix_after_dot(name) else {
        return ItemKind::Ignored;
    };
    if !sidecar_only && MEDIA_EXTENSIONS.contains(&ext.as_str()) {
        ItemKind::Media
    } else if SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
        ItemKind::Sidecar
    } else {
        ItemKind::Ignored
    }
}

/// Pointer filename for a media file: sanitized stem plus `.strm`.
pub fn strm_file_name(media_name: &str) -> String {
    let (stem, _) = split_extension(media_name);
    format!("{}.{}", sanitize_name(stem), STRM_EXTENSION)
}
