//! Object key generation and filename handling.

use chrono::Utc;
use uuid::Uuid;

const MAX_STEM_LEN: usize = 50;

/// Split a client-supplied filename into a sanitized stem and a lowercased
/// extension (including the dot, or empty).
///
/// Directory components are discarded. The stem keeps ASCII alphanumerics,
/// `-` and `_`; whitespace becomes `_`; everything else is dropped.
pub fn sanitize_filename(name: &str) -> (String, String) {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();

    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.trim_matches('.').is_empty() => (stem, ext),
        _ => (base, ""),
    };

    let mut clean: String = stem
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .take(MAX_STEM_LEN)
        .collect();
    if clean.trim_matches('_').is_empty() {
        clean = "file".to_string();
    }

    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    let ext = if ext.is_empty() { ext } else { format!(".{}", ext) };

    (clean, ext)
}

/// Lowercased extension of `name` without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = sanitize_filename(name);
    ext.strip_prefix('.').map(String::from)
}

/// Normalized folder path. `.` and `..` segments, empty segments and any
/// character outside `[A-Za-z0-9_-]` are dropped.
pub fn sanitize_folder(folder: &str) -> String {
    folder
        .split(|c: char| c == '/' || c == '\\')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// `folder/name` with the folder normalized. An empty folder yields the
/// bare name.
pub fn join_key(folder: &str, name: &str) -> String {
    let folder = sanitize_folder(folder);
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

/// Collision-resistant key: `folder/{timestamp}_{8 hex}_{stem}{ext}`.
pub fn generate_key(folder: &str, original_name: &str) -> String {
    let (stem, ext) = sanitize_filename(original_name);
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let id = Uuid::new_v4().simple().to_string();
    join_key(folder, &format!("{}_{}_{}{}", timestamp, &id[..8], stem, ext))
}

/// Key for an upload: `folder/{name}` with a sanitized custom name, or a
/// generated key from `original_name`.
pub fn object_key(folder: &str, original_name: &str, custom_name: Option<&str>) -> String {
    match custom_name {
        Some(name) => {
            let (stem, ext) = sanitize_filename(name);
            join_key(folder, &format!("{}{}", stem, ext))
        }
        None => generate_key(folder, original_name),
    }
}

/// Content type guessed from the extension.
pub fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Resume.PDF"), ("My_Resume".into(), ".pdf".into()));
        assert_eq!(sanitize_filename("../../etc/passwd"), ("passwd".into(), "".into()));
        assert_eq!(sanitize_filename("C:\\docs\\cv (1).docx"), ("cv_1".into(), ".docx".into()));
        assert_eq!(sanitize_filename("#$%.png"), ("file".into(), ".png".into()));
        assert_eq!(sanitize_filename(".bashrc"), ("bashrc".into(), "".into()));
        assert_eq!(sanitize_filename(""), ("file".into(), "".into()));
        assert_eq!(sanitize_filename("archive.tar.gz"), ("archivetar".into(), ".gz".into()));
    }

    #[test]
    fn test_long_stem_truncated() {
        let (stem, ext) = sanitize_filename(&format!("{}.jpg", "a".repeat(200)));
        assert_eq!(stem.len(), MAX_STEM_LEN);
        assert_eq!(ext, ".jpg");
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_key("/profiles/", "Head Shot.JPG");
        let (folder, name) = key.split_once('/').unwrap();
        assert_eq!(folder, "profiles");

        let parts: Vec<&str> = name.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 14);
        assert!(parts[0].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[2], "Head_Shot.jpg");
    }

    #[test]
    fn test_generated_keys_unique() {
        let keys: HashSet<String> = (0..1000).map(|_| generate_key("uploads", "cv.pdf")).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_folder_is_normalized() {
        assert_eq!(sanitize_folder("../../etc"), "etc");
        assert_eq!(sanitize_folder("avatars/./2024//"), "avatars/2024");
        assert_eq!(sanitize_folder("a\\b\u{0}c/\td"), "a/bc/d");
        assert_eq!(sanitize_folder(".."), "");
        assert_eq!(join_key("../secret/", "a.png"), "secret/a.png");
    }

    #[test]
    fn test_custom_name_is_sanitized() {
        assert_eq!(object_key("uploads", "ok.png", Some("../evil name.HTML")), "uploads/evil_name.html");
        assert_eq!(object_key("/../", "ok.png", Some("logo.png")), "logo.png");
        assert!(object_key("uploads", "cv.pdf", None).ends_with("_cv.pdf"));
    }

    #[test]
    fn test_join_key_and_content_type() {
        assert_eq!(join_key("", "a.png"), "a.png");
        assert_eq!(join_key("logos/", "a.png"), "logos/a.png");
        assert_eq!(content_type_for("x.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("x.bin"), "application/octet-stream");
        assert_eq!(extension_of("report.Pdf").as_deref(), Some("pdf"));
        assert_eq!(extension_of("README"), None);
    }
}
