//! LaTeX-safe package paths.
//!
//! Entity references become relative paths usable both as zip entry names
//! and as `\include` / `\includegraphics` arguments. Cleaning can map two
//! names to the same string, so the leaf segment carries a numeric suffix
//! hashed from the original name.

use crate::model::{EntityReference, EntityType};
use md5::{Digest, Md5};
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Directory holding stored attachments.
pub const ATTACHMENTS_DIR: &str = "files/attachments";

/// Directory holding downloaded remote resources.
pub const DOWNLOADS_DIR: &str = "files/downloaded";

/// Name of the generated master file.
pub const INDEX_FILE: &str = "index.tex";

/// Characters LaTeX reserves, plus the path separator.
const RESERVED: &[char] = &['\\', '{', '}', '#', '$', '%', '&', '^', '_', '~', '/'];

/// Clean one name into a LaTeX-safe path segment.
pub fn clean_segment(name: &str) -> String {
    let normalized: String = name.nfc().collect();
    let mut out = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        if c.is_whitespace() || RESERVED.contains(&c) {
            continue;
        }
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            let encoded = urlencoding::encode(c.encode_utf8(&mut buf));
            out.extend(encoded.chars().filter(|&c| c != '%'));
        }
    }
    out
}

/// Deterministic numeric hash of a name.
pub fn name_hash(name: &str) -> u32 {
    let digest = Md5::digest(name.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Hex digest of a string, used for download directories.
pub fn hex_digest(value: &str) -> String {
    Md5::digest(value.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Clean the leaf name and add its hash suffix.
///
/// With `split_extension` the suffix goes before the extension.
fn leaf_segment(name: &str, split_extension: bool) -> String {
    let suffix = name_hash(name);
    let cleaned = clean_segment(name);
    if split_extension {
        if let Some((stem, ext)) = cleaned.rsplit_once('.') {
            if !stem.is_empty() && !ext.is_empty() {
                return format!("{}{}.{}", stem, suffix, ext);
            }
        }
    }
    format!("{}{}", cleaned, suffix)
}

/// Serialize a full entity chain into a relative path.
pub fn serialize(reference: &EntityReference) -> String {
    let segments = reference.segments();
    let last = segments.len().saturating_sub(1);
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i == last {
                leaf_segment(
                    &segment.name,
                    segment.entity_type == EntityType::Attachment,
                )
            } else {
                clean_segment(&segment.name)
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Package path of a stored attachment.
pub fn attachment_path(attachment: &EntityReference) -> String {
    format!("{}/{}", ATTACHMENTS_DIR, serialize(attachment))
}

/// Package path of a rendered document, without the `.tex` extension.
pub fn document_path(document: &EntityReference) -> String {
    serialize(&document.document_reference())
}

/// Package path of a downloaded resource.
///
/// The URL hash keeps same-named files of one host apart.
pub fn download_path(url: &Url) -> String {
    let host = url.host_str().map(clean_segment).unwrap_or_default();
    let host = if host.is_empty() { "local".to_string() } else { host };

    let file_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
        .map(|s| clean_segment(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "download".to_string());

    format!(
        "{}/{}/{}/{}",
        DOWNLOADS_DIR,
        host,
        hex_digest(url.as_str()),
        file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> EntityReference {
        EntityReference::document("wiki", &["space"], "page")
    }

    #[test]
    fn test_clean_segment() {
        assert_eq!(clean_segment("My Page"), "MyPage");
        assert_eq!(clean_segment("a_b#c$d%e&f^g~h{i}j\\k"), "abcdefghijk");
        assert_eq!(clean_segment("café"), "cafC3A9");
        assert!(!clean_segment("100% ünïcode").contains('%'));
    }

    #[test]
    fn test_attachment_path_shape() {
        let path = attachment_path(&page().attachment("test.txt"));
        let suffix = name_hash("test.txt");
        assert_eq!(path, format!("files/attachments/wiki/space/page/test{}.txt", suffix));
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let a = page().attachment("some file.png");
        assert_eq!(serialize(&a), serialize(&a));
        assert_eq!(serialize(&a), serialize(&page().attachment("some file.png")));
    }

    #[test]
    fn test_collapsed_names_stay_distinct() {
        let a = serialize(&page().attachment("pa___ge"));
        let b = serialize(&page().attachment("page"));
        assert_ne!(a, b);
        assert!(a.starts_with("wiki/space/page/page"));
        assert!(b.starts_with("wiki/space/page/page"));
    }

    #[test]
    fn test_document_path_has_no_extension_split() {
        let doc = EntityReference::document("wiki", &["My Space"], "Release 1.2");
        let path = document_path(&doc);
        assert_eq!(
            path,
            format!("wiki/MySpace/Release1.2{}", name_hash("Release 1.2"))
        );
    }

    #[test]
    fn test_download_path() {
        let a = Url::parse("https://img.example.com/a/logo.png").unwrap();
        let b = Url::parse("https://img.example.com/b/logo.png").unwrap();
        let pa = download_path(&a);
        let pb = download_path(&b);
        assert!(pa.starts_with("files/downloaded/img.example.com/"));
        assert!(pa.ends_with("/logo.png"));
        assert_ne!(pa, pb);

        let root = Url::parse("https://example.com/").unwrap();
        assert!(download_path(&root).ends_with("/download"));
    }
}
