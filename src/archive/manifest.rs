//! Jar manifest parsing: which entries carry a signature digest.

use std::collections::BTreeSet;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Names of per-entry manifest sections that have a `*Digest*` attribute.
///
/// Sections are separated by blank lines; a line starting with a single space
/// continues the previous line. The main section (no `Name:`) is ignored.
pub fn parse_signed_entries(manifest: &str) -> BTreeSet<String> {
    let mut signed = BTreeSet::new();

    for section in split_sections(manifest) {
        let mut name = None;
        let mut has_digest = false;

        for line in &section {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("Name") {
                name = Some(value.trim().to_string());
            } else if key.contains("Digest") {
                has_digest = true;
            }
        }

        if let (Some(name), true) = (name, has_digest) {
            signed.insert(name);
        }
    }

    signed
}

/// Logical lines grouped by section, continuations already joined
fn split_sections(manifest: &str) -> Vec<Vec<String>> {
    let mut sections = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for raw in manifest.lines() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
        } else if let Some(continuation) = line.strip_prefix(' ') {
            match current.last_mut() {
                Some(previous) => previous.push_str(continuation),
                None => current.push(continuation.to_string()),
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        sections.push(current);
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_sections_are_signed() {
        let manifest = "Manifest-Version: 1.0\r\n\
                        Created-By: test\r\n\
                        SHA-256-Digest-Manifest: main=\r\n\
                        \r\n\
                        Name: assets/logo.png\r\n\
                        SHA-256-Digest: abc=\r\n\
                        \r\n\
                        Name: assets/plain.png\r\n\
                        Content-Type: image/png\r\n";

        let signed = parse_signed_entries(manifest);
        assert_eq!(signed.len(), 1);
        assert!(signed.contains("assets/logo.png"));
    }

    #[test]
    fn test_continuation_lines_are_joined() {
        let manifest = "Manifest-Version: 1.0\n\n\
                        Name: assets/a/very/long/path/that/wraps/aro\n \
                        und/texture.png\n\
                        SHA1-Digest: xyz=\n";

        let signed = parse_signed_entries(manifest);
        assert!(signed.contains("assets/a/very/long/path/that/wraps/around/texture.png"));
    }

    #[test]
    fn test_empty_manifest() {
        assert!(parse_signed_entries("").is_empty());
    }
}
