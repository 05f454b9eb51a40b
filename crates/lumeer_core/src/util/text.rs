//! Text cleanup and avatar helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static HTML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));
static TRAILING_PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%+\s*$").expect("valid trailing percent regex"));

/// Removes HTML tags and decodes the few entities rich text editors emit.
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG_RE
        .replace_all(text, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Drops trailing percent signs, e.g. `"42%"` -> `"42"`.
pub fn strip_trailing_percent(text: &str) -> String {
    TRAILING_PERCENT_RE.replace(text.trim(), "").into_owned()
}

/// Gravatar URL for an email (SHA-256 of the normalized address).
pub fn avatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let hash: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("https://www.gravatar.com/avatar/{hash}?r=g&d=retro")
}

#[cfg(test)]
mod tests {
    use super::{avatar_url, strip_html_tags, strip_trailing_percent};

    #[test]
    fn strips_tags_and_entities() {
        assert_eq!(strip_html_tags("<p>Plan <b>A</b> &amp; B</p>"), "Plan A & B");
        assert_eq!(strip_html_tags("plain"), "plain");
    }

    #[test]
    fn strips_percent_suffix() {
        assert_eq!(strip_trailing_percent("42%"), "42");
        assert_eq!(strip_trailing_percent("42.5 %%"), "42.5 ");
        assert_eq!(strip_trailing_percent("7"), "7");
    }

    #[test]
    fn avatar_hash_ignores_case_and_whitespace() {
        let url = avatar_url(" Ann@Lumeer.io ");
        assert_eq!(url, avatar_url("ann@lumeer.io"));
        assert!(url.starts_with("https://www.gravatar.com/avatar/"));
        assert!(url.ends_with("?r=g&d=retro"));
        assert_eq!(url.len(), "https://www.gravatar.com/avatar/".len() + 64 + "?r=g&d=retro".len());
    }
}
