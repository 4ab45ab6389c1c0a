//! Citation sanitizer: every bracketed tag surviving in generated text must
//! be a member of the retrieved evidence set. Invalid tags are deleted in
//! place; if nothing valid remains, a fallback citation block is appended
//! so a retrieval-path answer is never uncited while evidence exists.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]").expect("hardcoded regex"));

/// Remove every `[tag]` whose inner text is not exactly an allowed tag,
/// preserving surrounding text. If no allowed tag remains afterwards,
/// append the fallback tags (bracketed, space-separated) after trimming
/// trailing whitespace.
pub fn sanitize_citations(text: &str, allowed: &[String], fallback: &[String]) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut any_allowed = false;
    for caps in BRACKETED.captures_iter(text) {
        let m = caps.get(0).expect("whole match");
        let inner = &caps[1];
        if allowed.iter().any(|tag| tag == inner) {
            any_allowed = true;
            continue;
        }
        cleaned.push_str(&text[cursor..m.start()]);
        cursor = m.end();
    }
    cleaned.push_str(&text[cursor..]);

    if !any_allowed && !fallback.is_empty() {
        let tags: Vec<String> = fallback.iter().map(|t| format!("[{t}]")).collect();
        let mut out = cleaned.trim_end().to_string();
        out.push(' ');
        out.push_str(&tags.join(" "));
        return out;
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::sanitize_citations;

    fn tags(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn invalid_tags_are_deleted_and_valid_tags_kept() {
        let allowed = tags(&["doc_a@0:10"]);
        let out = sanitize_citations("X [doc_a@0:10] Y [evil@0:0] Z", &allowed, &allowed);
        assert_eq!(out, "X [doc_a@0:10] Y  Z");
    }

    #[test]
    fn fallback_appends_when_nothing_valid_remains() {
        let allowed = tags(&["doc_a@0:10", "doc_b@5:15"]);
        let out = sanitize_citations("no citations here", &allowed, &allowed);
        assert_eq!(out, "no citations here [doc_a@0:10] [doc_b@5:15]");
    }

    #[test]
    fn fallback_fires_after_every_tag_was_invalid() {
        let allowed = tags(&["doc_a@0:10"]);
        let out = sanitize_citations("claim [made_up@1:2].", &allowed, &allowed);
        assert_eq!(out, "claim . [doc_a@0:10]");
    }

    #[test]
    fn trailing_whitespace_is_trimmed_before_fallback() {
        let allowed = tags(&["doc_a@0:10"]);
        let out = sanitize_citations("answer   \n", &allowed, &allowed);
        assert_eq!(out, "answer [doc_a@0:10]");
    }

    #[test]
    fn empty_text_stays_empty() {
        let allowed = tags(&["doc_a@0:10"]);
        assert_eq!(sanitize_citations("", &allowed, &allowed), "");
    }
}
