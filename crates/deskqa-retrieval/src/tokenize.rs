//! Index-term tokenization.
//!
//! A token is a run of ASCII alphanumerics, optionally continued once by
//! an internal apostrophe ("don't" stays one token). Everything else is a
//! boundary. Input is lowercased; the function is pure and deterministic.

pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_apostrophe = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            current.push(c);
        } else if c == '\''
            && !current.is_empty()
            && !has_apostrophe
            && chars.peek().is_some_and(|n| n.is_ascii_alphanumeric())
        {
            current.push('\'');
            has_apostrophe = true;
        } else {
            flush(&mut tokens, &mut current, &mut has_apostrophe);
        }
    }
    flush(&mut tokens, &mut current, &mut has_apostrophe);
    tokens
}

fn flush(tokens: &mut Vec<String>, current: &mut String, has_apostrophe: &mut bool) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
    *has_apostrophe = false;
}
