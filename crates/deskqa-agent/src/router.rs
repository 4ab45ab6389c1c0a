//! Query routing: a state-free keyword classifier that sends price-domain
//! questions to the price tool and everything else to retrieval, plus the
//! ordered rule table that extracts price intents. Misclassification is an
//! accepted heuristic risk, not a fault.

use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_VOCAB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(price|close|open|high|low|last|latest|compare|performance|return|percentage|pct)\b")
        .expect("hardcoded regex")
});

static SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,10}\b").expect("hardcoded regex"));

/// Extracted price intent, from most to least specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceIntent {
    LatestClose(String),
    Compare { a: String, b: String, points: usize },
    /// No recognizable pattern and no known symbol: list what we cover.
    Listing,
}

enum RuleKind {
    LatestClose,
    Compare,
}

/// Specific phrasings tried in priority order before the generic
/// single-symbol fallback.
static RULES: Lazy<Vec<(Regex, RuleKind)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)most recent close for ([A-Za-z]{2,10})\b").expect("hardcoded regex"),
            RuleKind::LatestClose,
        ),
        (
            Regex::new(r"(?i)last price for ([A-Za-z]{2,10})\b").expect("hardcoded regex"),
            RuleKind::LatestClose,
        ),
        (
            Regex::new(
                r"(?i)compare ([A-Za-z]{2,10})\b performance to ([A-Za-z]{2,10})\b.*?(\d+)\s*day",
            )
            .expect("hardcoded regex"),
            RuleKind::Compare,
        ),
    ]
});

/// Routes to the price path when price-domain vocabulary is present.
pub fn is_price_query(question: &str) -> bool {
    PRICE_VOCAB.is_match(&question.to_lowercase())
}

/// Uppercase 2-10 character tokens intersected with the known symbol set,
/// preserving first-mention order.
pub fn extract_symbols(question: &str, known: &[String]) -> Vec<String> {
    let mut found = Vec::new();
    for m in SYMBOL.find_iter(question) {
        let sym = m.as_str().to_string();
        if known.contains(&sym) && !found.contains(&sym) {
            found.push(sym);
        }
    }
    found
}

/// Evaluate the rule table in order; fall back to the first known symbol
/// mentioned, then to listing the available symbols.
pub fn parse_price_intent(question: &str, known: &[String]) -> PriceIntent {
    for (pattern, kind) in RULES.iter() {
        if let Some(caps) = pattern.captures(question) {
            match kind {
                RuleKind::LatestClose => {
                    return PriceIntent::LatestClose(caps[1].to_uppercase());
                }
                RuleKind::Compare => {
                    if let Ok(points) = caps[3].parse::<usize>() {
                        return PriceIntent::Compare {
                            a: caps[1].to_uppercase(),
                            b: caps[2].to_uppercase(),
                            points,
                        };
                    }
                }
            }
        }
    }
    if let Some(sym) = extract_symbols(question, known).into_iter().next() {
        return PriceIntent::LatestClose(sym);
    }
    PriceIntent::Listing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_vocabulary_routes_to_price_path() {
        assert!(is_price_query("What is the most recent close for MSFT?"));
        assert!(is_price_query("compare SPY performance to QQQ over 10 days"));
        assert!(is_price_query("LATEST price please"));
        assert!(!is_price_query("Did the letter mention SPY?"));
        assert!(!is_price_query("What drove the rally?"));
    }

    #[test]
    fn symbols_intersect_with_known_set() {
        let known = vec!["MSFT".to_string(), "EURUSD".to_string()];
        assert_eq!(
            extract_symbols("Is MSFT or NVDA or EURUSD mentioned?", &known),
            vec!["MSFT".to_string(), "EURUSD".to_string()]
        );
        assert!(extract_symbols("no symbols here", &known).is_empty());
        // Lowercase tokens are not symbols.
        assert!(extract_symbols("msft eurusd", &known).is_empty());
    }

    #[test]
    fn digit_bearing_tokens_are_not_symbol_candidates() {
        // Quarter labels and similar alphanumeric tokens must never be read
        // as symbols, even when the known set happens to contain them.
        let known = vec!["MSFT".to_string(), "Q2".to_string()];
        assert_eq!(
            extract_symbols("Did MSFT rally in Q2 2024?", &known),
            vec!["MSFT".to_string()]
        );
        assert_eq!(
            parse_price_intent("What moved in Q2?", &known),
            PriceIntent::Listing
        );
    }

    #[test]
    fn specific_rules_win_over_symbol_fallback() {
        let known = vec!["MSFT".to_string(), "SPY".to_string(), "QQQ".to_string()];
        assert_eq!(
            parse_price_intent("What is the most recent close for MSFT?", &known),
            PriceIntent::LatestClose("MSFT".to_string())
        );
        assert_eq!(
            parse_price_intent("What was the last price for EURUSD?", &known),
            PriceIntent::LatestClose("EURUSD".to_string())
        );
        assert_eq!(
            parse_price_intent("Compare SPY performance to QQQ over the last 10 days", &known),
            PriceIntent::Compare { a: "SPY".to_string(), b: "QQQ".to_string(), points: 10 }
        );
    }

    #[test]
    fn fallback_uses_first_known_symbol_then_listing() {
        let known = vec!["MSFT".to_string()];
        assert_eq!(
            parse_price_intent("How is MSFT doing lately?", &known),
            PriceIntent::LatestClose("MSFT".to_string())
        );
        assert_eq!(parse_price_intent("What moved today?", &known), PriceIntent::Listing);
    }
}
