//! Answer composition helpers: the strict prompt contract handed to the
//! generation backend and the deterministic extractive fallback.

use deskqa_core::types::ScoredChunk;

/// One retrieved chunk rendered as evidence: canonical tag + text.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub tag: String,
    pub text: String,
}

pub fn build_evidence(hits: &[ScoredChunk]) -> Vec<Evidence> {
    hits.iter()
        .map(|h| Evidence { tag: h.chunk.tag(), text: h.chunk.text.clone() })
        .collect()
}

/// User prompt for the generation call: instructions, the question, the
/// exact allowed tags, then every evidence chunk labeled with its tag.
pub fn build_user_prompt(question: &str, evidence: &[Evidence]) -> String {
    let mut lines = vec![
        "You are a strict, citation-first assistant.".to_string(),
        "Use ONLY the provided context. If the answer is not in context, say you don't know."
            .to_string(),
        "Every claim MUST include a citation tag copied EXACTLY from the allowed tags below."
            .to_string(),
        "Be concise (<= 5 sentences).".to_string(),
        format!("Question: {question}"),
        "Allowed citation tags (use EXACTLY as-is; do NOT invent new tags):".to_string(),
    ];
    for e in evidence {
        lines.push(format!("- [{}]", e.tag));
    }
    lines.push("Context chunks:".to_string());
    for e in evidence {
        lines.push(format!("[{}]", e.tag));
        lines.push(e.text.clone());
    }
    lines.join("\n")
}

/// Extractive composition: evidence texts in rank order separated by blank
/// lines, followed by every citation tag. Citation-complete by
/// construction, so no sanitization pass is needed.
pub fn extractive_answer(evidence: &[Evidence]) -> String {
    let body: Vec<&str> = evidence.iter().map(|e| e.text.as_str()).collect();
    let tags: Vec<String> = evidence.iter().map(|e| format!("[{}]", e.tag)).collect();
    format!("{}\n\n{}", body.join("\n\n"), tags.join(" "))
}
