//! Answers customer questions from the moderated knowledge base.
//!
//! Questions are reduced to a bag of lowercase words without stop words and
//! compared against every live entry's question with Jaccard similarity.
//! Equal scores prefer the better rated entry.

use std::collections::HashSet;

use serde::Serialize;

use crate::types::average;

pub const MATCH_THRESHOLD: f64 = 0.25;

pub const FALLBACK_ANSWER: &str = "Sorry, I don't know the answer to that yet. \
     Try asking on the discussion board and our staff will get back to you.";

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "can", "do", "does", "for", "how", "i", "if", "in", "is", "it",
    "me", "my", "of", "on", "or", "the", "to", "what", "when", "where", "which", "who", "why",
    "with", "you", "your",
];

#[derive(Debug, Clone)]
pub struct KnowledgeSnippet {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub rating_sum: i64,
    pub rating_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    pub entry_id: Option<i64>,
    pub source: &'static str,
    pub confidence: f64,
}

pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

fn similarity(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count() as f64;
    let union = left.union(right).count() as f64;
    shared / union
}

pub fn answer(message: &str, snippets: &[KnowledgeSnippet]) -> ChatReply {
    let asked = tokenize(message);

    let best = snippets
        .iter()
        .map(|snippet| {
            let score = similarity(&asked, &tokenize(&snippet.question));
            let rating = average(snippet.rating_sum, snippet.rating_count).unwrap_or(0.0);
            (snippet, score, rating)
        })
        .filter(|(_, score, _)| *score >= MATCH_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)));

    match best {
        Some((snippet, score, _)) => ChatReply {
            answer: snippet.answer.clone(),
            entry_id: Some(snippet.id),
            source: "knowledge_base",
            confidence: (score * 100.0).round() / 100.0,
        },
        None => ChatReply {
            answer: FALLBACK_ANSWER.to_owned(),
            entry_id: None,
            source: "fallback",
            confidence: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(id: i64, question: &str, answer: &str, rating_sum: i64, rating_count: i64) -> KnowledgeSnippet {
        KnowledgeSnippet {
            id,
            question: question.to_owned(),
            answer: answer.to_owned(),
            rating_sum,
            rating_count,
        }
    }

    #[test]
    fn tokenizer_drops_stop_words_and_punctuation() {
        let tokens = tokenize("What are your opening HOURS?");
        let expected: HashSet<String> = ["opening", "hours"].iter().map(|s| s.to_string()).collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn picks_closest_question() {
        let kb = vec![
            snippet(1, "What are your opening hours?", "We open at 11am.", 0, 0),
            snippet(2, "Do you deliver to Brooklyn?", "Yes, all of NYC.", 0, 0),
        ];

        let reply = answer("when do you deliver to brooklyn", &kb);

        assert_eq!(reply.entry_id, Some(2));
        assert_eq!(reply.source, "knowledge_base");
        assert!(reply.confidence > 0.5);
    }

    #[test]
    fn ties_prefer_better_rating() {
        let kb = vec![
            snippet(1, "Is the halal chicken spicy?", "A little.", 2, 1),
            snippet(2, "Is the halal chicken spicy?", "Mild, ask for extra chili.", 10, 2),
        ];

        assert_eq!(answer("halal chicken spicy", &kb).entry_id, Some(2));
    }

    #[test]
    fn falls_back_without_match() {
        let kb = vec![snippet(1, "What are your opening hours?", "We open at 11am.", 0, 0)];

        let reply = answer("refund policy for cancelled orders", &kb);

        assert_eq!(reply.entry_id, None);
        assert_eq!(reply.source, "fallback");
        assert_eq!(reply.answer, FALLBACK_ANSWER);
    }

    #[test]
    fn empty_message_falls_back() {
        let kb = vec![snippet(1, "hours", "11am", 0, 0)];
        assert_eq!(answer("?!", &kb).source, "fallback");
    }
}
