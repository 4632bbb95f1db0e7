//! Content moderation gate applied to outbound messages before any state change.

use regex::Regex;

/// Terms rejected by the default gate. Multi-word entries match as a
/// contiguous word sequence.
pub const DEFAULT_BLOCKED_TERMS: &[&str] = &[
    "arsehole", "asshat", "asshole", "bastard", "bitch", "bloody", "blowjob",
    "bollocks", "bugger", "bullshit", "chicken shit", "ching chong", "clusterfuck",
    "cock", "cocksucker", "coonass", "cornhole", "cracker", "crap", "cunt",
    "dick", "dumbass", "enshittification", "faggot", "feck", "fuck", "fuckery",
    "grab em by the pussy", "healslut", "if you see kay", "jesus fucking christ",
    "kike", "motherfucker", "nigga", "nigger", "pajeet", "paki", "poof",
    "poofter", "prick", "pussy", "ratfucking", "retard", "russian warship go fuck yourself",
    "serving cunt", "shit", "shithole", "shitpost", "shitter", "shut the fuck up",
    "shut the hell up", "slut", "son of a bitch", "spic", "taking the piss",
    "twat", "unclefucker", "wanker", "whore",
];

pub const DEFAULT_BLOCKED_MESSAGE: &str = "I'm sorry, but I can't respond to messages containing inappropriate language. Please rephrase your message in a respectful way.";

/// Case-insensitive, word-bounded matcher over a fixed term list.
///
/// All terms are folded into a single alternation so a check is one regex scan.
#[derive(Debug, Clone)]
pub struct ContentGate {
    pattern: Option<Regex>,
    reason: String,
}

impl ContentGate {
    pub fn new<I, S>(terms: I, reason: impl Into<String>) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = terms
            .into_iter()
            .filter_map(|term| term_pattern(term.as_ref()))
            .collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))?)
        };

        Ok(Self {
            pattern,
            reason: reason.into(),
        })
    }

    /// True when `text` contains a listed term as a whole word or phrase
    pub fn should_block(&self, text: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(text),
            None => false,
        }
    }

    /// The notice posted in place of a reply when a message is blocked
    pub fn blocked_reason(&self) -> &str {
        &self.reason
    }
}

impl Default for ContentGate {
    fn default() -> Self {
        // The built-in list is escaped literals; compiling it cannot fail.
        Self::new(DEFAULT_BLOCKED_TERMS.iter().copied(), DEFAULT_BLOCKED_MESSAGE)
            .expect("built-in blocklist compiles")
    }
}

/// Escape a term and let its inner spaces match any whitespace run
fn term_pattern(term: &str) -> Option<String> {
    let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(r"\s+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_exact_terms() {
        let gate = ContentGate::default();
        assert!(gate.should_block("fuck"));
        assert!(gate.should_block("shit"));
        assert!(gate.should_block("asshole"));
    }

    #[test]
    fn matching_ignores_case() {
        let gate = ContentGate::default();
        assert!(gate.should_block("FUCK"));
        assert!(gate.should_block("Shit"));
        assert!(gate.should_block("AsShOlE"));
    }

    #[test]
    fn blocks_terms_inside_sentences() {
        let gate = ContentGate::default();
        assert!(gate.should_block("What the fuck is this"));
        assert!(gate.should_block("This is bullshit"));
        assert!(gate.should_block("You are a dick"));
    }

    #[test]
    fn embedded_substrings_do_not_match() {
        let gate = ContentGate::default();
        assert!(!gate.should_block("class"));
        assert!(!gate.should_block("classic"));
        assert!(!gate.should_block("assassin"));
        assert!(!gate.should_block("dickens"));
        assert!(!gate.should_block("a cocktail at Scunthorpe"));
    }

    #[test]
    fn clean_and_empty_text_pass() {
        let gate = ContentGate::default();
        assert!(!gate.should_block(""));
        assert!(!gate.should_block("Hello, how are you?"));
        assert!(!gate.should_block("What classes are available?"));
        assert!(!gate.should_block("Tell me about scholarships"));
    }

    #[test]
    fn multi_word_phrases_match() {
        let gate = ContentGate::default();
        assert!(gate.should_block("chicken shit"));
        assert!(gate.should_block("son of a bitch"));
        assert!(gate.should_block("well, shut   the hell\nup!"));
    }

    #[test]
    fn punctuation_around_terms_still_matches() {
        let gate = ContentGate::default();
        assert!(gate.should_block("What the fuck!"));
        assert!(gate.should_block("shit."));
        assert!(gate.should_block("(asshole)"));
    }

    #[test]
    fn custom_terms_are_escaped() {
        let gate = ContentGate::new(["c++ sucks", "  "], "nope").unwrap();
        assert!(gate.should_block("honestly C++ sucks today"));
        assert!(!gate.should_block("c sucks"));
        assert_eq!(gate.blocked_reason(), "nope");
    }

    #[test]
    fn empty_term_list_never_blocks() {
        let gate = ContentGate::new(Vec::<String>::new(), "unused").unwrap();
        assert!(!gate.should_block("anything at all"));
    }

    #[test]
    fn default_reason_is_not_empty() {
        assert!(!ContentGate::default().blocked_reason().is_empty());
    }
}
