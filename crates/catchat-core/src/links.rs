use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("Invalid URL pattern"));

/// A piece of message text, either plain or a web link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextToken<'a> {
    Text(&'a str),
    Link(&'a str),
}

/// Split message content into plain text and `http(s)://` links, in order
pub fn tokenize(text: &str) -> Vec<TextToken<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for found in URL_PATTERN.find_iter(text) {
        if found.start() > last {
            tokens.push(TextToken::Text(&text[last..found.start()]));
        }
        tokens.push(TextToken::Link(found.as_str()));
        last = found.end();
    }

    if last < text.len() || tokens.is_empty() {
        tokens.push(TextToken::Text(&text[last..]));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(tokenize("no links here"), vec![TextToken::Text("no links here")]);
    }

    #[test]
    fn empty_text_is_one_empty_token() {
        assert_eq!(tokenize(""), vec![TextToken::Text("")]);
    }

    #[test]
    fn links_are_split_out_in_order() {
        let tokens = tokenize("See https://sfwe.arizona.edu/clubs and http://x.io now");
        assert_eq!(
            tokens,
            vec![
                TextToken::Text("See "),
                TextToken::Link("https://sfwe.arizona.edu/clubs"),
                TextToken::Text(" and "),
                TextToken::Link("http://x.io"),
                TextToken::Text(" now"),
            ]
        );
    }

    #[test]
    fn link_at_end_leaves_no_trailing_token() {
        assert_eq!(
            tokenize("visit https://example.com"),
            vec![TextToken::Text("visit "), TextToken::Link("https://example.com")]
        );
    }

    #[test]
    fn bare_scheme_is_not_a_link() {
        assert_eq!(tokenize("https:// alone"), vec![TextToken::Text("https:// alone")]);
    }
}
