use scroll_reveal_protocol::Fragment;

/// A run of the input text: either a word (animated) or the whitespace
/// between words (kept verbatim, never animated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a str),
    Space(&'a str),
}

impl<'a> Token<'a> {
    fn from_run(run: &'a str, is_space: bool) -> Self {
        if is_space {
            Token::Space(run)
        } else {
            Token::Word(run)
        }
    }

    pub fn as_str(&self) -> &'a str {
        match self {
            Token::Word(s) | Token::Space(s) => s,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Token::Word(_))
    }
}

/// Split `text` on maximal whitespace runs, keeping the runs themselves.
///
/// Concatenating the tokens reproduces `text` exactly. Word and space
/// tokens always alternate.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut run_start = 0;
    let mut run_is_space: Option<bool> = None;

    for (i, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match run_is_space {
            Some(prev) if prev == is_space => {}
            Some(prev) => {
                tokens.push(Token::from_run(&text[run_start..i], prev));
                run_start = i;
                run_is_space = Some(is_space);
            }
            None => run_is_space = Some(is_space),
        }
    }

    if let Some(prev) = run_is_space {
        tokens.push(Token::from_run(&text[run_start..], prev));
    }
    tokens
}

/// Word tokens paired with their ordinal among words only.
pub fn words<'a>(tokens: &[Token<'a>]) -> impl Iterator<Item = (u32, &'a str)> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Word(w) => Some(*w),
            Token::Space(_) => None,
        })
        .enumerate()
        .map(|(i, w)| (i as u32, w))
}

/// Owned markup for the host to lay out.
pub fn to_fragments(tokens: &[Token<'_>]) -> Vec<Fragment> {
    let mut next_index = 0u32;
    tokens
        .iter()
        .map(|t| match t {
            Token::Word(w) => {
                let index = next_index;
                next_index += 1;
                Fragment::Word {
                    index,
                    text: (*w).to_string(),
                }
            }
            Token::Space(s) => Fragment::Space {
                text: (*s).to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
        tokens.iter().map(Token::as_str).collect()
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn keeps_whitespace_runs() {
        let tokens = tokenize("a  b");
        assert_eq!(strs(&tokens), ["a", "  ", "b"]);
        assert_eq!(tokens[1], Token::Space("  "));
    }

    #[test]
    fn no_whitespace_is_single_word() {
        assert_eq!(tokenize("Oyeeee!!"), [Token::Word("Oyeeee!!")]);
    }

    #[test]
    fn leading_and_trailing_whitespace_preserved() {
        let tokens = tokenize("\n  hi there \t");
        assert_eq!(strs(&tokens), ["\n  ", "hi", " ", "there", " \t"]);
        assert!(!tokens[0].is_word());
    }

    #[test]
    fn concatenation_reproduces_input() {
        let input = "  When does a man die?\n\tWhen he is  forgotten!  ";
        let joined: String = tokenize(input).iter().map(Token::as_str).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn tokenizing_is_deterministic() {
        let input = "Oyeeee !!  now";
        assert_eq!(tokenize(input), tokenize(input));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let tokens = tokenize("héllo\u{3000}wörld");
        assert_eq!(strs(&tokens), ["héllo", "\u{3000}", "wörld"]);
    }

    #[test]
    fn word_ordinals_skip_spaces() {
        let tokens = tokenize(" Oyeeee !! now");
        let indexed: Vec<_> = words(&tokens).collect();
        assert_eq!(indexed, [(0, "Oyeeee"), (1, "!!"), (2, "now")]);
    }

    #[test]
    fn fragments_carry_word_indices() {
        let fragments = to_fragments(&tokenize("a b"));
        assert_eq!(
            fragments,
            [
                Fragment::Word {
                    index: 0,
                    text: "a".into()
                },
                Fragment::Space { text: " ".into() },
                Fragment::Word {
                    index: 1,
                    text: "b".into()
                },
            ]
        );
    }
}
