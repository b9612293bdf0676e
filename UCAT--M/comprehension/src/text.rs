use regex::{Captures, Regex};

/// Splits prose into sentences, keeping terminal punctuation attached.
///
/// A boundary is `.`, `!` or `?` followed by whitespace. Pieces are trimmed and
/// any piece shorter than `min_chars` UTF-16 units is dropped, so the result
/// may be empty.
#[must_use]
pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                pieces.push(&text[start..next_idx]);
                start = next_idx;
            }
        }
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty() && utf16_len(piece) >= min_chars)
        .map(ToOwned::to_owned)
        .collect()
}

/// Upper-cases the first character.
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Carries the capitalisation of `matched`'s first letter onto `replacement`.
#[must_use]
pub fn match_case(matched: &str, replacement: &str) -> String {
    let starts_upper = matched.chars().next().is_some_and(char::is_uppercase);
    if starts_upper {
        capitalize(replacement)
    } else {
        replacement.to_owned()
    }
}

/// Case-insensitive whole-word rule: one pattern, one or more replacement templates.
///
/// Templates may reference capture groups (`$1`). A match directly followed by an
/// apostrophe is ignored so `can` never fires inside `can't`.
#[derive(Debug, Clone)]
pub struct WordRule {
    pattern: Regex,
    replacements: Vec<&'static str>,
}

impl WordRule {
    /// Compiles `(?i)\b(?:words)\b`.
    pub fn new(words: &str, replacements: &[&'static str]) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"(?i)\b(?:{words})\b"))?;
        Ok(Self {
            pattern,
            replacements: replacements.to_vec(),
        })
    }

    /// Replacement templates, in authoring order.
    #[must_use]
    pub fn replacements(&self) -> &[&'static str] {
        &self.replacements
    }

    /// Whether the rule has a usable match in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.first_captures(text).is_some()
    }

    /// Replaces the first usable match with template `choice` (clamped to the
    /// last template). `None` when nothing matches.
    #[must_use]
    pub fn replace_first(&self, text: &str, choice: usize) -> Option<String> {
        let caps = self.first_captures(text)?;
        let template = *self
            .replacements
            .get(choice)
            .or_else(|| self.replacements.last())?;
        let whole = caps.get(0)?;
        let mut expanded = String::new();
        caps.expand(template, &mut expanded);
        Some(splice(text, whole.start(), whole.end(), &expanded))
    }

    fn first_captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.pattern.captures_iter(text).find(|caps| {
            caps.get(0)
                .is_some_and(|whole| !followed_by_apostrophe(text, whole.end()))
        })
    }
}

fn followed_by_apostrophe(text: &str, at: usize) -> bool {
    text[at..]
        .chars()
        .next()
        .is_some_and(|ch| ch == '\'' || ch == '\u{2019}')
}

/// Replaces `text[start..end]`, keeping sentence-initial capitalisation intact.
fn splice(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let matched = &text[start..end];
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    if replacement.is_empty() {
        // deleting the first word: the next word now opens the sentence
        let rest = &text[end..];
        if start == 0 && matched.chars().next().is_some_and(char::is_uppercase) {
            out.push_str(&capitalize(rest));
        } else {
            out.push_str(rest);
        }
        return out;
    }
    out.push_str(&match_case(matched, replacement));
    out.push_str(&text[end..]);
    out
}

/// Length in UTF-16 code units, the unit browser selections are measured in.
#[must_use]
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// UTF-16 offset of the first exact occurrence of `needle`.
#[must_use]
pub fn find_utf16(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .find(needle)
        .map(|byte_idx| utf16_len(&haystack[..byte_idx]))
}

/// `String.prototype.slice` over UTF-16 units: bounds clamp to the text and an
/// empty or inverted range yields `""`.
#[must_use]
pub fn slice_utf16(text: &str, start: usize, end: usize) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    let end = end.min(units.len());
    let start = start.min(end);
    String::from_utf16_lossy(&units[start..end])
}

/// Lower-cases a word and strips everything but letters, digits, hyphens and apostrophes.
#[must_use]
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '-' || *ch == '\'')
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .trim_matches(|ch| ch == '-' || ch == '\'')
        .to_owned()
}
