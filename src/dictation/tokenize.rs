use regex::Regex;

lazy_static::lazy_static! {
    /// Apostrophes anywhere, plus a leading article.
    static ref STRIP_PATTERN: Regex = Regex::new(r"'|^(?:a |the )").unwrap();
    /// Dashes and articles in the middle of a phrase become word breaks.
    static ref BREAK_PATTERN: Regex = Regex::new(r"-| a | the ").unwrap();
    static ref NON_WORD: Regex = Regex::new(r"(\W)").unwrap();
}

fn is_punctuation(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| !(c.is_alphanumeric() || c == '_'))
}

fn is_single_letter(token: &str) -> bool {
    token.chars().count() == 1 && !is_punctuation(token)
}

/// Split dictated text into word tokens.
///
/// With `normalize` off the text is only split on whitespace, which keeps the
/// speaker's capitalization for literal insertion. With `normalize` on the
/// text is lowercased and cleaned. Then runs of single letters are fused
/// ("t e s t" → "test") and punctuation is glued to both neighbours
/// ("score test case dot start now" with a literal "." formats to
/// `test_case.start_now`), so case conventions only apply at real word
/// boundaries.
pub fn tokenize(text: &str, normalize: bool) -> Vec<String> {
    if !normalize {
        return text.split_whitespace().map(str::to_string).collect();
    }

    let lower = text.to_lowercase();
    let stripped = STRIP_PATTERN.replace_all(&lower, "");
    let broken = BREAK_PATTERN.replace_all(&stripped, " ");
    let spaced = NON_WORD.replace_all(&broken, " ${1} ");

    let mut tokens: Vec<String> = Vec::new();
    let mut previous_letter = false;
    let mut previous_punctuation = false;
    for raw in spaced.split_whitespace() {
        let punctuation = is_punctuation(raw);
        let letter = is_single_letter(raw);
        match tokens.last_mut() {
            Some(last) if punctuation || previous_punctuation || (letter && previous_letter) => {
                last.push_str(raw);
            }
            _ => tokens.push(raw.to_string()),
        }
        previous_letter = letter;
        previous_punctuation = punctuation;
    }
    tokens
}
