//! Normalizers for raw model output.
//!
//! Each feature's free-form completion text is turned into the structured
//! content stored and returned to the caller:
//! - titles: a deduplicated list of 3 to 5 cleaned lines
//! - description: `about` / `timestamps` / `hashtags` sections
//! - script: plain text with markdown removed
//! - thumbnail: PNG bytes as a data URI

use std::collections::HashSet;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ck_models::DescriptionContent;
use regex::Regex;
use thiserror::Error;

/// Minimum number of usable titles.
pub const MIN_TITLES: usize = 3;

/// Maximum number of titles returned.
pub const MAX_TITLES: usize = 5;

/// Titles must be longer than this many characters.
const MIN_TITLE_CHARS: usize = 10;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#{1,6}[ \t]+").unwrap());
static SPACE_BEFORE_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static LIST_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+[).\-\s]*|[-•]\s*)").unwrap());
static SURROUNDING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^["']+|["']+$"#).unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TRAILING_COMMAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+$").unwrap());

static SECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t*_#]*(ABOUT|TIMESTAMPS|HASHTAGS)[ \t*_]*:[ \t*_]*").unwrap()
});

/// Model output that cannot be turned into content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationParseError {
    #[error("Only {found} usable titles in model output")]
    TooFewTitles { found: usize },

    #[error("Model output has no ABOUT section")]
    MissingAbout,

    #[error("Model output has no script text")]
    EmptyScript,
}

/// Remove markdown emphasis, code and heading markers, and tidy line breaks.
pub fn strip_markdown(text: &str) -> String {
    let text = text.replace("**", "").replace(['*', '`'], "");
    let text = HEADING.replace_all(&text, "");
    let text = SPACE_BEFORE_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn clean_title_pass(title: &str) -> String {
    let t = title.trim();
    let t = LIST_PREFIX.replace(t, "");
    let t = strip_markdown(&t);
    let t = SURROUNDING_QUOTES.replace_all(&t, "");
    let t = WHITESPACE.replace_all(&t, " ");
    let t = TRAILING_COMMAS.replace(&t, "");
    t.trim().to_string()
}

/// Clean a single title line.
///
/// Stripping repeats until nothing changes, then unbalanced `(` are closed,
/// so `clean_title(clean_title(x)) == clean_title(x)`.
pub fn clean_title(title: &str) -> String {
    let mut current = clean_title_pass(title);
    loop {
        let next = clean_title_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }

    let open = current.matches('(').count();
    let close = current.matches(')').count();
    if open > close {
        current.push_str(&")".repeat(open - close));
    }
    current
}

/// Split, clean, filter and deduplicate titles.
pub fn normalize_titles(raw: &str) -> Result<Vec<String>, GenerationParseError> {
    let mut segments: Vec<&str> = raw.split('\n').collect();
    if segments.len() <= 1 {
        segments = raw.split(',').collect();
    }

    let mut seen = HashSet::new();
    let mut titles: Vec<String> = segments
        .into_iter()
        .map(clean_title)
        .filter(|t| t.chars().count() > MIN_TITLE_CHARS)
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if titles.len() < MIN_TITLES {
        return Err(GenerationParseError::TooFewTitles {
            found: titles.len(),
        });
    }

    titles.truncate(MAX_TITLES);
    Ok(titles)
}

/// Split labelled description output into its sections.
///
/// Labels are matched case-insensitively at line start. A section runs to
/// the next label or the end of input; the first occurrence of a label wins.
pub fn normalize_description(raw: &str) -> Result<DescriptionContent, GenerationParseError> {
    let labels: Vec<(String, usize, usize)> = SECTION_LABEL
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().to_ascii_uppercase();
            Some((name, whole.start(), whole.end()))
        })
        .collect();

    let mut content = DescriptionContent::default();
    let mut found = HashSet::new();

    for (i, (name, _, body_start)) in labels.iter().enumerate() {
        if !found.insert(name.as_str()) {
            continue;
        }
        let body_end = labels.get(i + 1).map(|(_, start, _)| *start).unwrap_or(raw.len());
        let body = raw[*body_start..body_end].trim().to_string();

        match name.as_str() {
            "ABOUT" => content.about = body,
            "TIMESTAMPS" => content.timestamps = body,
            _ => content.hashtags = body,
        }
    }

    if content.about.is_empty() {
        return Err(GenerationParseError::MissingAbout);
    }
    Ok(content)
}

/// Script text with markdown removed.
pub fn normalize_script(raw: &str) -> Result<String, GenerationParseError> {
    let script = strip_markdown(raw);
    if script.is_empty() {
        return Err(GenerationParseError::EmptyScript);
    }
    Ok(script)
}

/// Encode PNG bytes as a `data:` URI.
pub fn to_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markdown() {
        let raw = "## Hook  \n**Bold** and *soft* `code`\n\n\n\nEnd #tag";
        assert_eq!(strip_markdown(raw), "Hook\nBold and soft code\n\nEnd #tag");
    }

    #[test]
    fn test_clean_title_strips_decorations() {
        assert_eq!(clean_title("1. \"How I Learned Rust\","), "How I Learned Rust");
        assert_eq!(clean_title("2) **Bold Move Friday**"), "Bold Move Friday");
        assert_eq!(clean_title("- The   Spaced   Title"), "The Spaced Title");
        assert_eq!(clean_title("3 - 'Quoted Title Here'"), "Quoted Title Here");
    }

    #[test]
    fn test_clean_title_closes_parentheses() {
        assert_eq!(clean_title("Cooking Tips (For Beginners"), "Cooking Tips (For Beginners)");
        assert_eq!(clean_title("Nested ((Parens Here"), "Nested ((Parens Here))");
    }

    #[test]
    fn test_clean_title_is_idempotent() {
        let inputs = [
            "1. \"How I Learned Rust\",",
            "\"'Double Quoted'\"",
            "  4.  ## Heading Title (part one  ",
            "** 1. Hidden Number **",
            "- • Bullet 2) inside",
            "\"Ends with quote (open\"",
            "",
        ];
        for input in inputs {
            let once = clean_title(input);
            assert_eq!(clean_title(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_normalize_titles_from_lines() {
        let raw = "1. Ten Rust Tricks You Missed\n\
                   2. Why Rust Beats Everything\n\
                   3. Short\n\
                   4. Ten Rust Tricks You Missed\n\
                   5. Async Rust Without Tears\n";
        let titles = normalize_titles(raw).unwrap();
        assert_eq!(
            titles,
            vec![
                "Ten Rust Tricks You Missed",
                "Why Rust Beats Everything",
                "Async Rust Without Tears",
            ]
        );
    }

    #[test]
    fn test_normalize_titles_from_commas_and_caps_at_five() {
        let raw = "Alpha Title Number, Bravo Title Number, Charlie Title Number, \
                   Delta Title Number, Echo Title Number, Foxtrot Title Number";
        let titles = normalize_titles(raw).unwrap();
        assert_eq!(titles.len(), MAX_TITLES);
        assert_eq!(titles[0], "Alpha Title Number");
        assert!(titles.iter().all(|t| t.chars().count() > 10));
    }

    #[test]
    fn test_normalize_titles_rejects_too_few() {
        assert_eq!(
            normalize_titles("Only One Good Title\nshort\n"),
            Err(GenerationParseError::TooFewTitles { found: 1 })
        );
        assert_eq!(
            normalize_titles(""),
            Err(GenerationParseError::TooFewTitles { found: 0 })
        );
    }

    #[test]
    fn test_normalize_description_sections() {
        let raw = "ABOUT:\nA calm tour of my desk setup.\n\n\
                   TIMESTAMPS:\n00:00 Intro\n01:10 Chair\n\n\
                   HASHTAGS:\n#desk #setup";
        let desc = normalize_description(raw).unwrap();
        assert_eq!(desc.about, "A calm tour of my desk setup.");
        assert_eq!(desc.timestamps, "00:00 Intro\n01:10 Chair");
        assert_eq!(desc.hashtags, "#desk #setup");
    }

    #[test]
    fn test_normalize_description_tolerates_emphasis_and_case() {
        let raw = "**About:** Short intro\n**Hashtags:** #a #b";
        let desc = normalize_description(raw).unwrap();
        assert_eq!(desc.about, "Short intro");
        assert_eq!(desc.timestamps, "");
        assert_eq!(desc.hashtags, "#a #b");
    }

    #[test]
    fn test_normalize_description_first_label_wins() {
        let raw = "ABOUT: first\nABOUT: second\nHASHTAGS: #x";
        let desc = normalize_description(raw).unwrap();
        assert_eq!(desc.about, "first");
    }

    #[test]
    fn test_normalize_description_requires_about() {
        assert_eq!(
            normalize_description("TIMESTAMPS:\n00:00 Intro\nHASHTAGS: #x"),
            Err(GenerationParseError::MissingAbout)
        );
        assert_eq!(
            normalize_description("ABOUT:\n\nTIMESTAMPS: 00:00"),
            Err(GenerationParseError::MissingAbout)
        );
    }

    #[test]
    fn test_normalize_script() {
        let script = normalize_script("**Hook:** Did you know?\n\n\n\nBody text").unwrap();
        assert_eq!(script, "Hook: Did you know?\n\nBody text");
        assert_eq!(normalize_script(" ** ``"), Err(GenerationParseError::EmptyScript));
    }

    #[test]
    fn test_to_data_uri() {
        assert_eq!(to_data_uri(b"png"), "data:image/png;base64,cG5n");
    }
}
