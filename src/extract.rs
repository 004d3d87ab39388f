//! Best-effort résumé field extraction from conversation text.
//!
//! A handful of cue phrases and labelled lines are recognised:
//!
//! | Field | Recognised as |
//! |---|---|
//! | name | `my name is …`, `I am …`, `I'm …`, `Name: …` (capitalised words) |
//! | email | first `local@domain.tld` token |
//! | phone | first digit run with 10–15 digits (7+ when it starts with `+`) |
//! | address | `Address: …`, `I live at/in …`, `based in …`, or a numbered street line |
//! | summary | `Summary:`, `About me:`, `Profile:`, `Objective:` |
//! | skills | `Skills: a, b and c`, `proficient in …`, `skilled in …` |
//! | experience | `worked as <title> at <company> [from <period>]`, `Experience: …` |
//! | education | degree words (`Bachelor`, `MSc`, …) or `studied …` + `from/at <school>` |
//!
//! Extraction never fails. Text that matches nothing yields an empty
//! [`PartialResumeRecord`].

use crate::store::{Education, Experience, ResumeRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// The fields found in a piece of text. Unfound fields are `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialResumeRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub experiences: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
}

impl PartialResumeRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill the record's missing scalar fields and append new list entries.
    ///
    /// Fields the record already has are left alone, so repeated extraction
    /// over a growing conversation never overwrites user edits.
    pub fn merge_into(self, record: &mut ResumeRecord) {
        fill(&mut record.name, self.name);
        fill(&mut record.email, self.email);
        fill(&mut record.phone, self.phone);
        fill(&mut record.address, self.address);
        fill(&mut record.summary, self.summary);
        for experience in self.experiences {
            if !record.experiences.contains(&experience) {
                record.experiences.push(experience);
            }
        }
        for education in self.education {
            if !record.education.contains(&education) {
                record.education.push(education);
            }
        }
        for skill in self.skills {
            push_unique(&mut record.skills, skill);
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

const TRIM: &[char] = &[
    ',', ';', ':', '(', ')', '<', '>', '"', '\'', '.', '!', '?', '[', ']',
];

/// One to four capitalised words: `Ada Lovelace`, `Zoë Ünal`.
const NAME_WORDS: &str = r"\p{Lu}[\p{L}'-]*(?:[ \t]+\p{Lu}[\p{L}'-]*){0,3}";

// =============================================================================
// Patterns
// =============================================================================

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,}\b")
        .expect("email regex should compile")
});

/// Digit runs with the usual separators; the digit count is checked after.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\(?\d[\d \t().-]{5,}\d").expect("phone regex should compile")
});

/// `my name is` takes one word, `I am`/`I'm` need two.
static NAME_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?i:(my name is)|i am|i'm)[ \t]+({NAME_WORDS})"))
        .expect("name cue regex should compile")
});

static NAME_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{NAME_WORDS}")).expect("name regex should compile")
});

/// `Label: value` lines.
static LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(",
        r"name|address|location|summary|about me|profile|objective",
        r"|skills|skill set|technologies|experience|work|education",
        r")\s*:\s*(.+?)\s*$",
    ))
    .expect("label regex should compile")
});

static ADDRESS_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:i live (?:at|in)|based in|located at)\s+(.+)")
        .expect("address cue regex should compile")
});

static SKILL_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:proficient in|skilled in|experienced with|experience with)\s+(.+)")
        .expect("skill cue regex should compile")
});

static ROLE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:worked|working|work|employed)\s+as\s+(.+)")
        .expect("role cue regex should compile")
});

/// `[a|an|the] <title> at|for <rest>`
static ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:an?|the)\s+)?(.+?)\s+(?:at|for)\s+(.+)$")
        .expect("role regex should compile")
});

/// `<company> [(<period>) | from|since|between <period> | , <period>]`.
/// A trailing period must mention a digit.
static PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(.+?)(?:",
        r"\s*\(([^)]*)\)?.*",
        r"|\s+(from|since|between)\s+(.*\d.*)",
        r"|,\s*(.*\d.*)",
        r")?$",
    ))
    .expect("period regex should compile")
});

/// `studied <subject>` or a degree word, then `from|at <institution>`
/// ending at punctuation or `in <year>`.
static EDUCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:studied\s+(.+?)",
        r"|((?:bachelor|master|ph\.?d|mba|b\.?sc|m\.?sc|degree|diploma|doctorate).*?))",
        r"\s+(?:from|at)\s+([^,(;]+?)(?:\s+in\s+\d|[,(;]|$)",
    ))
    .expect("education regex should compile")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("year regex should compile"));

/// A house number followed within four words by a street word.
static STREET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b\d+\s+(?:[\p{L}.'-]+\s+){0,3}",
        r"(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|way|court|place)\b",
    ))
    .expect("street regex should compile")
});

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?](?:\s+|$)").expect("sentence regex should compile"));

static LIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(?:and|&)\s+|[,;/|]").expect("list separator regex should compile")
});

// =============================================================================
// Extraction
// =============================================================================

/// Extract whatever résumé fields `text` mentions.
pub fn extract_fields(text: &str) -> PartialResumeRecord {
    let mut out = PartialResumeRecord {
        email: EMAIL.find(text).map(|m| m.as_str().to_string()),
        phone: find_phone(text),
        name: find_name(text),
        ..PartialResumeRecord::default()
    };

    for (label, value) in text.lines().filter_map(labelled) {
        match label.as_str() {
            "name" => fill(
                &mut out.name,
                NAME_VALUE.find(value).map(|m| m.as_str().to_string()),
            ),
            "address" | "location" => fill(&mut out.address, Some(clean(value))),
            "summary" | "about me" | "profile" | "objective" => {
                fill(&mut out.summary, Some(value.to_string()))
            }
            "skills" | "skill set" | "technologies" => {
                for skill in split_list(value) {
                    push_unique(&mut out.skills, skill);
                }
            }
            "experience" | "work" => {
                out.experiences.extend(value.split(';').filter_map(parse_role));
            }
            _ => {
                out.education.extend(value.split(';').filter_map(|entry| {
                    parse_education(entry).or_else(|| {
                        let degree = clean(entry);
                        (!degree.is_empty()).then(|| Education {
                            degree,
                            ..Education::default()
                        })
                    })
                }));
            }
        }
    }

    for sentence in sentences(text) {
        if out.address.is_none() {
            out.address = cue_value(&ADDRESS_CUE, sentence).map(clean);
        }
        if let Some(rest) = cue_value(&SKILL_CUE, sentence) {
            for skill in split_list(rest) {
                push_unique(&mut out.skills, skill);
            }
        }
        if let Some(role) = cue_value(&ROLE_CUE, sentence).and_then(parse_role) {
            out.experiences.push(role);
        }
        if labelled(sentence).is_none_or(|(label, _)| label != "education") {
            out.education.extend(parse_education(sentence));
        }
    }

    if out.address.is_none() {
        out.address = text.lines().find(|line| STREET.is_match(line)).map(clean);
    }

    out.experiences.dedup();
    out.education.dedup();
    debug!(
        name = out.name.is_some(),
        email = out.email.is_some(),
        phone = out.phone.is_some(),
        experiences = out.experiences.len(),
        education = out.education.len(),
        skills = out.skills.len(),
        "fields extracted"
    );
    out
}

/// 10–15 digits, or 7+ with a leading `+`. Year ranges fall short.
fn find_phone(text: &str) -> Option<String> {
    PHONE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|run| {
            let digits = run.chars().filter(char::is_ascii_digit).count();
            (10..=15).contains(&digits) || (run.starts_with('+') && (7..=15).contains(&digits))
        })
        .map(str::to_string)
}

fn find_name(text: &str) -> Option<String> {
    NAME_CUE.captures_iter(text).find_map(|caps| {
        let name = caps.get(2)?.as_str();
        let min_words = if caps.get(1).is_some() { 1 } else { 2 };
        (name.split_whitespace().count() >= min_words).then(|| name.to_string())
    })
}

// =============================================================================
// Lists and entries
// =============================================================================

fn split_list(value: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(value)
        .map(clean)
        .filter(|item| !item.is_empty())
        .collect()
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.iter().any(|existing| existing.eq_ignore_ascii_case(&item)) {
        list.push(item);
    }
}

fn parse_role(fragment: &str) -> Option<Experience> {
    let caps = ROLE.captures(fragment.trim())?;
    let title = clean(caps.get(1)?.as_str());
    let rest = PERIOD.captures(caps.get(2)?.as_str())?;
    let company = clean(rest.get(1)?.as_str());
    let period = match (rest.get(2), rest.get(3), rest.get(4), rest.get(5)) {
        (Some(inside), ..) => Some(clean(inside.as_str())).filter(|p| !p.is_empty()),
        (_, Some(cue), Some(tail), _) if cue.as_str().eq_ignore_ascii_case("since") => {
            Some(format!("since {}", clean(tail.as_str())))
        }
        (_, _, Some(tail), _) | (.., Some(tail)) => Some(clean(tail.as_str())),
        _ => None,
    };
    if title.is_empty() || company.is_empty() || title.split_whitespace().count() > 8 {
        return None;
    }
    Some(Experience {
        title,
        company,
        period,
    })
}

fn parse_education(sentence: &str) -> Option<Education> {
    let caps = EDUCATION.captures(sentence)?;
    let degree = clean(caps.get(1).or_else(|| caps.get(2))?.as_str());
    let institution = clean(caps.get(3)?.as_str());
    if degree.is_empty() || institution.is_empty() {
        return None;
    }
    Some(Education {
        degree,
        institution,
        year: YEAR.find(sentence).map(|m| m.as_str().to_string()),
    })
}

// =============================================================================
// Text helpers
// =============================================================================

/// Lines split at sentence-ending punctuation followed by space.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .flat_map(|line| SENTENCE_END.split(line))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Lower-cased label and value of a `Label: value` line.
fn labelled(line: &str) -> Option<(String, &str)> {
    let caps = LABELLED.captures(line)?;
    Some((caps.get(1)?.as_str().to_lowercase(), caps.get(2)?.as_str()))
}

/// First capture group of `pattern` in `text`, if non-empty.
fn cue_value<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    let rest = pattern.captures(text)?.get(1)?.as_str().trim();
    (!rest.is_empty()).then_some(rest)
}

fn clean(s: &str) -> String {
    s.trim().trim_matches(TRIM).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONVERSATION: &str = "Hi! My name is Ada Lovelace. You can reach me at ada@example.com or +44 20 7946 0958.
I live at 12 Marylebone Road, London.
Summary: Analytical engineer who enjoys numerical methods.
Skills: Rust, Python, numerical analysis and technical writing
I worked as a Senior Engineer at Analytical Engines Ltd from 2019 to 2023.
I have a Bachelor of Science in Mathematics from University of London in 2015.";

    // =========================================================================
    // Full conversation
    // =========================================================================

    #[test]
    fn extracts_every_field() {
        let fields = extract_fields(CONVERSATION);
        assert_eq!(fields.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(fields.email.as_deref(), Some("ada@example.com"));
        assert_eq!(fields.phone.as_deref(), Some("+44 20 7946 0958"));
        assert_eq!(fields.address.as_deref(), Some("12 Marylebone Road, London"));
        assert_eq!(
            fields.summary.as_deref(),
            Some("Analytical engineer who enjoys numerical methods.")
        );
        assert_eq!(
            fields.skills,
            vec!["Rust", "Python", "numerical analysis", "technical writing"]
        );
        assert_eq!(
            fields.experiences,
            vec![Experience {
                title: "Senior Engineer".into(),
                company: "Analytical Engines Ltd".into(),
                period: Some("2019 to 2023".into()),
            }]
        );
        assert_eq!(
            fields.education,
            vec![Education {
                degree: "Bachelor of Science in Mathematics".into(),
                institution: "University of London".into(),
                year: Some("2015".into()),
            }]
        );
    }

    #[test]
    fn no_match_is_empty() {
        assert!(extract_fields("").is_empty());
        assert!(extract_fields("hello there, how are you?").is_empty());
    }

    // =========================================================================
    // Individual cues
    // =========================================================================

    #[test]
    fn i_am_needs_capitalised_words() {
        assert_eq!(extract_fields("I am a backend developer").name, None);
        assert_eq!(
            extract_fields("I'm Grace Hopper, nice to meet you").name.as_deref(),
            Some("Grace Hopper")
        );
    }

    #[test]
    fn year_ranges_are_not_phone_numbers() {
        let fields = extract_fields("From 2015-2019 and 2020 - 2022 I taught.");
        assert_eq!(fields.phone, None);
        assert_eq!(
            extract_fields("call 555-123-4567 today").phone.as_deref(),
            Some("555-123-4567")
        );
    }

    #[test]
    fn skills_from_label_and_cue_deduplicate() {
        let fields = extract_fields("Skills: rust, Go\nI'm proficient in Rust and SQL.");
        assert_eq!(fields.skills, vec!["rust", "Go", "SQL"]);
        assert_eq!(fields.name, None);
    }

    #[test]
    fn studied_at_is_education() {
        let fields = extract_fields("I studied Physics at Oxford.");
        assert_eq!(
            fields.education,
            vec![Education {
                degree: "Physics".into(),
                institution: "Oxford".into(),
                year: None,
            }]
        );
        assert!(fields.experiences.is_empty());
    }

    #[test]
    fn labelled_experience_with_parenthesised_period() {
        let fields = extract_fields("Experience: Designer at Studio Nine (2018-2020); Intern at Acme");
        assert_eq!(
            fields.experiences,
            vec![
                Experience {
                    title: "Designer".into(),
                    company: "Studio Nine".into(),
                    period: Some("2018-2020".into()),
                },
                Experience {
                    title: "Intern".into(),
                    company: "Acme".into(),
                    period: None,
                },
            ]
        );
    }

    #[test]
    fn since_and_comma_periods() {
        let fields = extract_fields(
            "I have been working as an Analyst for Globex since 2021.\nExperience: Engineer at Initech, 2010-2012",
        );
        assert_eq!(
            fields.experiences,
            vec![
                Experience {
                    title: "Engineer".into(),
                    company: "Initech".into(),
                    period: Some("2010-2012".into()),
                },
                Experience {
                    title: "Analyst".into(),
                    company: "Globex".into(),
                    period: Some("since 2021".into()),
                },
            ]
        );
    }

    #[test]
    fn street_line_is_address_fallback() {
        let fields = extract_fields("contact\n221 Baker Street\nthanks");
        assert_eq!(fields.address.as_deref(), Some("221 Baker Street"));
    }

    #[test]
    fn non_ascii_text_is_handled() {
        let fields = extract_fields("Grüße! I am Zoë Ünal.\nSkills: café, naïve ✓");
        assert_eq!(fields.name.as_deref(), Some("Zoë Ünal"));
        assert_eq!(fields.skills, vec!["café", "naïve ✓"]);
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[test]
    fn merge_keeps_existing_values() {
        let mut record = ResumeRecord {
            name: Some("A. Lovelace".into()),
            skills: vec!["rust".into()],
            ..ResumeRecord::default()
        };
        extract_fields(CONVERSATION).merge_into(&mut record);
        assert_eq!(record.name.as_deref(), Some("A. Lovelace"));
        assert_eq!(record.email.as_deref(), Some("ada@example.com"));
        assert_eq!(record.skills.len(), 4);
        assert_eq!(record.experiences.len(), 1);

        // Merging the same text again adds nothing
        extract_fields(CONVERSATION).merge_into(&mut record);
        assert_eq!(record.experiences.len(), 1);
        assert_eq!(record.education.len(), 1);
    }
}
