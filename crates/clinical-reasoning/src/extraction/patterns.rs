//! Compiled pattern tables for evidence extraction.
//!
//! All regular expressions are compiled once from the knowledge base when the
//! extractor is built. Term patterns match whole words only, so `no` never
//! matches inside `note` and `cp` never matches inside `cpr`.

use std::collections::{BTreeMap, HashSet};

use regex::{Captures, Regex};

use crate::catalog::{SectionMarkers, Vocabulary};
use crate::error::{ReasoningError, ReasoningResult};
use crate::types::EvidenceCategory;

/// Longest clause kept as a section finding, in characters.
const MAX_CLAUSE_CHARS: usize = 160;

/// Whole-word, case-insensitive alternation over a set of phrases.
///
/// Longer phrases are tried first so `negative for` wins over `no`.
pub(crate) fn alternation(phrases: &[String]) -> ReasoningResult<Option<Regex>> {
    let mut unique: Vec<&str> = phrases
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if unique.is_empty() {
        return Ok(None);
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let body = unique
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Some(Regex::new(&format!(r"(?i)\b(?:{body})\b"))?))
}

// ── Term Patterns ───────────────────────────────────────────────────────

/// A vocabulary term and its compiled whole-word pattern.
#[derive(Clone, Debug)]
pub(crate) struct TermPattern {
    pub term: String,
    pub regex: Regex,
}

impl TermPattern {
    pub fn new(term: &str) -> ReasoningResult<Self> {
        let regex = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term)))?;
        Ok(Self {
            term: term.to_string(),
            regex,
        })
    }

    /// Byte offset of the first occurrence.
    pub fn first(&self, text: &str) -> Option<usize> {
        self.regex.find(text).map(|m| m.start())
    }
}

/// Compile one pattern per distinct term, keeping first-seen order.
pub(crate) fn term_patterns<'a, I>(terms: I) -> ReasoningResult<Vec<TermPattern>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .filter(|t| !t.is_empty() && seen.insert(t.as_str()))
        .map(|t| TermPattern::new(t))
        .collect()
}

/// A generic medication matched under its own name or any brand name.
#[derive(Clone, Debug)]
pub(crate) struct MedicationPattern {
    pub generic: String,
    pub regex: Regex,
}

pub(crate) fn medication_patterns(vocabulary: &Vocabulary) -> ReasoningResult<Vec<MedicationPattern>> {
    let mut seen = HashSet::new();
    vocabulary
        .medications
        .iter()
        .filter(|generic| !generic.is_empty() && seen.insert(generic.as_str()))
        .map(|generic| -> ReasoningResult<MedicationPattern> {
            let names: Vec<String> = std::iter::once(generic.clone())
                .chain(vocabulary.brands_of(generic).cloned())
                .collect();
            let regex = alternation(&names)?.ok_or_else(|| {
                ReasoningError::Configuration(format!(
                    "medication '{generic}' has no names"
                ))
            })?;
            Ok(MedicationPattern {
                generic: generic.clone(),
                regex,
            })
        })
        .collect()
}

// ── Abbreviations ───────────────────────────────────────────────────────

/// Expands whole-word abbreviations in lowercase text.
#[derive(Clone, Debug)]
pub(crate) struct AbbreviationTable {
    regex: Option<Regex>,
    expansions: BTreeMap<String, String>,
}

impl AbbreviationTable {
    pub fn new(abbreviations: &BTreeMap<String, String>) -> ReasoningResult<Self> {
        let keys: Vec<String> = abbreviations.keys().cloned().collect();
        Ok(Self {
            regex: alternation(&keys)?,
            expansions: abbreviations.clone(),
        })
    }

    /// Expand abbreviations. Input is expected to be lowercase already.
    pub fn expand(&self, text: &str) -> String {
        match &self.regex {
            Some(regex) => regex
                .replace_all(text, |caps: &Captures| {
                    self.expansions
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            None => text.to_string(),
        }
    }
}

// ── Negation ────────────────────────────────────────────────────────────

/// How a negated term is rewritten in its finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NegationForm {
    Denies,
    No,
}

impl NegationForm {
    pub fn apply(self, term: &str) -> String {
        match self {
            Self::Denies => format!("denies {term}"),
            Self::No => format!("no {term}"),
        }
    }
}

/// Byte range of text governed by a negation cue.
///
/// `cue` is where the cue itself begins; `start..end` is the negated span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NegationScope {
    pub cue: usize,
    pub start: usize,
    pub end: usize,
    pub form: NegationForm,
}

/// Locates negation cues and the extent of text each one governs.
///
/// A scope opens after a cue and closes at sentence punctuation, at a comma
/// or at a terminator word such as `but` or `and`. A cue therefore negates its
/// own list item: in `no fever, chest pain` only `fever` is negated.
#[derive(Clone, Debug)]
pub(crate) struct NegationDetector {
    cues: Option<Regex>,
    terminators: Regex,
}

impl NegationDetector {
    pub fn new(vocabulary: &Vocabulary) -> ReasoningResult<Self> {
        let cues = alternation(&vocabulary.negation_cues)?;
        let words = alternation(&vocabulary.negation_terminators)?;
        let terminators = match words {
            Some(words) => Regex::new(&format!(r"[.,;!?\n]|{}", words.as_str()))?,
            None => Regex::new(r"[.,;!?\n]")?,
        };
        Ok(Self { cues, terminators })
    }

    pub fn scopes(&self, text: &str) -> Vec<NegationScope> {
        let Some(cues) = &self.cues else {
            return Vec::new();
        };

        cues.find_iter(text)
            .map(|cue| {
                let start = cue.end();
                let end = self
                    .terminators
                    .find_at(text, start)
                    .map_or(text.len(), |m| m.start());
                let form = if cue.as_str() == "denies" {
                    NegationForm::Denies
                } else {
                    NegationForm::No
                };
                NegationScope {
                    cue: cue.start(),
                    start,
                    end,
                    form,
                }
            })
            .collect()
    }
}

/// The negation scope covering a byte offset, if any.
pub(crate) fn negation_at(scopes: &[NegationScope], offset: usize) -> Option<NegationForm> {
    scopes
        .iter()
        .find(|s| offset >= s.start && offset < s.end)
        .map(|s| s.form)
}

// ── Vital Signs ─────────────────────────────────────────────────────────

/// Which vital sign a pattern recognizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VitalKind {
    BloodPressure,
    HeartRate,
    RespiratoryRate,
    Temperature,
    OxygenSaturation,
}

/// An interpreted vital-sign reading.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct VitalReading {
    pub finding: String,
    pub abnormal: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct VitalPattern {
    pub kind: VitalKind,
    regex: Regex,
}

impl VitalPattern {
    /// Interpret the first plausible reading in the text.
    pub fn read(&self, text: &str) -> Option<VitalReading> {
        self.regex
            .captures_iter(text)
            .find_map(|caps| self.interpret(&caps))
    }

    fn interpret(&self, caps: &Captures) -> Option<VitalReading> {
        match self.kind {
            VitalKind::BloodPressure => {
                let systolic: u32 = caps[1].parse().ok()?;
                let diastolic: u32 = caps[2].parse().ok()?;
                if !plausible_blood_pressure(systolic, diastolic) {
                    return None;
                }
                let note = if systolic < 90 {
                    Some("hypotension")
                } else if systolic >= 140 || diastolic >= 90 {
                    Some("hypertensive")
                } else {
                    None
                };
                Some(reading(format!("blood pressure {systolic}/{diastolic}"), note))
            }
            VitalKind::HeartRate => {
                let rate: u32 = caps[1].parse().ok()?;
                let note = if rate > 100 {
                    Some("tachycardia")
                } else if rate < 60 {
                    Some("bradycardia")
                } else {
                    None
                };
                Some(reading(format!("heart rate {rate}"), note))
            }
            VitalKind::RespiratoryRate => {
                let rate: u32 = caps[1].parse().ok()?;
                let note = (rate > 20).then_some("tachypnea");
                Some(reading(format!("respiratory rate {rate}"), note))
            }
            VitalKind::Temperature => {
                let value: f64 = caps[1].parse().ok()?;
                // Readings above 45 are taken as Fahrenheit.
                let febrile = if value > 45.0 {
                    value >= 100.4
                } else {
                    value >= 38.0
                };
                let note = febrile.then_some("fever");
                Some(reading(format!("temperature {}", &caps[1]), note))
            }
            VitalKind::OxygenSaturation => {
                let saturation: u32 = caps[1].parse().ok()?;
                let note = (saturation < 92).then_some("hypoxia");
                Some(reading(format!("oxygen saturation {saturation}%"), note))
            }
        }
    }
}

/// Rejects slash pairs that cannot be a blood pressure, such as dates.
fn plausible_blood_pressure(systolic: u32, diastolic: u32) -> bool {
    (50..=300).contains(&systolic) && (20..=200).contains(&diastolic) && systolic > diastolic
}

fn reading(base: String, note: Option<&str>) -> VitalReading {
    match note {
        Some(note) => VitalReading {
            finding: format!("{base}, {note}"),
            abnormal: true,
        },
        None => VitalReading {
            finding: base,
            abnormal: false,
        },
    }
}

/// Vital-sign patterns, in extraction order.
pub(crate) fn vital_patterns() -> ReasoningResult<Vec<VitalPattern>> {
    const LINK: &str = r"\s*(?:of\s+|is\s+|was\s+|:\s*)?";
    let table = [
        (VitalKind::BloodPressure, r"\b(\d{2,3})/(\d{2,3})\b".to_string()),
        (VitalKind::HeartRate, format!(r"\bheart rate{LINK}(\d{{2,3}})\b")),
        (
            VitalKind::RespiratoryRate,
            format!(r"\brespiratory rate{LINK}(\d{{1,2}})\b"),
        ),
        (
            VitalKind::Temperature,
            format!(r"\btemperature{LINK}(\d{{2,3}}(?:\.\d)?)\b"),
        ),
        (
            VitalKind::OxygenSaturation,
            format!(r"\boxygen saturation{LINK}(\d{{2,3}})\b"),
        ),
    ];

    table
        .into_iter()
        .map(|(kind, pattern)| -> ReasoningResult<VitalPattern> {
            Ok(VitalPattern {
                kind,
                regex: Regex::new(&pattern)?,
            })
        })
        .collect()
}

/// Age references such as `58 year old`, `58yo`, `age 58`.
pub(crate) fn age_pattern() -> ReasoningResult<Regex> {
    Ok(Regex::new(
        r"\b(\d{1,3})\s*-?\s*(?:years?[\s-]old|yo|y/o)\b|\baged?\s*:?\s*(\d{1,3})\b",
    )?)
}

/// Read the age from the first age reference.
pub(crate) fn read_age(pattern: &Regex, text: &str) -> Option<u32> {
    let caps = pattern.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

// ── Section Markers ─────────────────────────────────────────────────────

/// Marker phrases for one record section.
#[derive(Clone, Debug)]
pub(crate) struct SectionPattern {
    pub category: EvidenceCategory,
    regex: Regex,
    clause_end: Regex,
}

/// A located section: the marker that opened it and the clause after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SectionHit {
    pub marker: String,
    pub clause: String,
    /// The clause was cut short at a negation cue.
    pub negated: bool,
}

impl SectionPattern {
    pub fn new(category: EvidenceCategory, markers: &[String]) -> ReasoningResult<Option<Self>> {
        let Some(regex) = alternation(markers)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            category,
            regex,
            clause_end: Regex::new(r"[.;!?\n]")?,
        }))
    }

    /// First marker occurrence and the affirmed clause that follows it.
    ///
    /// The clause is cut at the first negation cue inside it, so a denied
    /// finding never rides along on a section item.
    pub fn find(&self, text: &str, scopes: &[NegationScope]) -> Option<SectionHit> {
        let marker = self.regex.find(text)?;
        let from = marker.end();
        let clause_end = self
            .clause_end
            .find_at(text, from)
            .map_or(text.len(), |m| m.start());
        let cue = scopes
            .iter()
            .map(|s| s.cue)
            .filter(|&cue| cue >= from && cue < clause_end)
            .min();
        let to = cue.unwrap_or(clause_end);

        let clause: String = trim_clause(&text[from..to])
            .chars()
            .take(MAX_CLAUSE_CHARS)
            .collect();

        Some(SectionHit {
            marker: marker.as_str().to_string(),
            clause: clause.trim_end().to_string(),
            negated: cue.is_some(),
        })
    }
}

/// Strip list punctuation at both ends and a dangling conjunction at the end.
fn trim_clause(clause: &str) -> &str {
    let punctuation = |c: char| c.is_whitespace() || c == ':' || c == ',' || c == '-';
    let mut clause = clause.trim_matches(punctuation);
    for conjunction in [" and", " or"] {
        if let Some(head) = clause.strip_suffix(conjunction) {
            clause = head.trim_end_matches(punctuation);
        }
    }
    clause
}

/// Section patterns in extraction order. Sections without markers are skipped.
pub(crate) fn section_patterns(markers: &SectionMarkers) -> ReasoningResult<Vec<SectionPattern>> {
    let table = [
        (EvidenceCategory::PhysicalExam, &markers.physical_exam),
        (EvidenceCategory::Assessment, &markers.assessment),
        (EvidenceCategory::Allergies, &markers.allergies),
        (EvidenceCategory::SocialHistory, &markers.social_history),
        (EvidenceCategory::FamilyHistory, &markers.family_history),
    ];

    let mut patterns = Vec::with_capacity(table.len());
    for (category, phrases) in table {
        if let Some(pattern) = SectionPattern::new(category, phrases)? {
            patterns.push(pattern);
        }
    }
    Ok(patterns)
}
