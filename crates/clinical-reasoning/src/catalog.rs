//! Condition catalog and clinical vocabularies.
//!
//! The catalog is defined exactly once, in a versioned TOML resource that is
//! embedded at compile time and can also be loaded from disk for review of
//! alternate content. It is validated when loaded and immutable afterwards,
//! so a single [`KnowledgeBase`] can be shared across sessions without locking.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ReasoningError, ReasoningResult};
use crate::types::{DiagnosticAction, Urgency};

/// Built-in clinical knowledge shipped with the crate.
pub const BUILTIN_KNOWLEDGE: &str = include_str!("../data/clinical_knowledge.toml");

// ── Condition Entries ───────────────────────────────────────────────────

/// Index of a condition in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConditionId(pub usize);

impl std::fmt::Display for ConditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "condition:{}", self.0)
    }
}

/// Billing complexity tag of a condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingComplexity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for BillingComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Which clinical scoring rule applies to a condition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringRule {
    /// HEART-like cardiac risk score.
    Heart,
    /// Wells-like embolism risk score.
    Wells,
    /// Fixed default score.
    #[default]
    None,
}

impl std::fmt::Display for ScoringRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heart => write!(f, "heart"),
            Self::Wells => write!(f, "wells"),
            Self::None => write!(f, "none"),
        }
    }
}

/// A candidate condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionEntry {
    /// Stable snake_case key.
    pub id: String,
    /// Display name.
    pub name: String,
    pub symptom_keywords: Vec<String>,
    pub risk_factor_keywords: Vec<String>,
    /// Prior probability, strictly inside (0, 1).
    pub base_prior_probability: f64,
    pub time_to_decision_seconds: u32,
    #[serde(default)]
    pub diagnostic_code: Option<String>,
    pub billing_complexity: BillingComplexity,
    #[serde(default)]
    pub scoring: ScoringRule,
    #[serde(default)]
    pub workup: Vec<DiagnosticAction>,
    #[serde(default)]
    pub documentation_template: Option<String>,
}

impl ConditionEntry {
    /// Urgency tier derived from the decision-time budget.
    pub fn urgency(&self) -> Urgency {
        Urgency::from_time_to_decision(self.time_to_decision_seconds)
    }

    fn normalize(&mut self) {
        self.id = self.id.trim().to_string();
        self.name = self.name.trim().to_string();
        lowercase_all(&mut self.symptom_keywords);
        lowercase_all(&mut self.risk_factor_keywords);
    }

    fn validate(&self) -> ReasoningResult<()> {
        let invalid = |reason: String| ReasoningError::CatalogValidation {
            condition: if self.id.is_empty() {
                self.name.clone()
            } else {
                self.id.clone()
            },
            reason,
        };

        if self.id.is_empty() {
            return Err(invalid("missing id".into()));
        }
        if self.name.is_empty() {
            return Err(invalid("missing name".into()));
        }
        let prior = self.base_prior_probability;
        if !(prior > 0.0 && prior < 1.0) {
            return Err(invalid(format!("base prior {prior} outside (0, 1)")));
        }
        if self.symptom_keywords.is_empty() {
            return Err(invalid("no symptom keywords".into()));
        }
        if self.symptom_keywords.iter().any(|k| k.is_empty()) {
            return Err(invalid("empty symptom keyword".into()));
        }
        if self.workup.iter().any(|a| a.action.trim().is_empty()) {
            return Err(invalid("empty workup action".into()));
        }
        Ok(())
    }
}

// ── Condition Catalog ───────────────────────────────────────────────────

/// Immutable, indexed table of candidate conditions.
#[derive(Clone, Debug)]
pub struct ConditionCatalog {
    entries: Vec<ConditionEntry>,
    index: HashMap<String, ConditionId>,
}

impl ConditionCatalog {
    /// Validate entries and build the name/id lookup table.
    pub fn new(mut entries: Vec<ConditionEntry>) -> ReasoningResult<Self> {
        if entries.is_empty() {
            return Err(ReasoningError::Configuration(
                "condition catalog is empty".into(),
            ));
        }

        let mut index = HashMap::with_capacity(entries.len() * 2);
        for (position, entry) in entries.iter_mut().enumerate() {
            entry.normalize();
            entry.validate()?;

            let id = ConditionId(position);
            for key in [entry.id.to_lowercase(), entry.name.to_lowercase()] {
                if let Some(existing) = index.insert(key.clone(), id) {
                    if existing != id {
                        return Err(ReasoningError::CatalogValidation {
                            condition: entry.id.clone(),
                            reason: format!("duplicate condition key '{key}'"),
                        });
                    }
                }
            }
        }

        Ok(Self { entries, index })
    }

    /// Entry at the given index.
    ///
    /// Panics if the id did not come from this catalog.
    pub fn get(&self, id: ConditionId) -> &ConditionEntry {
        &self.entries[id.0]
    }

    /// Entry at the given index, if the id is in range.
    pub fn try_get(&self, id: ConditionId) -> Option<&ConditionEntry> {
        self.entries.get(id.0)
    }

    /// The entry a hypothesis refers to, by index and display name.
    ///
    /// Ids from a different catalog resolve to `None` instead of to an
    /// unrelated entry that happens to share the index.
    pub fn resolve(&self, id: ConditionId, name: &str) -> Option<&ConditionEntry> {
        self.try_get(id).filter(|entry| entry.name == name)
    }

    /// Find a condition by id or display name (case-insensitive).
    pub fn lookup(&self, key: &str) -> Option<ConditionId> {
        self.index.get(&key.trim().to_lowercase()).copied()
    }

    /// Find a condition, failing on unknown names.
    pub fn require(&self, key: &str) -> ReasoningResult<&ConditionEntry> {
        self.lookup(key)
            .map(|id| self.get(id))
            .ok_or_else(|| ReasoningError::UnknownCondition(key.to_string()))
    }

    /// Iterate entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (ConditionId, &ConditionEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (ConditionId(i), entry))
    }

    pub fn entries(&self) -> &[ConditionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Vocabulary ──────────────────────────────────────────────────────────

/// Record-section marker phrases.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionMarkers {
    pub physical_exam: Vec<String>,
    pub assessment: Vec<String>,
    pub allergies: Vec<String>,
    pub social_history: Vec<String>,
    pub family_history: Vec<String>,
}

/// Keyword tables used by the evidence extractor and quality scorer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vocabulary {
    pub high_significance_symptoms: Vec<String>,
    pub medium_significance_symptoms: Vec<String>,
    #[serde(default)]
    pub other_symptoms: Vec<String>,
    pub medications: Vec<String>,
    /// Brand name to generic name.
    #[serde(default)]
    pub brand_names: BTreeMap<String, String>,
    /// Whole-word abbreviation to expansion.
    #[serde(default)]
    pub abbreviations: BTreeMap<String, String>,
    pub chief_complaint_phrases: Vec<String>,
    #[serde(default)]
    pub history_terms: Vec<String>,
    #[serde(default)]
    pub negation_cues: Vec<String>,
    #[serde(default)]
    pub negation_terminators: Vec<String>,
    #[serde(default)]
    pub section_markers: SectionMarkers,
}

impl Vocabulary {
    /// Clinical significance of a symptom term by tier.
    pub fn symptom_significance(&self, term: &str) -> f64 {
        if self.high_significance_symptoms.iter().any(|t| t == term) {
            0.9
        } else if self.medium_significance_symptoms.iter().any(|t| t == term) {
            0.6
        } else {
            0.4
        }
    }

    /// All symptom terms, high tier first.
    pub fn symptom_terms(&self) -> impl Iterator<Item = &String> {
        self.high_significance_symptoms
            .iter()
            .chain(&self.medium_significance_symptoms)
            .chain(&self.other_symptoms)
    }

    /// Brand names that map to the given generic.
    pub fn brands_of<'a>(&'a self, generic: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.brand_names
            .iter()
            .filter(move |(_, g)| g.as_str() == generic)
            .map(|(brand, _)| brand)
    }

    fn normalize(&mut self) {
        lowercase_all(&mut self.high_significance_symptoms);
        lowercase_all(&mut self.medium_significance_symptoms);
        lowercase_all(&mut self.other_symptoms);
        lowercase_all(&mut self.medications);
        lowercase_all(&mut self.chief_complaint_phrases);
        lowercase_all(&mut self.history_terms);
        lowercase_all(&mut self.negation_cues);
        lowercase_all(&mut self.negation_terminators);
        lowercase_all(&mut self.section_markers.physical_exam);
        lowercase_all(&mut self.section_markers.assessment);
        lowercase_all(&mut self.section_markers.allergies);
        lowercase_all(&mut self.section_markers.social_history);
        lowercase_all(&mut self.section_markers.family_history);
        self.brand_names = std::mem::take(&mut self.brand_names)
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
            .collect();
        self.abbreviations = std::mem::take(&mut self.abbreviations)
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
            .collect();
    }

    fn validate(&self) -> ReasoningResult<()> {
        if self.high_significance_symptoms.is_empty() && self.medium_significance_symptoms.is_empty()
        {
            return Err(ReasoningError::Configuration(
                "vocabulary defines no symptoms".into(),
            ));
        }
        if self.chief_complaint_phrases.is_empty() {
            return Err(ReasoningError::Configuration(
                "vocabulary defines no chief complaint phrases".into(),
            ));
        }
        let empty = self
            .symptom_terms()
            .chain(&self.medications)
            .chain(&self.chief_complaint_phrases)
            .chain(&self.history_terms)
            .chain(&self.negation_cues)
            .any(|t| t.is_empty());
        if empty {
            return Err(ReasoningError::Configuration(
                "vocabulary contains an empty term".into(),
            ));
        }
        if let Some((brand, generic)) = self
            .brand_names
            .iter()
            .find(|(_, generic)| !self.medications.contains(generic))
        {
            return Err(ReasoningError::Configuration(format!(
                "brand '{brand}' maps to unknown medication '{generic}'"
            )));
        }
        Ok(())
    }
}

// ── Knowledge Base ──────────────────────────────────────────────────────

fn default_template() -> String {
    "{condition}: document {symptoms}; risk factors ({risk_factors}); code {code}.".into()
}

#[derive(Deserialize)]
struct KnowledgeFile {
    version: String,
    #[serde(default = "default_template")]
    default_documentation_template: String,
    vocabulary: Vocabulary,
    conditions: Vec<ConditionEntry>,
}

/// Versioned clinical content: the condition catalog plus vocabularies.
#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    version: String,
    default_template: String,
    vocabulary: Vocabulary,
    catalog: ConditionCatalog,
    medical_terms: Vec<String>,
    /// One whole-word pattern per entry of `medical_terms`.
    term_patterns: Vec<Regex>,
}

impl KnowledgeBase {
    /// The knowledge base embedded in the crate.
    pub fn builtin() -> ReasoningResult<Self> {
        Self::from_toml_str(BUILTIN_KNOWLEDGE)
    }

    /// Load a knowledge base file.
    pub fn load(path: impl AsRef<Path>) -> ReasoningResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a knowledge base.
    pub fn from_toml_str(contents: &str) -> ReasoningResult<Self> {
        let file: KnowledgeFile = toml::from_str(contents)?;
        let version = file.version.trim().to_string();
        if version.is_empty() {
            return Err(ReasoningError::Configuration(
                "knowledge base version is empty".into(),
            ));
        }

        let mut vocabulary = file.vocabulary;
        vocabulary.normalize();
        vocabulary.validate()?;

        let catalog = ConditionCatalog::new(file.conditions)?;
        let medical_terms = collect_medical_terms(&vocabulary, &catalog);
        let term_patterns = medical_terms
            .iter()
            .map(|term| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            version = %version,
            conditions = catalog.len(),
            terms = medical_terms.len(),
            "Loaded clinical knowledge base"
        );

        Ok(Self {
            version,
            default_template: file.default_documentation_template,
            vocabulary,
            catalog,
            medical_terms,
            term_patterns,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn catalog(&self) -> &ConditionCatalog {
        &self.catalog
    }

    /// Deduplicated vocabulary and catalog terms, sorted.
    pub fn medical_terms(&self) -> &[String] {
        &self.medical_terms
    }

    /// Whole-word occurrences of every medical term in `text`, summed over
    /// terms. Overlapping terms such as `chest pain` and `pain` both count.
    pub fn count_medical_terms(&self, text: &str) -> usize {
        self.term_patterns
            .iter()
            .map(|pattern| pattern.find_iter(text).count())
            .sum()
    }

    /// Documentation template for a condition, falling back to the default.
    pub fn documentation_template(&self, id: ConditionId) -> &str {
        self.catalog
            .try_get(id)
            .and_then(|entry| entry.documentation_template.as_deref())
            .unwrap_or(&self.default_template)
    }
}

fn collect_medical_terms(vocabulary: &Vocabulary, catalog: &ConditionCatalog) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut terms: Vec<String> = vocabulary
        .symptom_terms()
        .chain(&vocabulary.medications)
        .chain(vocabulary.brand_names.keys())
        .chain(&vocabulary.history_terms)
        .chain(
            catalog
                .entries()
                .iter()
                .flat_map(|e| e.symptom_keywords.iter().chain(&e.risk_factor_keywords)),
        )
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect();
    terms.sort();
    terms
}

fn lowercase_all(values: &mut [String]) {
    for value in values.iter_mut() {
        *value = value.trim().to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        version = "test-1"

        [vocabulary]
        high_significance_symptoms = ["chest pain"]
        medium_significance_symptoms = ["nausea"]
        medications = ["aspirin"]
        chief_complaint_phrases = ["presents with"]

        [vocabulary.brand_names]
        bayer = "aspirin"

        [[conditions]]
        id = "mi"
        name = "Myocardial Infarction"
        symptom_keywords = ["Chest Pain"]
        risk_factor_keywords = []
        base_prior_probability = 0.02
        time_to_decision_seconds = 180
        billing_complexity = "high"
    "#;

    fn with_prior(prior: &str) -> String {
        MINIMAL.replace("base_prior_probability = 0.02", &format!("base_prior_probability = {prior}"))
    }

    #[test]
    fn builtin_knowledge_loads() {
        let kb = KnowledgeBase::builtin().unwrap();
        assert!(!kb.version().is_empty());
        assert!(kb.catalog().len() >= 8);
        let mi = kb.catalog().require("Acute Myocardial Infarction").unwrap();
        assert!((mi.base_prior_probability - 0.02).abs() < f64::EPSILON);
        assert_eq!(mi.urgency(), Urgency::Immediate);
        assert_eq!(mi.scoring, ScoringRule::Heart);
    }

    #[test]
    fn builtin_catalog_defines_each_condition_once() {
        let kb = KnowledgeBase::builtin().unwrap();
        let names: HashSet<&str> = kb
            .catalog()
            .entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names.len(), kb.catalog().len());
    }

    #[test]
    fn minimal_knowledge_normalizes_keywords() {
        let kb = KnowledgeBase::from_toml_str(MINIMAL).unwrap();
        let entry = kb.catalog().get(ConditionId(0));
        assert_eq!(entry.symptom_keywords, vec!["chest pain".to_string()]);
        assert_eq!(entry.scoring, ScoringRule::None);
        assert!(entry.diagnostic_code.is_none());
    }

    #[test]
    fn lookup_by_id_or_name() {
        let kb = KnowledgeBase::from_toml_str(MINIMAL).unwrap();
        assert_eq!(kb.catalog().lookup("mi"), Some(ConditionId(0)));
        assert_eq!(
            kb.catalog().lookup("myocardial infarction"),
            Some(ConditionId(0))
        );
        assert!(kb.catalog().lookup("gout").is_none());
        assert!(matches!(
            kb.catalog().require("gout"),
            Err(ReasoningError::UnknownCondition(_))
        ));
    }

    #[test]
    fn rejects_prior_outside_open_interval() {
        for prior in ["0.0", "1.0", "1.5", "-0.1"] {
            let err = KnowledgeBase::from_toml_str(&with_prior(prior)).unwrap_err();
            assert!(
                matches!(err, ReasoningError::CatalogValidation { .. }),
                "prior {prior} should be rejected, got {err}"
            );
        }
    }

    #[test]
    fn rejects_missing_required_field() {
        let broken = MINIMAL.replace("time_to_decision_seconds = 180", "");
        let err = KnowledgeBase::from_toml_str(&broken).unwrap_err();
        assert!(matches!(err, ReasoningError::KnowledgeParse(_)));
    }

    #[test]
    fn rejects_duplicate_conditions() {
        let duplicated = format!(
            "{MINIMAL}\n[[conditions]]\nid = \"mi-2\"\nname = \"Myocardial Infarction\"\nsymptom_keywords = [\"chest pain\"]\nrisk_factor_keywords = []\nbase_prior_probability = 0.02\ntime_to_decision_seconds = 180\nbilling_complexity = \"high\"\n"
        );
        let err = KnowledgeBase::from_toml_str(&duplicated).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_brand_for_unknown_generic() {
        let broken = MINIMAL.replace("bayer = \"aspirin\"", "bayer = \"aspirine\"");
        assert!(KnowledgeBase::from_toml_str(&broken).is_err());
    }

    #[test]
    fn symptom_significance_tiers() {
        let kb = KnowledgeBase::builtin().unwrap();
        let vocab = kb.vocabulary();
        assert_eq!(vocab.symptom_significance("chest pain"), 0.9);
        assert_eq!(vocab.symptom_significance("nausea"), 0.6);
        assert_eq!(vocab.symptom_significance("burning"), 0.4);
    }

    #[test]
    fn medical_terms_are_deduplicated() {
        let kb = KnowledgeBase::builtin().unwrap();
        let terms = kb.medical_terms();
        let unique: HashSet<&String> = terms.iter().collect();
        assert_eq!(unique.len(), terms.len());
        assert!(terms.contains(&"chest pain".to_string()));
        assert!(terms.contains(&"tylenol".to_string()));
    }

    #[test]
    fn medical_terms_count_whole_words() {
        let kb = KnowledgeBase::builtin().unwrap();
        assert_eq!(kb.count_medical_terms("dinner at the restaurant"), 0);
        assert!(kb.count_medical_terms("migraine with aura") >= 1);
        assert_eq!(
            kb.count_medical_terms("cough, then more cough"),
            2 * kb.count_medical_terms("cough")
        );
    }

    #[test]
    fn resolve_checks_index_and_name() {
        let kb = KnowledgeBase::builtin().unwrap();
        let catalog = kb.catalog();
        let mi = catalog.lookup("acute_myocardial_infarction").unwrap();
        assert!(catalog.resolve(mi, "Acute Myocardial Infarction").is_some());
        assert!(catalog.resolve(mi, "Sepsis").is_none());
        assert!(catalog.resolve(ConditionId(catalog.len() + 3), "Sepsis").is_none());
        assert!(catalog.try_get(ConditionId(catalog.len())).is_none());
    }

    #[test]
    fn documentation_template_falls_back_to_default() {
        let kb = KnowledgeBase::builtin().unwrap();
        let mi = kb.catalog().lookup("acute_myocardial_infarction").unwrap();
        let sepsis = kb.catalog().lookup("sepsis").unwrap();
        assert!(kb.documentation_template(mi).contains("troponin"));
        assert!(kb.documentation_template(sepsis).contains("{condition}"));
    }
}
