//! Portfolio data - free-form sections plus project and experience rows.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKey {
    Hero,
    About,
    Skills,
    Now,
}

impl SectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Hero => "hero",
            SectionKey::About => "about",
            SectionKey::Skills => "skills",
            SectionKey::Now => "now",
        }
    }
}

/// Stored section payload, exactly as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub key: String,
    pub content: Value,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub badge: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub cta_label: Option<String>,
    pub cta_href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AboutSection {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillsSection {
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NowSection {
    pub title: Option<String>,
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSections {
    pub hero: Option<HeroSection>,
    pub about: Option<AboutSection>,
    pub skills: Option<SkillsSection>,
    pub now: Option<NowSection>,
}

/// Payloads that are not JSON objects (or do not fit the shape) read as absent.
fn typed_section<T: DeserializeOwned>(records: &[SectionRecord], key: SectionKey) -> Option<T> {
    records
        .iter()
        .find(|r| r.key == key.as_str())
        .filter(|r| r.content.is_object())
        .and_then(|r| serde_json::from_value(r.content.clone()).ok())
}

impl PortfolioSections {
    pub fn from_records(records: &[SectionRecord]) -> Self {
        Self {
            hero: typed_section(records, SectionKey::Hero),
            about: typed_section(records, SectionKey::About),
            skills: typed_section(records, SectionKey::Skills),
            now: typed_section(records, SectionKey::Now),
        }
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

impl ProjectLinks {
    /// Empty URLs are left out of the map entirely.
    pub fn new(github: &str, demo: &str, docs: &str) -> Self {
        let keep = |url: &str| {
            let url = url.trim();
            (!url.is_empty()).then(|| url.to_string())
        };
        Self {
            github: keep(github),
            demo: keep(demo),
            docs: keep(docs),
        }
    }

    /// Lenient read of the stored JSON: anything but an object means no links.
    pub fn from_json(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioProject {
    pub id: Uuid,
    pub title: String,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub stack_tags: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub links: ProjectLinks,
    pub pinned: bool,
    pub sort_order: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Values written for a project; empty strings are stored as null.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInput {
    pub title: String,
    pub excerpt: String,
    pub description: String,
    pub stack_tags: Vec<String>,
    pub thumbnail_url: String,
    pub links: ProjectLinks,
    pub pinned: bool,
    pub sort_order: i32,
}

/// Pinned first, then ascending sort order, then most recently updated.
pub fn project_order(a: &PortfolioProject, b: &PortfolioProject) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then(a.sort_order.cmp(&b.sort_order))
        .then(b.updated_at.cmp(&a.updated_at))
}

// ============================================================================
// Experience
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioExperience {
    pub id: Uuid,
    pub org: String,
    pub role: String,
    pub start_date: Option<String>,
    /// `None` means the position is current.
    pub end_date: Option<String>,
    pub bullets: Vec<String>,
    pub sort_order: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PortfolioExperience {
    pub fn period(&self) -> String {
        format_period(self.start_date.as_deref(), self.end_date.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceInput {
    pub org: String,
    pub role: String,
    pub start_date: String,
    pub end_date: String,
    pub bullets: Vec<String>,
    pub sort_order: i32,
}

/// Ascending sort order, then latest end date (open-ended last), then most recently updated.
pub fn experience_order(a: &PortfolioExperience, b: &PortfolioExperience) -> Ordering {
    let end_desc_nulls_last = match (&a.end_date, &b.end_date) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    a.sort_order
        .cmp(&b.sort_order)
        .then(end_desc_nulls_last)
        .then(b.updated_at.cmp(&a.updated_at))
}

pub fn format_period(start: Option<&str>, end: Option<&str>) -> String {
    let start = start.filter(|s| !s.is_empty());
    let end = end.filter(|s| !s.is_empty());
    match (start, end) {
        (None, None) => String::new(),
        (None, Some(end)) => format!("{end} "),
        (Some(start), end) => format!("{start} - {}", end.unwrap_or("Present")),
    }
}

// ============================================================================
// Site reconciliation plan
// ============================================================================

/// One row-level write produced from a site form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum PortfolioChange {
    DeleteProject(Uuid),
    UpdateProject(Uuid, ProjectInput),
    CreateProject(ProjectInput),
    DeleteExperience(Uuid),
    UpdateExperience(Uuid, ExperienceInput),
    CreateExperience(ExperienceInput),
}

/// Everything one site submission writes; applied atomically by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitePlan {
    pub sections: Vec<(SectionKey, Value)>,
    pub changes: Vec<PortfolioChange>,
}

// ============================================================================
// Public view
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectCard {
    pub title: String,
    pub excerpt: String,
    pub stack: Vec<String>,
    pub links: ProjectLinks,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceCard {
    pub org: String,
    pub role: String,
    pub period: String,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioView {
    pub sections: PortfolioSections,
    pub projects: Vec<ProjectCard>,
    pub experiences: Vec<ExperienceCard>,
}

impl PortfolioView {
    pub fn build(
        sections: &[SectionRecord],
        projects: &[PortfolioProject],
        experiences: &[PortfolioExperience],
    ) -> Self {
        Self {
            sections: PortfolioSections::from_records(sections),
            projects: projects
                .iter()
                .map(|p| ProjectCard {
                    title: p.title.clone(),
                    excerpt: p.excerpt.clone().unwrap_or_default(),
                    stack: p.stack_tags.clone(),
                    links: p.links.clone(),
                    thumbnail_url: p.thumbnail_url.clone(),
                })
                .collect(),
            experiences: experiences
                .iter()
                .map(|e| ExperienceCard {
                    org: e.org.clone(),
                    role: e.role.clone(),
                    period: e.period(),
                    points: e.bullets.clone(),
                })
                .collect(),
        }
    }
}
