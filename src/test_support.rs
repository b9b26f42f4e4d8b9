//! In-memory repositories and app state for unit and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::config::Settings;
use crate::content::{
    AdminPostSummary, ContentBody, ContentItem, ContentStatus, LinkPreview, LinkType,
    LinkedDraft, LinkedSource, PostBody, PostDraft,
};
use crate::portfolio::{
    experience_order, project_order, ExperienceInput, PortfolioChange, PortfolioExperience,
    PortfolioProject, ProjectInput, ProjectLinks, SectionKey, SectionRecord, SitePlan,
};
use crate::repo::{ContentRepo, PortfolioRepo, RepoError};
use crate::session::{create_session_token, ADMIN_SESSION_COOKIE};
use crate::state::AppState;
use crate::storage::{validate_key, ObjectStore, StorageError, StoredObject};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse";
pub const SESSION_SECRET: &str = "test-session-secret";

const SLUG_CONSTRAINT: &str = "content_items_post_slug_key";

#[derive(Debug, Clone, Default)]
struct MemoryState {
    items: Vec<ContentItem>,
    sections: Vec<SectionRecord>,
    projects: Vec<PortfolioProject>,
    experiences: Vec<PortfolioExperience>,
}

impl MemoryState {
    fn slug_owner(&self, slug: &str) -> Option<Uuid> {
        self.items
            .iter()
            .find(|item| item.post().and_then(|p| p.slug.as_deref()) == Some(slug))
            .map(|item| item.id)
    }

    fn apply(&mut self, change: &PortfolioChange) {
        let now = Some(Utc::now());
        match change {
            PortfolioChange::DeleteProject(id) => self.projects.retain(|p| p.id != *id),
            PortfolioChange::UpdateProject(id, input) => {
                if let Some(project) = self.projects.iter_mut().find(|p| p.id == *id) {
                    *project = project_from_input(*id, input, project.created_at, now);
                }
            }
            PortfolioChange::CreateProject(input) => {
                self.projects
                    .push(project_from_input(Uuid::new_v4(), input, now, now));
            }
            PortfolioChange::DeleteExperience(id) => self.experiences.retain(|e| e.id != *id),
            PortfolioChange::UpdateExperience(id, input) => {
                if let Some(row) = self.experiences.iter_mut().find(|e| e.id == *id) {
                    *row = experience_from_input(*id, input, row.created_at, now);
                }
            }
            PortfolioChange::CreateExperience(input) => {
                self.experiences
                    .push(experience_from_input(Uuid::new_v4(), input, now, now));
            }
        }
    }

    fn upsert_section(&mut self, key: SectionKey, content: &Value) {
        let record = SectionRecord {
            key: key.as_str().to_string(),
            content: content.clone(),
            updated_at: Some(Utc::now()),
        };
        match self.sections.iter_mut().find(|s| s.key == record.key) {
            Some(existing) => *existing = record,
            None => self.sections.push(record),
        }
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn project_from_input(
    id: Uuid,
    input: &ProjectInput,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
) -> PortfolioProject {
    PortfolioProject {
        id,
        title: input.title.trim().to_string(),
        excerpt: blank_to_none(&input.excerpt),
        description: blank_to_none(&input.description),
        stack_tags: input.stack_tags.clone(),
        thumbnail_url: blank_to_none(&input.thumbnail_url),
        links: input.links.clone(),
        pinned: input.pinned,
        sort_order: input.sort_order,
        created_at,
        updated_at,
    }
}

fn experience_from_input(
    id: Uuid,
    input: &ExperienceInput,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
) -> PortfolioExperience {
    PortfolioExperience {
        id,
        org: input.org.trim().to_string(),
        role: input.role.trim().to_string(),
        start_date: blank_to_none(&input.start_date),
        end_date: blank_to_none(&input.end_date),
        bullets: input.bullets.clone(),
        sort_order: input.sort_order,
        created_at,
        updated_at,
    }
}

/// Both repositories over process memory, mirroring the Postgres statements.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    hidden_probes: AtomicUsize,
    fail_next_plan: AtomicBool,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn insert_item(&self, item: ContentItem) -> Uuid {
        let id = item.id;
        self.lock().items.push(item);
        id
    }

    pub fn seed_post(&self, title: &str, slug: Option<&str>, status: ContentStatus) -> Uuid {
        let now = Utc::now();
        self.insert_item(ContentItem {
            id: Uuid::new_v4(),
            status,
            title: Some(title.to_string()),
            excerpt: None,
            tags: Vec::new(),
            published_at: (status == ContentStatus::Published).then_some(now),
            updated_at: Some(now),
            body: ContentBody::Post(PostBody {
                slug: slug.map(str::to_string),
                content_md: String::new(),
                cover_image_url: None,
            }),
        })
    }

    pub fn seed_project(&self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Some(Utc::now());
        self.lock().projects.push(PortfolioProject {
            id,
            title: title.to_string(),
            excerpt: None,
            description: None,
            stack_tags: Vec::new(),
            thumbnail_url: None,
            links: ProjectLinks::default(),
            pinned: false,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn items(&self) -> Vec<ContentItem> {
        self.lock().items.clone()
    }

    /// Post with that slug regardless of status.
    pub fn post_by_slug(&self, slug: &str) -> Option<ContentItem> {
        self.lock()
            .items
            .iter()
            .find(|item| item.post().and_then(|p| p.slug.as_deref()) == Some(slug))
            .cloned()
    }

    /// The next `count` slug probes report "free", as if another writer
    /// claimed the slug between probe and insert.
    pub fn hide_slugs_from_next_probes(&self, count: usize) {
        self.hidden_probes.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_site_plan(&self) {
        self.fail_next_plan.store(true, Ordering::SeqCst);
    }

    fn duplicate() -> RepoError {
        RepoError::Duplicate {
            constraint: SLUG_CONSTRAINT.to_string(),
        }
    }
}

#[async_trait]
impl ContentRepo for MemoryStore {
    async fn published_items(&self, limit: Option<i64>) -> Result<Vec<ContentItem>, RepoError> {
        let mut items: Vec<ContentItem> = self
            .lock()
            .items
            .iter()
            .filter(|item| item.is_publicly_addressable())
            .cloned()
            .collect();
        items.sort_by(|a, b| match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        if let Some(limit) = limit.filter(|l| *l > 0) {
            items.truncate(limit as usize);
        }
        Ok(items)
    }

    async fn published_post_by_slug(&self, slug: &str) -> Result<Option<ContentItem>, RepoError> {
        Ok(self
            .post_by_slug(slug)
            .filter(|item| item.status == ContentStatus::Published))
    }

    async fn admin_posts(&self) -> Result<Vec<AdminPostSummary>, RepoError> {
        let mut posts: Vec<AdminPostSummary> = self
            .lock()
            .items
            .iter()
            .filter_map(|item| {
                item.post().map(|post| AdminPostSummary {
                    id: item.id,
                    title: item.title.clone(),
                    slug: post.slug.clone(),
                    status: item.status,
                    published_at: item.published_at,
                    updated_at: item.updated_at,
                })
            })
            .collect();
        posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(posts)
    }

    async fn post_by_id(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError> {
        Ok(self
            .lock()
            .items
            .iter()
            .find(|item| item.id == id && item.post().is_some())
            .cloned())
    }

    async fn post_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, RepoError> {
        let hidden = self
            .hidden_probes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hidden {
            return Ok(false);
        }
        Ok(self
            .lock()
            .slug_owner(slug)
            .is_some_and(|owner| Some(owner) != exclude))
    }

    async fn insert_post(&self, draft: &PostDraft) -> Result<Uuid, RepoError> {
        let mut state = self.lock();
        if state.slug_owner(&draft.slug).is_some() {
            return Err(Self::duplicate());
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        state.items.push(ContentItem {
            id,
            status: draft.status,
            title: Some(draft.title.clone()),
            excerpt: blank_to_none(&draft.excerpt),
            tags: draft.tags.clone(),
            published_at: (draft.status == ContentStatus::Published).then_some(now),
            updated_at: Some(now),
            body: ContentBody::Post(PostBody {
                slug: Some(draft.slug.clone()),
                content_md: draft.content_md.clone(),
                cover_image_url: draft.cover_image_url.clone(),
            }),
        });
        Ok(id)
    }

    async fn update_post(&self, id: Uuid, draft: &PostDraft) -> Result<bool, RepoError> {
        let mut state = self.lock();
        if state
            .slug_owner(&draft.slug)
            .is_some_and(|owner| owner != id)
        {
            return Err(Self::duplicate());
        }

        let Some(item) = state
            .items
            .iter_mut()
            .find(|item| item.id == id && item.post().is_some())
        else {
            return Ok(false);
        };

        let now = Utc::now();
        item.published_at = match draft.status {
            ContentStatus::Published => item.published_at.or(Some(now)),
            ContentStatus::Draft => None,
        };
        item.status = draft.status;
        item.title = Some(draft.title.clone());
        item.excerpt = blank_to_none(&draft.excerpt);
        item.tags = draft.tags.clone();
        item.updated_at = Some(now);
        item.body = ContentBody::Post(PostBody {
            slug: Some(draft.slug.clone()),
            content_md: draft.content_md.clone(),
            cover_image_url: draft.cover_image_url.clone(),
        });
        Ok(true)
    }

    async fn insert_linked(&self, draft: &LinkedDraft) -> Result<Uuid, RepoError> {
        let now = Utc::now();
        let source = LinkedSource {
            source_url: draft.source_url.clone(),
            preview: LinkPreview {
                title: Some(draft.title.clone()),
                description: draft.excerpt.clone(),
                image_url: draft.image_url.clone(),
            },
        };
        let body = match draft.link_type {
            LinkType::External => ContentBody::External(source),
            LinkType::Bookmark => ContentBody::Bookmark(source),
        };

        Ok(self.insert_item(ContentItem {
            id: Uuid::new_v4(),
            status: draft.status,
            title: Some(draft.title.clone()),
            excerpt: draft.excerpt.clone(),
            tags: draft.tags.clone(),
            published_at: (draft.status == ContentStatus::Published).then_some(now),
            updated_at: Some(now),
            body,
        }))
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|item| item.id != id);
        Ok(state.items.len() < before)
    }
}

#[async_trait]
impl PortfolioRepo for MemoryStore {
    async fn sections(&self) -> Result<Vec<SectionRecord>, RepoError> {
        let mut sections = self.lock().sections.clone();
        sections.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(sections)
    }

    async fn upsert_section(&self, key: SectionKey, content: &Value) -> Result<(), RepoError> {
        self.lock().upsert_section(key, content);
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<PortfolioProject>, RepoError> {
        let mut projects = self.lock().projects.clone();
        projects.sort_by(project_order);
        Ok(projects)
    }

    async fn experiences(&self) -> Result<Vec<PortfolioExperience>, RepoError> {
        let mut experiences = self.lock().experiences.clone();
        experiences.sort_by(experience_order);
        Ok(experiences)
    }

    async fn apply_site_plan(&self, plan: &SitePlan) -> Result<(), RepoError> {
        let mut state = self.lock();
        let mut working = state.clone();

        for (key, content) in &plan.sections {
            working.upsert_section(*key, content);
        }
        for change in &plan.changes {
            working.apply(change);
        }

        if self.fail_next_plan.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Persistence("simulated failure before commit".into()));
        }

        *state = working;
        Ok(())
    }
}

/// Object store over a map, keyed like the real stores.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
}

impl MemoryObjectStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        let key = validate_key(key)?;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<StoredObject, StorageError> {
        let key = validate_key(key)?;
        let objects = self.objects.lock().unwrap();
        let (data, content_type) = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(StoredObject {
            data: data.clone(),
            content_type: content_type.clone(),
            content_length: Some(data.len() as u64),
            etag: None,
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<MemoryObjectStore>,
}

pub fn test_settings(pairs: &[(&str, &str)]) -> Settings {
    let mut env: HashMap<String, String> = [
        ("ADMIN_EMAIL", ADMIN_EMAIL),
        ("ADMIN_PASSWORD", ADMIN_PASSWORD),
        ("ADMIN_SESSION_SECRET", SESSION_SECRET),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in pairs {
        env.insert(k.to_string(), v.to_string());
    }
    Settings::from_lookup(|key| env.get(key).cloned())
}

pub fn test_app_with(settings: Settings) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let objects = Arc::new(MemoryObjectStore::default());
    let state = AppState::new(settings, store.clone(), store.clone(), objects.clone());
    TestApp {
        state,
        store,
        objects,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(test_settings(&[]))
}

/// `Cookie` header value carrying a valid admin session.
pub fn admin_cookie() -> String {
    let token = create_session_token(ADMIN_EMAIL, SESSION_SECRET).unwrap();
    format!("{ADMIN_SESSION_COOKIE}={token}")
}
