//! Portfolio site editing: one submission rewrites the free-text sections and
//! reconciles the project and experience rows.

use serde_json::{json, Value};
use uuid::Uuid;

use super::form::{parse_sort_order, split_comma_set, split_lines, FormPayload};
use crate::portfolio::{
    ExperienceInput, PortfolioChange, ProjectInput, ProjectLinks, SectionKey, SitePlan,
};
use crate::repo::{PortfolioRepo, RepoError};

/// Checkbox value that marks a row for deletion.
const DELETE_FLAG: &str = "on";

// ============================================================================
// Sections
// ============================================================================

fn hero_value(form: &FormPayload) -> Value {
    json!({
        "badge": form.text("badge"),
        "title": form.text("title"),
        "subtitle": form.text("subtitle"),
        "ctaLabel": form.text("ctaLabel"),
        "ctaHref": form.text("ctaHref"),
    })
}

fn about_value(text: String) -> Value {
    json!({ "text": text })
}

fn now_value(form: &FormPayload) -> Value {
    json!({
        "title": form.text("nowTitle"),
        "items": split_lines(form.get("nowItems").unwrap_or_default()),
    })
}

fn skills_value(form: &FormPayload) -> Value {
    json!({ "items": split_lines(form.get("skillsItems").unwrap_or_default()) })
}

fn saved_location(key: SectionKey) -> String {
    format!("/?manage=portfolio&saved={}", key.as_str())
}

pub async fn update_hero(repo: &dyn PortfolioRepo, form: &FormPayload) -> Result<String, RepoError> {
    repo.upsert_section(SectionKey::Hero, &hero_value(form)).await?;
    Ok(saved_location(SectionKey::Hero))
}

pub async fn update_about(repo: &dyn PortfolioRepo, form: &FormPayload) -> Result<String, RepoError> {
    repo.upsert_section(SectionKey::About, &about_value(form.text("text")))
        .await?;
    Ok(saved_location(SectionKey::About))
}

// ============================================================================
// Rows
// ============================================================================

/// Existing row ids in announcement order, paired with their position.
/// Ids that are not UUIDs are dropped but still occupy their index.
fn announced_rows<'a>(form: &'a FormPayload, id_field: &str) -> Vec<(usize, &'a str, Uuid)> {
    form.get_all(id_field)
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let raw = raw.trim();
            match Uuid::parse_str(raw) {
                Ok(id) => Some((index, raw, id)),
                Err(_) => {
                    tracing::warn!(field = id_field, value = raw, "skipping row with malformed id");
                    None
                }
            }
        })
        .collect()
}

fn is_marked_deleted(form: &FormPayload, delete_field: &str, raw_id: &str) -> bool {
    form.get(&format!("{delete_field}:{raw_id}")).map(str::trim) == Some(DELETE_FLAG)
}

fn project_row(form: &FormPayload, raw_id: &str, index: usize) -> ProjectInput {
    let field = |name: &str| form.row_text(name, raw_id, index);
    ProjectInput {
        title: field("projectTitle"),
        excerpt: field("projectExcerpt"),
        description: field("projectDescription"),
        stack_tags: split_comma_set(&field("projectStackTags")),
        thumbnail_url: field("projectThumbnailUrl"),
        links: ProjectLinks::new(
            &field("projectGithubUrl"),
            &field("projectDemoUrl"),
            &field("projectDocsUrl"),
        ),
        pinned: field("projectPinned") == "1",
        sort_order: parse_sort_order(form.row_field("projectSortOrder", raw_id, index)),
    }
}

fn new_project(form: &FormPayload) -> ProjectInput {
    ProjectInput {
        title: form.text("newProjectTitle"),
        excerpt: form.text("newProjectExcerpt"),
        description: form.text("newProjectDescription"),
        stack_tags: split_comma_set(&form.text("newProjectStackTags")),
        thumbnail_url: form.text("newProjectThumbnailUrl"),
        links: ProjectLinks::new(
            &form.text("newProjectGithubUrl"),
            &form.text("newProjectDemoUrl"),
            &form.text("newProjectDocsUrl"),
        ),
        pinned: form.text("newProjectPinned") == "1",
        sort_order: parse_sort_order(form.get("newProjectSortOrder")),
    }
}

fn experience_row(form: &FormPayload, raw_id: &str, index: usize) -> ExperienceInput {
    let field = |name: &str| form.row_text(name, raw_id, index);
    ExperienceInput {
        org: field("experienceOrg"),
        role: field("experienceRole"),
        start_date: field("experienceStartDate"),
        end_date: field("experienceEndDate"),
        bullets: split_lines(&field("experienceBullets")),
        sort_order: parse_sort_order(form.row_field("experienceSortOrder", raw_id, index)),
    }
}

fn new_experience(form: &FormPayload) -> ExperienceInput {
    ExperienceInput {
        org: form.text("newExperienceOrg"),
        role: form.text("newExperienceRole"),
        start_date: form.text("newExperienceStartDate"),
        end_date: form.text("newExperienceEndDate"),
        bullets: split_lines(form.get("newExperienceBullets").unwrap_or_default()),
        sort_order: parse_sort_order(form.get("newExperienceSortOrder")),
    }
}

/// Every write implied by one site form submission.
pub fn build_site_plan(form: &FormPayload) -> SitePlan {
    let mut plan = SitePlan {
        sections: vec![
            (SectionKey::Hero, hero_value(form)),
            (SectionKey::About, about_value(form.text("aboutText"))),
            (SectionKey::Now, now_value(form)),
            (SectionKey::Skills, skills_value(form)),
        ],
        changes: Vec::new(),
    };

    for (index, raw_id, id) in announced_rows(form, "projectId") {
        if is_marked_deleted(form, "projectDelete", raw_id) {
            plan.changes.push(PortfolioChange::DeleteProject(id));
            continue;
        }
        let input = project_row(form, raw_id, index);
        if !input.title.is_empty() {
            plan.changes.push(PortfolioChange::UpdateProject(id, input));
        }
    }

    let project = new_project(form);
    if !project.title.is_empty() {
        plan.changes.push(PortfolioChange::CreateProject(project));
    }

    for (index, raw_id, id) in announced_rows(form, "experienceId") {
        if is_marked_deleted(form, "experienceDelete", raw_id) {
            plan.changes.push(PortfolioChange::DeleteExperience(id));
            continue;
        }
        let input = experience_row(form, raw_id, index);
        if !input.org.is_empty() && !input.role.is_empty() {
            plan.changes.push(PortfolioChange::UpdateExperience(id, input));
        }
    }

    let experience = new_experience(form);
    if !experience.org.is_empty() && !experience.role.is_empty() {
        plan.changes.push(PortfolioChange::CreateExperience(experience));
    }

    plan
}

pub async fn save_site(repo: &dyn PortfolioRepo, form: &FormPayload) -> Result<String, RepoError> {
    let plan = build_site_plan(form);
    repo.apply_site_plan(&plan).await?;
    Ok("/".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    fn payload(pairs: &[(&str, &str)]) -> FormPayload {
        FormPayload::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn sections_are_always_replaced() {
        let plan = build_site_plan(&payload(&[
            ("title", " Hi "),
            ("aboutText", "About me"),
            ("nowItems", "one\n\n two "),
        ]));
        let keys: Vec<_> = plan.sections.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![SectionKey::Hero, SectionKey::About, SectionKey::Now, SectionKey::Skills]
        );
        assert_eq!(plan.sections[0].1["title"], "Hi");
        assert_eq!(plan.sections[0].1["badge"], "");
        assert_eq!(plan.sections[1].1, json!({"text": "About me"}));
        assert_eq!(plan.sections[2].1["items"], json!(["one", "two"]));
        assert_eq!(plan.sections[3].1, json!({"items": []}));
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn keyed_rows_bind_by_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let plan = build_site_plan(&payload(&[
            ("projectId", a.to_string().as_str()),
            ("projectId", b.to_string().as_str()),
            (format!("projectTitle:{b}").as_str(), "Second"),
            (format!("projectTitle:{a}").as_str(), "First"),
            (format!("projectPinned:{a}").as_str(), "1"),
            (format!("projectSortOrder:{b}").as_str(), "4"),
            (format!("projectGithubUrl:{a}").as_str(), "https://github.com/me/a"),
        ]));

        assert_eq!(plan.changes.len(), 2);
        match &plan.changes[0] {
            PortfolioChange::UpdateProject(id, input) => {
                assert_eq!(*id, a);
                assert_eq!(input.title, "First");
                assert!(input.pinned);
                assert_eq!(input.links.github.as_deref(), Some("https://github.com/me/a"));
            }
            other => panic!("unexpected change {other:?}"),
        }
        match &plan.changes[1] {
            PortfolioChange::UpdateProject(id, input) => {
                assert_eq!(*id, b);
                assert_eq!(input.title, "Second");
                assert_eq!(input.sort_order, 4);
                assert!(!input.pinned);
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn index_alignment_is_the_fallback_and_short_tails_read_empty() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let plan = build_site_plan(&payload(&[
            ("experienceId", a.to_string().as_str()),
            ("experienceId", b.to_string().as_str()),
            ("experienceOrg", "Acme"),
            ("experienceRole", "Engineer"),
            ("experienceBullets", "Built things\nShipped things"),
            ("experienceSortOrder", "nope"),
        ]));

        assert_eq!(plan.changes.len(), 1);
        match &plan.changes[0] {
            PortfolioChange::UpdateExperience(id, input) => {
                assert_eq!(*id, a);
                assert_eq!(input.org, "Acme");
                assert_eq!(input.bullets, vec!["Built things", "Shipped things"]);
                assert_eq!(input.sort_order, 0);
                assert_eq!(input.end_date, "");
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn delete_flag_wins_and_malformed_ids_are_skipped() {
        let a = Uuid::new_v4();
        let plan = build_site_plan(&payload(&[
            ("projectId", "not-a-uuid"),
            ("projectId", a.to_string().as_str()),
            ("projectTitle", "Ignored"),
            ("projectTitle", "Still deleted"),
            (format!("projectDelete:{a}").as_str(), "on"),
        ]));
        assert_eq!(plan.changes, vec![PortfolioChange::DeleteProject(a)]);
    }

    #[test]
    fn new_rows_need_their_required_fields() {
        let plan = build_site_plan(&payload(&[
            ("newProjectTitle", "  "),
            ("newExperienceOrg", "Acme"),
            ("newExperienceRole", ""),
        ]));
        assert!(plan.changes.is_empty());

        let plan = build_site_plan(&payload(&[
            ("newProjectTitle", "CMS"),
            ("newProjectStackTags", "Rust, Postgres, Rust"),
            ("newProjectDemoUrl", "https://demo.example.com"),
            ("newProjectPinned", "1"),
            ("newExperienceOrg", "Acme"),
            ("newExperienceRole", "Engineer"),
        ]));
        assert_eq!(plan.changes.len(), 2);
        match &plan.changes[0] {
            PortfolioChange::CreateProject(input) => {
                assert_eq!(input.stack_tags, vec!["Rust", "Postgres"]);
                assert_eq!(input.links.to_json(), json!({"demo": "https://demo.example.com"}));
                assert!(input.pinned);
            }
            other => panic!("unexpected change {other:?}"),
        }
        assert!(matches!(plan.changes[1], PortfolioChange::CreateExperience(_)));
    }

    #[tokio::test]
    async fn delete_and_insert_in_one_submission() {
        let store = MemoryStore::default();
        let old = store.seed_project("Old project");
        let kept = store.seed_project("Kept project");

        let location = save_site(
            &store,
            &payload(&[
                ("projectId", old.to_string().as_str()),
                ("projectId", kept.to_string().as_str()),
                (format!("projectDelete:{old}").as_str(), "on"),
                (format!("projectTitle:{kept}").as_str(), "Kept project"),
                ("newProjectTitle", "New project"),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(location, "/");

        let mut titles: Vec<_> = store
            .projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Kept project", "New project"]);
        assert_eq!(store.sections().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failed_plan_leaves_everything_untouched() {
        let store = MemoryStore::default();
        let old = store.seed_project("Old project");
        store.fail_next_site_plan();

        let result = save_site(
            &store,
            &payload(&[
                ("projectId", old.to_string().as_str()),
                (format!("projectDelete:{old}").as_str(), "on"),
                ("newProjectTitle", "New project"),
                ("aboutText", "changed"),
            ]),
        )
        .await;
        assert!(result.is_err());

        let projects = store.projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].title, "Old project");
        assert!(store.sections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_section_updates_redirect_with_saved_key() {
        let store = MemoryStore::default();
        assert_eq!(
            update_hero(&store, &payload(&[("title", "Hello")])).await.unwrap(),
            "/?manage=portfolio&saved=hero"
        );
        assert_eq!(
            update_about(&store, &payload(&[("text", " Me ")])).await.unwrap(),
            "/?manage=portfolio&saved=about"
        );

        let sections = store.sections().await.unwrap();
        let about = sections.iter().find(|s| s.key == "about").unwrap();
        assert_eq!(about.content, json!({"text": "Me"}));
    }
}
