//! Task and category operations

use bson::{doc, oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::mongo::with_retry;
use crate::db::schemas::{ProgressDoc, TaskCategoryDoc, TaskDoc, TaskStatus};
use crate::resolver::{Bottleneck, TaskGraph};
use crate::types::{Result, WaypointError};

use super::Store;

/// Default categories seeded into an empty collection
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Onboarding", "Environment setup and first steps", "#1E88E5"),
    ("Development", "Feature and bug-fix work", "#43A047"),
    ("Documentation", "Writing and reviewing docs", "#FB8C00"),
    ("Research", "Reading, spikes and evaluations", "#8E24AA"),
];

/// Input for task creation
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub resources: Vec<crate::db::schemas::ResourceLink>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// A task as one user sees it, with gate state attached
#[derive(Serialize, Clone, Debug)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: TaskDoc,
    pub status: TaskStatus,
    pub can_start: bool,
    pub blocked_by: Vec<String>,
}

impl Store {
    /// Create a task. Prerequisite ids must refer to existing tasks.
    pub async fn create_task(&self, input: NewTask) -> Result<ObjectId> {
        if input.title.trim().is_empty() {
            return Err(WaypointError::InvalidInput("task title is required".into()));
        }
        let prerequisites = validate_prereq_ids(&input.prerequisites)?;
        for prereq in &prerequisites {
            let found = self.task_by_id(prereq).await?;
            if found.is_none() {
                return Err(WaypointError::InvalidInput(format!(
                    "prerequisite task {} does not exist",
                    prereq
                )));
            }
        }

        let task = TaskDoc {
            _id: None,
            metadata: crate::db::schemas::Metadata::new(),
            title: input.title.trim().to_string(),
            description: input.description,
            category: input.category,
            resources: input.resources,
            assigned_to: input
                .assigned_to
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "all".to_string()),
            deadline: input.deadline.map(DateTime::from_chrono),
            prerequisites,
        };

        let id = with_retry(self.retry, || self.tasks.insert_one(task.clone())).await?;
        info!(task = %id.to_hex(), title = %task.title, "task created");
        Ok(id)
    }

    pub async fn task_by_id(&self, task_id: &str) -> Result<Option<TaskDoc>> {
        let oid = parse_task_id(task_id)?;
        with_retry(self.retry, || self.tasks.find_one(doc! { "_id": oid })).await
    }

    /// Full task snapshot, creation order
    pub async fn list_tasks(&self) -> Result<Vec<TaskDoc>> {
        with_retry(self.retry, || {
            self.tasks.find_sorted(doc! {}, Some(doc! { "_id": 1 }), None)
        })
        .await
    }

    /// Build the dependency graph from the current snapshot
    pub async fn load_graph(&self) -> Result<TaskGraph> {
        let tasks = self.list_tasks().await?;
        Ok(TaskGraph::from_tasks(&tasks))
    }

    /// Replace a task's prerequisites, rejecting edits that would
    /// close a dependency cycle.
    pub async fn set_prerequisites(&self, task_id: &str, prereqs: &[String]) -> Result<()> {
        let oid = parse_task_id(task_id)?;
        let prereqs = validate_prereq_ids(prereqs)?;

        let graph = self.load_graph().await?;
        if graph.node(task_id).is_none() {
            return Err(WaypointError::NotFound(format!("task {}", task_id)));
        }
        for prereq in &prereqs {
            if graph.node(prereq).is_none() {
                return Err(WaypointError::InvalidInput(format!(
                    "prerequisite task {} does not exist",
                    prereq
                )));
            }
        }
        graph.check_acyclic(task_id, &prereqs)?;

        with_retry(self.retry, || {
            self.tasks.update_one(
                doc! { "_id": oid },
                doc! { "$set": {
                    "prerequisites": prereqs.clone(),
                    "metadata.updated_at": DateTime::now(),
                } },
            )
        })
        .await?;
        Ok(())
    }

    /// Tasks visible to a user, each annotated with progress status and
    /// whether its prerequisites are satisfied.
    pub async fn tasks_for_user(&self, email: &str) -> Result<Vec<TaskView>> {
        let all_tasks = self.list_tasks().await?;
        let graph = TaskGraph::from_tasks(&all_tasks);

        let progress = self.progress_for_user(email).await?;
        let status_by_task: std::collections::HashMap<&str, TaskStatus> = progress
            .iter()
            .map(|p| (p.task_id.as_str(), p.status))
            .collect();
        let completed = completed_set(&progress);

        let views = all_tasks
            .into_iter()
            .filter(|t| t.assigned_to == "all" || t.assigned_to == email)
            .map(|task| {
                let id = task.id_hex();
                let status = status_by_task
                    .get(id.as_str())
                    .copied()
                    .unwrap_or_default();
                let check = graph.can_start(&id, &completed);
                TaskView {
                    task,
                    status,
                    can_start: check.can_start,
                    blocked_by: check.blocked_by,
                }
            })
            .collect();
        Ok(views)
    }

    /// Direct dependents of a task
    pub async fn dependents(&self, task_id: &str) -> Result<Vec<TaskDoc>> {
        parse_task_id(task_id)?;
        with_retry(self.retry, || {
            self.tasks.find_sorted(
                doc! { "prerequisites": task_id },
                Some(doc! { "title": 1 }),
                None,
            )
        })
        .await
    }

    /// Tasks most other tasks are waiting on, from the viewpoint of one
    /// user's completions
    pub async fn bottlenecks(&self, user_email: &str) -> Result<Vec<Bottleneck>> {
        let graph = self.load_graph().await?;
        let progress = self.progress_for_user(user_email).await?;
        Ok(graph.bottlenecks(&completed_set(&progress)))
    }

    /// Soft-delete a task. Refused while other tasks depend on it.
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let oid = parse_task_id(task_id)?;
        let dependents = self.dependents(task_id).await?;
        if !dependents.is_empty() {
            let titles: Vec<&str> = dependents.iter().map(|t| t.title.as_str()).collect();
            return Err(WaypointError::InvalidInput(format!(
                "task is a prerequisite of: {}",
                titles.join(", ")
            )));
        }
        with_retry(self.retry, || self.tasks.soft_delete(doc! { "_id": oid })).await?;
        info!(task = %task_id, "task deleted");
        Ok(())
    }

    /// Categories, seeding the defaults on first use
    pub async fn list_categories(&self) -> Result<Vec<TaskCategoryDoc>> {
        let existing = with_retry(self.retry, || {
            self.categories
                .find_sorted(doc! {}, Some(doc! { "name": 1 }), None)
        })
        .await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        for (name, description, color) in DEFAULT_CATEGORIES {
            let category = TaskCategoryDoc::new(
                (*name).to_string(),
                (*description).to_string(),
                (*color).to_string(),
            );
            with_retry(self.retry, || self.categories.insert_one(category.clone())).await?;
        }
        info!(count = DEFAULT_CATEGORIES.len(), "seeded default categories");

        with_retry(self.retry, || {
            self.categories
                .find_sorted(doc! {}, Some(doc! { "name": 1 }), None)
        })
        .await
    }

    pub async fn create_category(
        &self,
        name: &str,
        description: &str,
        color: Option<String>,
    ) -> Result<ObjectId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WaypointError::InvalidInput(
                "category name is required".into(),
            ));
        }
        let existing =
            with_retry(self.retry, || self.categories.find_one(doc! { "name": name })).await?;
        if existing.is_some() {
            return Err(WaypointError::InvalidInput(format!(
                "category {:?} already exists",
                name
            )));
        }
        let category = TaskCategoryDoc::new(
            name.to_string(),
            description.to_string(),
            color.unwrap_or_else(|| "#1E88E5".to_string()),
        );
        with_retry(self.retry, || self.categories.insert_one(category.clone())).await
    }

    /// Delete a category. Refused while tasks still reference it.
    pub async fn delete_category(&self, name: &str) -> Result<()> {
        let in_use = with_retry(self.retry, || self.tasks.count(doc! { "category": name })).await?;
        if in_use > 0 {
            return Err(WaypointError::InvalidInput(format!(
                "category {:?} is used by {} task(s)",
                name, in_use
            )));
        }
        with_retry(self.retry, || {
            self.categories.soft_delete(doc! { "name": name })
        })
        .await?;
        Ok(())
    }
}

pub(crate) fn parse_task_id(task_id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(task_id)
        .map_err(|_| WaypointError::InvalidInput(format!("invalid task id: {:?}", task_id)))
}

pub(crate) fn validate_prereq_ids(prereqs: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(prereqs.len());
    for prereq in prereqs {
        let oid = parse_task_id(prereq)?;
        let hex = oid.to_hex();
        if !out.contains(&hex) {
            out.push(hex);
        }
    }
    Ok(out)
}

pub(crate) fn completed_set(progress: &[ProgressDoc]) -> std::collections::HashSet<String> {
    progress
        .iter()
        .filter(|p| p.status == TaskStatus::Done)
        .map(|p| p.task_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_prereq_ids_rejects_bad_hex() {
        assert!(validate_prereq_ids(&["not-hex".to_string()]).is_err());
    }

    #[test]
    fn validate_prereq_ids_dedupes() {
        let id = ObjectId::new().to_hex();
        let out = validate_prereq_ids(&[id.clone(), id.clone()]).unwrap();
        assert_eq!(out, vec![id]);
    }

    #[test]
    fn completed_set_only_counts_done() {
        let mut a = ProgressDoc::new("u@example.com".into(), "aaa".into());
        a.status = TaskStatus::Done;
        let mut b = ProgressDoc::new("u@example.com".into(), "bbb".into());
        b.status = TaskStatus::InProgress;
        let set = completed_set(&[a, b]);
        assert!(set.contains("aaa"));
        assert!(!set.contains("bbb"));
    }
}
