//! Progress writes and metrics reads
//!
//! Status changes are the only writes here. Every write bumps the
//! metrics cache generation so later metric reads recompute.

use bson::{doc, DateTime, Document};
use chrono::Utc;
use tracing::{debug, info};

use crate::db::mongo::with_retry;
use crate::db::schemas::{ProgressDoc, TaskStatus, UserRole};
use crate::metrics::{
    self, CollegeStanding, LeaderboardEntry, PerformanceMetrics, Period,
};
use crate::types::{Result, WaypointError};

use super::tasks::{completed_set, parse_task_id};
use super::Store;

impl Store {
    /// Change the status of a task for a user. Starting or completing a
    /// task requires its prerequisites to be done.
    pub async fn set_progress(
        &self,
        user_email: &str,
        task_id: &str,
        status: TaskStatus,
        submission_link: Option<String>,
        notes: Option<String>,
    ) -> Result<ProgressDoc> {
        parse_task_id(task_id)?;
        let task = self
            .task_by_id(task_id)
            .await?
            .ok_or_else(|| WaypointError::NotFound(format!("task {}", task_id)))?;
        if task.assigned_to != "all" && task.assigned_to != user_email {
            return Err(WaypointError::InvalidInput(format!(
                "task {:?} is not assigned to {}",
                task.title, user_email
            )));
        }

        let existing = with_retry(self.retry, || {
            self.progress
                .find_one(doc! { "user_email": user_email, "task_id": task_id })
        })
        .await?;

        // Gate forward transitions on prerequisites. Un-marking back to
        // not_started is always allowed.
        if status != TaskStatus::NotStarted {
            let already_done = existing
                .as_ref()
                .map(|p| p.status == TaskStatus::Done)
                .unwrap_or(false);
            if !already_done {
                let graph = self.load_graph().await?;
                let progress = self.progress_for_user(user_email).await?;
                let check = graph.can_start(task_id, &completed_set(&progress));
                if !check.can_start {
                    return Err(WaypointError::InvalidInput(format!(
                        "task {:?} is blocked by incomplete prerequisites: {}",
                        task.title,
                        check.blocked_by.join(", ")
                    )));
                }
            }
        }

        let mut record = existing
            .unwrap_or_else(|| ProgressDoc::new(user_email.to_string(), task_id.to_string()));
        record.apply_status(status, DateTime::now());
        if let Some(link) = submission_link {
            record.submission_link = Some(link);
        }
        if let Some(notes) = notes {
            record.notes = Some(notes);
        }

        let update = progress_update(&record)?;
        with_retry(self.retry, || {
            self.progress.upsert_one(
                doc! { "user_email": user_email, "task_id": task_id },
                update.clone(),
            )
        })
        .await?;

        self.cache.bump();
        info!(
            user = %user_email,
            task = %task_id,
            status = status.as_str(),
            "progress updated"
        );
        Ok(record)
    }

    pub async fn progress_for_user(&self, user_email: &str) -> Result<Vec<ProgressDoc>> {
        with_retry(self.retry, || {
            self.progress
                .find_many(doc! { "user_email": user_email })
        })
        .await
    }

    /// Performance metrics for one user over one window, cached per
    /// generation.
    pub async fn performance(
        &self,
        user_email: &str,
        period: Period,
    ) -> Result<PerformanceMetrics> {
        if let Some(cached) = self.cache.get(user_email, period) {
            debug!(user = %user_email, period = period.as_str(), "metrics cache hit");
            return Ok(cached);
        }

        let now = Utc::now();
        let tasks = self.list_tasks().await?;
        let progress = self.progress_for_user(user_email).await?;
        let (days_present, hours) = self
            .attendance_window(user_email, period.window_start(now))
            .await?;

        let computed = metrics::performance(
            user_email,
            period,
            now,
            &tasks,
            &progress,
            days_present,
            hours,
        );
        self.cache.put(user_email, period, computed.clone());
        Ok(computed)
    }

    /// Current completion streak in days
    pub async fn streak(&self, user_email: &str) -> Result<u32> {
        let progress = self.progress_for_user(user_email).await?;
        Ok(metrics::streak(&progress, Utc::now().date_naive()))
    }

    /// Intern standings sorted by completion rate, with the documented
    /// tie-break on completed count then name.
    pub async fn leaderboard(&self, period: Period) -> Result<Vec<LeaderboardEntry>> {
        let interns = self.list_users_by_role(UserRole::Intern).await?;
        let mut entries = Vec::with_capacity(interns.len());
        for intern in interns {
            let perf = self.performance(&intern.email, period).await?;
            entries.push(LeaderboardEntry {
                rank: 0,
                user_email: intern.email,
                name: intern.name,
                college: intern.college,
                completed_tasks: perf.completed_tasks,
                completion_rate: perf.completion_rate,
            });
        }
        metrics::rank_leaderboard(&mut entries);
        Ok(entries)
    }

    /// Leaderboard rolled up per college
    pub async fn college_leaderboard(&self, period: Period) -> Result<Vec<CollegeStanding>> {
        let entries = self.leaderboard(period).await?;
        Ok(metrics::college_rollup(&entries))
    }
}

/// Build the upsert modification for a progress record. Serialization
/// skips `None` optionals, so fields cleared by a transition (un-marking
/// drops `completed_at`) must be removed with an explicit `$unset` or
/// the stored value survives the `$set`. `_id` is immutable and is kept
/// out of the update entirely.
fn progress_update(record: &ProgressDoc) -> Result<Document> {
    let mut for_set = record.clone();
    for_set._id = None;
    let set = bson::to_document(&for_set)
        .map_err(|e| WaypointError::Database(format!("serialize progress: {}", e)))?;

    let mut unset = Document::new();
    if record.completed_at.is_none() {
        unset.insert("completed_at", "");
    }
    if record.submission_link.is_none() {
        unset.insert("submission_link", "");
    }
    if record.notes.is_none() {
        unset.insert("notes", "");
    }

    let mut update = doc! { "$set": set };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmarking_unsets_stale_completion() {
        let mut record = ProgressDoc::new("intern@example.com".into(), "abc".into());
        record.apply_status(TaskStatus::Done, DateTime::from_millis(1_000));
        record.apply_status(TaskStatus::InProgress, DateTime::from_millis(2_000));

        let update = progress_update(&record).unwrap();
        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("completed_at"));
        assert!(!set.contains_key("_id"));
        let unset = update.get_document("$unset").unwrap();
        assert!(unset.contains_key("completed_at"));
    }

    #[test]
    fn completed_record_is_set_without_unsetting_completion() {
        let mut record = ProgressDoc::new("intern@example.com".into(), "abc".into());
        record.apply_status(TaskStatus::Done, DateTime::from_millis(1_000));
        record.notes = Some("done early".into());
        record.submission_link = Some("https://git.example.com/pr/1".into());

        let update = progress_update(&record).unwrap();
        let set = update.get_document("$set").unwrap();
        assert!(set.contains_key("completed_at"));
        assert!(!update.contains_key("$unset"));
    }
}
