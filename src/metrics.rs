//! Performance metrics aggregation
//!
//! Pure computations over snapshots of progress and attendance data.
//! The store feeds these functions and caches results in a
//! generation-stamped map so a write to progress or attendance
//! invalidates everything at once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::db::schemas::{ProgressDoc, TaskDoc, TaskStatus};

/// Reporting window for performance queries
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Period::Daily),
            "weekly" => Some(Period::Weekly),
            "monthly" => Some(Period::Monthly),
            _ => None,
        }
    }

    /// Start of the window containing `now`, in UTC. Daily is midnight
    /// today, weekly the most recent Monday at midnight, monthly the
    /// first of the month.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let start_day = match self {
            Period::Daily => today,
            Period::Weekly => {
                let back = today.weekday().num_days_from_monday() as i64;
                today - Duration::days(back)
            }
            Period::Monthly => match today.with_day(1) {
                Some(first) => first,
                None => today,
            },
        };
        Utc.from_utc_datetime(&start_day.and_hms_opt(0, 0, 0).unwrap_or_default())
    }

    /// Number of calendar days the window spans
    pub fn days_in_period(&self, now: DateTime<Utc>) -> u32 {
        match self {
            Period::Daily => 1,
            Period::Weekly => 7,
            Period::Monthly => {
                let today = now.date_naive();
                days_in_month(today.year(), today.month())
            }
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1);
    match (first, next) {
        (Some(a), Some(b)) => (b - a).num_days() as u32,
        _ => 30,
    }
}

/// Aggregated performance for one user over one window
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub user_email: String,
    pub period: Option<Period>,
    /// Tasks visible to the user (assigned directly or to everyone)
    pub total_tasks: usize,
    /// Tasks marked done, regardless of when
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub not_started_tasks: usize,
    /// Percentage of visible tasks done, 0 when there are no tasks
    pub completion_rate: f64,
    /// Completions whose completed_at falls inside the window
    pub tasks_completed_in_period: usize,
    /// In-period completions divided by the window length in days
    pub daily_average: f64,
    /// Attendance days and hours inside the window
    pub days_present: usize,
    pub total_hours: f64,
    /// Days present over window length, as a percentage
    pub attendance_rate: f64,
    pub avg_hours_per_day: f64,
    /// In-period completions per attendance hour, 0 when no hours
    pub productivity: f64,
    /// Mean hours from start to completion over completions in window
    pub avg_hours_per_task: f64,
}

/// Compute metrics for one user from snapshots. `progress` must already
/// be filtered to the user; `days_present` and `total_hours` come from
/// the attendance aggregation over the same window.
pub fn performance(
    user_email: &str,
    period: Period,
    now: DateTime<Utc>,
    tasks: &[TaskDoc],
    progress: &[ProgressDoc],
    days_present: usize,
    total_hours: f64,
) -> PerformanceMetrics {
    let window_start = period.window_start(now);
    let window_millis = window_start.timestamp_millis();
    let days_in_period = period.days_in_period(now);

    let visible: Vec<&TaskDoc> = tasks
        .iter()
        .filter(|t| t.assigned_to == "all" || t.assigned_to == user_email)
        .collect();
    let total_tasks = visible.len();
    let visible_ids: HashSet<String> = visible.iter().map(|t| t.id_hex()).collect();

    let mut completed_tasks = 0usize;
    let mut in_progress_tasks = 0usize;
    let mut tasks_completed_in_period = 0usize;
    let mut completion_hours = Vec::new();
    for record in progress {
        // Progress on a task the user cannot see (reassigned or removed)
        // must not push the completion rate past 100
        if !visible_ids.contains(record.task_id.as_str()) {
            continue;
        }
        match record.status {
            TaskStatus::Done => {
                completed_tasks += 1;
                let in_window = record
                    .completed_at
                    .map(|c| c.timestamp_millis() >= window_millis)
                    .unwrap_or(false);
                if in_window {
                    tasks_completed_in_period += 1;
                    if let Some(h) = record.time_spent_hours() {
                        completion_hours.push(h);
                    }
                }
            }
            TaskStatus::InProgress => in_progress_tasks += 1,
            TaskStatus::NotStarted => {}
        }
    }
    let not_started_tasks = total_tasks.saturating_sub(completed_tasks + in_progress_tasks);

    let completion_rate = if total_tasks == 0 {
        0.0
    } else {
        completed_tasks as f64 / total_tasks as f64 * 100.0
    };
    let daily_average = tasks_completed_in_period as f64 / days_in_period as f64;
    let attendance_rate = if days_in_period == 0 {
        0.0
    } else {
        days_present as f64 / days_in_period as f64 * 100.0
    };
    let avg_hours_per_day = if days_present == 0 {
        0.0
    } else {
        total_hours / days_present as f64
    };
    let productivity = if total_hours > 0.0 {
        tasks_completed_in_period as f64 / total_hours
    } else {
        0.0
    };
    let avg_hours_per_task = if completion_hours.is_empty() {
        0.0
    } else {
        completion_hours.iter().sum::<f64>() / completion_hours.len() as f64
    };

    PerformanceMetrics {
        user_email: user_email.to_string(),
        period: Some(period),
        total_tasks,
        completed_tasks,
        in_progress_tasks,
        not_started_tasks,
        completion_rate,
        tasks_completed_in_period,
        daily_average,
        days_present,
        total_hours,
        attendance_rate,
        avg_hours_per_day,
        productivity,
        avg_hours_per_task,
    }
}

/// Consecutive calendar days with at least one completion, counting
/// back from today. A streak survives until a full day passes with no
/// completion, so a quiet today falls back to counting from yesterday.
pub fn streak(progress: &[ProgressDoc], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = progress
        .iter()
        .filter(|p| p.status == TaskStatus::Done)
        .filter_map(|p| p.completed_at)
        .map(|c| c.to_chrono().date_naive())
        .collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut count = 0;
    while days.contains(&day) {
        count += 1;
        day = day - Duration::days(1);
    }
    count
}

/// One row of the leaderboard
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based position, assigned after sorting
    #[serde(default)]
    pub rank: usize,
    pub user_email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    pub completed_tasks: usize,
    pub completion_rate: f64,
}

/// Sort standings in place and assign ranks: rate descending, then
/// completed count descending, then name ascending.
pub fn rank_leaderboard(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        b.completion_rate
            .partial_cmp(&a.completion_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.completed_tasks.cmp(&a.completed_tasks))
            .then_with(|| a.name.cmp(&b.name))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
}

/// Aggregated standing for one college
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CollegeStanding {
    pub college: String,
    pub member_count: usize,
    pub avg_completion_rate: f64,
    pub total_completed: usize,
}

/// Roll individual standings up per college. Users with no college are
/// skipped. Sorted by average rate descending, name ascending.
pub fn college_rollup(entries: &[LeaderboardEntry]) -> Vec<CollegeStanding> {
    let mut by_college: std::collections::HashMap<String, (usize, f64, usize)> =
        std::collections::HashMap::new();
    for entry in entries {
        let Some(college) = &entry.college else { continue };
        let slot = by_college.entry(college.clone()).or_insert((0, 0.0, 0));
        slot.0 += 1;
        slot.1 += entry.completion_rate;
        slot.2 += entry.completed_tasks;
    }
    let mut standings: Vec<CollegeStanding> = by_college
        .into_iter()
        .map(|(college, (count, rate_sum, completed))| CollegeStanding {
            college,
            member_count: count,
            avg_completion_rate: rate_sum / count as f64,
            total_completed: completed,
        })
        .collect();
    standings.sort_by(|a, b| {
        b.avg_completion_rate
            .partial_cmp(&a.avg_completion_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.college.cmp(&b.college))
    });
    standings
}

/// Cache of computed metrics, invalidated wholesale whenever progress
/// or attendance changes. The generation counter lives in the store
/// and is bumped on every relevant write.
#[derive(Debug, Default)]
pub struct MetricsCache {
    entries: DashMap<(String, Period), (u64, PerformanceMetrics)>,
    generation: AtomicU64,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every cached entry
    pub fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn get(&self, user_email: &str, period: Period) -> Option<PerformanceMetrics> {
        let current = self.generation();
        let key = (user_email.to_string(), period);
        match self.entries.get(&key) {
            Some(entry) if entry.0 == current => Some(entry.1.clone()),
            _ => None,
        }
    }

    pub fn put(&self, user_email: &str, period: Period, metrics: PerformanceMetrics) {
        self.entries.insert(
            (user_email.to_string(), period),
            (self.generation(), metrics),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use bson::DateTime as BsonDateTime;

    fn at(ts: &str) -> DateTime<Utc> {
        ts.parse().unwrap()
    }

    fn shared_task() -> TaskDoc {
        TaskDoc {
            _id: Some(ObjectId::new()),
            assigned_to: "all".to_string(),
            ..Default::default()
        }
    }

    fn done_for(task: &TaskDoc, ts: &str) -> ProgressDoc {
        let mut p = ProgressDoc::new("intern@example.com".into(), task.id_hex());
        let when = BsonDateTime::from_chrono(at(ts));
        p.apply_status(TaskStatus::InProgress, when);
        p.apply_status(TaskStatus::Done, when);
        p
    }

    fn done_at(ts: &str) -> ProgressDoc {
        let mut p = ProgressDoc::new("intern@example.com".into(), "t".into());
        let when = BsonDateTime::from_chrono(at(ts));
        p.apply_status(TaskStatus::InProgress, when);
        p.apply_status(TaskStatus::Done, when);
        p
    }

    #[test]
    fn daily_window_is_midnight_today() {
        let now = at("2025-03-12T15:45:00Z");
        assert_eq!(Period::Daily.window_start(now), at("2025-03-12T00:00:00Z"));
        assert_eq!(Period::Daily.days_in_period(now), 1);
    }

    #[test]
    fn weekly_window_starts_monday() {
        // 2025-03-12 is a Wednesday
        let now = at("2025-03-12T15:45:00Z");
        assert_eq!(Period::Weekly.window_start(now), at("2025-03-10T00:00:00Z"));
        // A Monday maps to itself
        let monday = at("2025-03-10T03:00:00Z");
        assert_eq!(
            Period::Weekly.window_start(monday),
            at("2025-03-10T00:00:00Z")
        );
    }

    #[test]
    fn monthly_window_and_length() {
        let now = at("2025-02-20T10:00:00Z");
        assert_eq!(
            Period::Monthly.window_start(now),
            at("2025-02-01T00:00:00Z")
        );
        assert_eq!(Period::Monthly.days_in_period(now), 28);
        let leap = at("2024-02-05T00:00:00Z");
        assert_eq!(Period::Monthly.days_in_period(leap), 29);
    }

    #[test]
    fn completion_rate_zero_without_tasks() {
        let m = performance(
            "intern@example.com",
            Period::Weekly,
            at("2025-03-12T12:00:00Z"),
            &[],
            &[],
            3,
            10.0,
        );
        assert_eq!(m.total_tasks, 0);
        assert_eq!(m.completion_rate, 0.0);
    }

    #[test]
    fn completions_outside_window_count_toward_rate_only() {
        let now = at("2025-03-12T12:00:00Z");
        let tasks = vec![shared_task(), shared_task()];
        let progress = vec![
            done_for(&tasks[0], "2025-03-11T09:00:00Z"),
            done_for(&tasks[1], "2025-03-02T09:00:00Z"),
        ];
        let m = performance(
            "intern@example.com",
            Period::Weekly,
            now,
            &tasks,
            &progress,
            2,
            8.0,
        );
        assert_eq!(m.completed_tasks, 2);
        assert_eq!(m.completion_rate, 100.0);
        assert_eq!(m.tasks_completed_in_period, 1);
        assert!((m.daily_average - 1.0 / 7.0).abs() < 1e-9);
        assert!((m.productivity - 0.125).abs() < 1e-9);
        assert_eq!(m.avg_hours_per_day, 4.0);
    }

    #[test]
    fn productivity_zero_without_hours() {
        let now = at("2025-03-12T12:00:00Z");
        let tasks = vec![shared_task()];
        let progress = vec![done_for(&tasks[0], "2025-03-12T09:00:00Z")];
        let m = performance(
            "intern@example.com",
            Period::Daily,
            now,
            &tasks,
            &progress,
            0,
            0.0,
        );
        assert_eq!(m.productivity, 0.0);
        assert_eq!(m.attendance_rate, 0.0);
        assert_eq!(m.avg_hours_per_day, 0.0);
    }

    #[test]
    fn progress_on_unassigned_tasks_does_not_inflate_rate() {
        let now = at("2025-03-12T12:00:00Z");
        let mine = shared_task();
        let theirs = TaskDoc {
            _id: Some(ObjectId::new()),
            assigned_to: "other@example.com".to_string(),
            ..Default::default()
        };
        let tasks = vec![mine.clone(), theirs.clone()];
        let progress = vec![
            done_for(&mine, "2025-03-12T09:00:00Z"),
            done_for(&theirs, "2025-03-12T10:00:00Z"),
        ];
        let m = performance(
            "intern@example.com",
            Period::Daily,
            now,
            &tasks,
            &progress,
            1,
            6.0,
        );
        assert_eq!(m.total_tasks, 1);
        assert_eq!(m.completed_tasks, 1);
        assert_eq!(m.completion_rate, 100.0);
        assert_eq!(m.tasks_completed_in_period, 1);
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let progress = vec![
            done_at("2025-03-12T09:00:00Z"),
            done_at("2025-03-11T17:00:00Z"),
            done_at("2025-03-10T10:00:00Z"),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(streak(&progress, today), 3);
    }

    #[test]
    fn streak_breaks_on_gap() {
        let progress = vec![
            done_at("2025-03-12T09:00:00Z"),
            done_at("2025-03-10T10:00:00Z"),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(streak(&progress, today), 1);
    }

    #[test]
    fn streak_survives_quiet_today() {
        let progress = vec![
            done_at("2025-03-11T09:00:00Z"),
            done_at("2025-03-10T10:00:00Z"),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(streak(&progress, today), 2);
    }

    #[test]
    fn streak_ignores_completion_stamp_on_unmarked_record() {
        // A storage-layer leftover: completed_at set while the record is
        // no longer done must not count as a completion day.
        let mut stale = done_at("2025-03-12T09:00:00Z");
        stale.status = TaskStatus::InProgress;
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(streak(&[stale], today), 0);
    }

    #[test]
    fn streak_zero_without_recent_completions() {
        let progress = vec![done_at("2025-03-01T09:00:00Z")];
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(streak(&progress, today), 0);
    }

    fn entry(name: &str, rate: f64, completed: usize, college: Option<&str>) -> LeaderboardEntry {
        LeaderboardEntry {
            rank: 0,
            user_email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            college: college.map(|c| c.to_string()),
            completed_tasks: completed,
            completion_rate: rate,
        }
    }

    #[test]
    fn leaderboard_tie_break_order() {
        let mut entries = vec![
            entry("Charlie", 80.0, 4, None),
            entry("Alice", 80.0, 8, None),
            entry("Bob", 80.0, 8, None),
            entry("Dana", 90.0, 2, None),
        ];
        rank_leaderboard(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Dana", "Alice", "Bob", "Charlie"]);
        let ranks: Vec<usize> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn college_rollup_averages_rates() {
        let entries = vec![
            entry("Alice", 100.0, 5, Some("North")),
            entry("Bob", 50.0, 2, Some("North")),
            entry("Charlie", 60.0, 3, Some("South")),
            entry("Dana", 40.0, 1, None),
        ];
        let standings = college_rollup(&entries);
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].college, "North");
        assert_eq!(standings[0].avg_completion_rate, 75.0);
        assert_eq!(standings[0].total_completed, 7);
        assert_eq!(standings[1].college, "South");
    }

    #[test]
    fn cache_entries_expire_on_bump() {
        let cache = MetricsCache::new();
        let m = PerformanceMetrics {
            user_email: "intern@example.com".into(),
            ..Default::default()
        };
        cache.put("intern@example.com", Period::Daily, m.clone());
        assert_eq!(cache.get("intern@example.com", Period::Daily), Some(m));
        cache.bump();
        assert_eq!(cache.get("intern@example.com", Period::Daily), None);
    }
}
