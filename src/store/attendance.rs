//! Attendance recording and daily summaries
//!
//! Check-ins are gated by the network allow-list. Summaries collapse
//! the event stream into one row per day: earliest check-in, latest
//! check-out, hours between them.

use bson::{doc, DateTime as BsonDateTime};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::mongo::with_retry;
use crate::db::schemas::{AttendanceDoc, AttendanceEvent, NetworkInfo};
use crate::policy::{ObservedNetwork, PolicyDecision};
use crate::types::{Result, WaypointError};

use super::Store;

/// On-time threshold, 09:30 UTC
const ON_TIME: (u32, u32) = (9, 30);

/// One day of attendance, derived from the event stream
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DaySummary {
    pub day: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<DateTime<Utc>>,
    /// Hours between check-in and check-out, when both exist
    pub duration_hours: f64,
}

/// Attendance statistics over the history window
#[derive(Serialize, Clone, Debug, Default)]
pub struct AttendanceStats {
    pub days_present: usize,
    /// Working days with no recorded event
    pub days_absent: usize,
    /// Weekdays in the window, the denominator for the rates
    pub working_days: usize,
    /// Percentage of working days attended
    pub attendance_rate: f64,
    /// Days with a check-in at or before 09:30
    pub on_time_count: usize,
    /// On-time days over days present, as a percentage
    pub punctuality_rate: f64,
    pub total_hours: f64,
    /// Mean hours per attended day
    pub avg_hours: f64,
}

impl Store {
    /// Record a check-in or check-out. Check-ins must come from an
    /// allowed network; check-outs are accepted from anywhere.
    pub async fn record_attendance(
        &self,
        user_email: &str,
        event: AttendanceEvent,
        network: NetworkInfo,
    ) -> Result<AttendanceDoc> {
        if event == AttendanceEvent::CheckIn {
            let allow_list = self.network_allow_list().await?;
            let observed = ObservedNetwork {
                ip: network.ip.as_deref().and_then(|ip| ip.trim().parse().ok()),
                ssid: network.ssid.clone(),
            };
            match allow_list.check(&observed) {
                PolicyDecision::Allowed(rule) => {
                    info!(user = %user_email, ?rule, "check-in network accepted");
                }
                PolicyDecision::Denied => {
                    warn!(user = %user_email, ip = ?network.ip, ssid = ?network.ssid, "check-in network rejected");
                    return Err(WaypointError::InvalidInput(
                        "attendance check-in is only allowed from approved networks".into(),
                    ));
                }
            }
        }

        let record = AttendanceDoc::new(
            user_email.to_string(),
            event,
            BsonDateTime::now(),
            network,
        );
        let id = with_retry(self.retry, || self.attendance.insert_one(record.clone())).await?;
        let mut record = record;
        record._id = Some(id);

        self.cache.bump();
        info!(user = %user_email, event = event.as_str(), "attendance recorded");
        Ok(record)
    }

    /// Today's summary for a user, if any event was recorded
    pub async fn attendance_today(&self, user_email: &str) -> Result<Option<DaySummary>> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = with_retry(self.retry, || {
            self.attendance.find_sorted(
                doc! { "user_email": user_email, "day": &today },
                Some(doc! { "timestamp": 1 }),
                None,
            )
        })
        .await?;
        Ok(summarize(&events).pop())
    }

    /// Daily summaries over the configured history window, newest first
    pub async fn attendance_history(&self, user_email: &str) -> Result<Vec<DaySummary>> {
        let since = Utc::now() - Duration::days(i64::from(self.settings.attendance_history_days));
        let events = self.attendance_events_since(user_email, since).await?;
        let mut days = summarize(&events);
        days.reverse();
        Ok(days)
    }

    /// Days present and total attended hours since a point in time
    pub async fn attendance_window(
        &self,
        user_email: &str,
        since: DateTime<Utc>,
    ) -> Result<(usize, f64)> {
        let events = self.attendance_events_since(user_email, since).await?;
        let days = summarize(&events);
        let hours = days.iter().map(|d| d.duration_hours).sum();
        Ok((days.len(), hours))
    }

    /// Attendance statistics over the history window
    pub async fn attendance_stats(&self, user_email: &str) -> Result<AttendanceStats> {
        let now = Utc::now();
        let window = i64::from(self.settings.attendance_history_days);
        let since = now - Duration::days(window);

        let events = self.attendance_events_since(user_email, since).await?;
        let days = summarize(&events);

        let working_days = (0..=window)
            .map(|back| (now - Duration::days(back)).date_naive())
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count();

        let on_time_cutoff = NaiveTime::from_hms_opt(ON_TIME.0, ON_TIME.1, 0)
            .unwrap_or(NaiveTime::MIN);
        let on_time_count = days
            .iter()
            .filter_map(|d| d.check_in)
            .filter(|t| t.time() <= on_time_cutoff)
            .count();

        let attended: Vec<f64> = days
            .iter()
            .filter(|d| d.duration_hours > 0.0)
            .map(|d| d.duration_hours)
            .collect();
        let total_hours: f64 = attended.iter().sum();
        let avg_hours = if attended.is_empty() {
            0.0
        } else {
            total_hours / attended.len() as f64
        };

        let attendance_rate = if working_days == 0 {
            0.0
        } else {
            days.len() as f64 / working_days as f64 * 100.0
        };
        let punctuality_rate = if days.is_empty() {
            0.0
        } else {
            on_time_count as f64 / days.len() as f64 * 100.0
        };

        Ok(AttendanceStats {
            days_present: days.len(),
            days_absent: working_days.saturating_sub(days.len()),
            working_days,
            attendance_rate,
            on_time_count,
            punctuality_rate,
            total_hours,
            avg_hours,
        })
    }

    async fn attendance_events_since(
        &self,
        user_email: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<AttendanceDoc>> {
        let since = BsonDateTime::from_chrono(since);
        with_retry(self.retry, || {
            self.attendance.find_sorted(
                doc! { "user_email": user_email, "timestamp": { "$gte": since } },
                Some(doc! { "timestamp": 1 }),
                None,
            )
        })
        .await
    }
}

/// Collapse an ascending event stream into per-day summaries, oldest
/// first. Earliest check-in and latest check-out win within a day.
fn summarize(events: &[AttendanceDoc]) -> Vec<DaySummary> {
    let mut days: Vec<DaySummary> = Vec::new();
    for event in events {
        let when = event.timestamp.to_chrono();
        if days.last().map(|d| d.day != event.day).unwrap_or(true) {
            days.push(DaySummary {
                day: event.day.clone(),
                check_in: None,
                check_out: None,
                duration_hours: 0.0,
            });
        }
        let current = match days.last_mut() {
            Some(d) => d,
            None => continue,
        };
        match event.event {
            AttendanceEvent::CheckIn => {
                if current.check_in.map(|t| when < t).unwrap_or(true) {
                    current.check_in = Some(when);
                }
            }
            AttendanceEvent::CheckOut => {
                if current.check_out.map(|t| when > t).unwrap_or(true) {
                    current.check_out = Some(when);
                }
            }
        }
    }
    for day in &mut days {
        if let (Some(check_in), Some(check_out)) = (day.check_in, day.check_out) {
            let seconds = (check_out - check_in).num_seconds();
            if seconds > 0 {
                day.duration_hours = seconds as f64 / 3600.0;
            }
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(day_ts: &str, kind: AttendanceEvent) -> AttendanceDoc {
        let when: DateTime<Utc> = day_ts.parse().unwrap();
        AttendanceDoc::new(
            "intern@example.com".into(),
            kind,
            BsonDateTime::from_chrono(when),
            NetworkInfo::default(),
        )
    }

    #[test]
    fn earliest_in_latest_out_win() {
        let events = vec![
            event("2025-03-10T09:00:00Z", AttendanceEvent::CheckIn),
            event("2025-03-10T10:15:00Z", AttendanceEvent::CheckIn),
            event("2025-03-10T13:00:00Z", AttendanceEvent::CheckOut),
            event("2025-03-10T17:30:00Z", AttendanceEvent::CheckOut),
        ];
        let days = summarize(&events);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].check_in, Some("2025-03-10T09:00:00Z".parse().unwrap()));
        assert_eq!(days[0].check_out, Some("2025-03-10T17:30:00Z".parse().unwrap()));
        assert!((days[0].duration_hours - 8.5).abs() < 1e-9);
    }

    #[test]
    fn days_are_grouped_separately() {
        let events = vec![
            event("2025-03-10T09:00:00Z", AttendanceEvent::CheckIn),
            event("2025-03-10T17:00:00Z", AttendanceEvent::CheckOut),
            event("2025-03-11T09:30:00Z", AttendanceEvent::CheckIn),
        ];
        let days = summarize(&events);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "2025-03-10");
        assert!((days[0].duration_hours - 8.0).abs() < 1e-9);
        assert_eq!(days[1].day, "2025-03-11");
        assert_eq!(days[1].duration_hours, 0.0);
    }

    #[test]
    fn checkout_before_checkin_yields_zero_hours() {
        let events = vec![
            event("2025-03-10T08:00:00Z", AttendanceEvent::CheckOut),
            event("2025-03-10T09:00:00Z", AttendanceEvent::CheckIn),
        ];
        let days = summarize(&events);
        assert_eq!(days[0].duration_hours, 0.0);
    }

    #[test]
    fn missing_checkout_counts_as_present_with_zero_hours() {
        let events = vec![event("2025-03-10T09:00:00Z", AttendanceEvent::CheckIn)];
        let days = summarize(&events);
        assert_eq!(days.len(), 1);
        assert!(days[0].check_out.is_none());
        assert_eq!(days[0].duration_hours, 0.0);
    }
}
