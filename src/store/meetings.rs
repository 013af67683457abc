//! Meeting links and history

use bson::{doc, DateTime};
use tracing::info;

use crate::db::mongo::with_retry;
use crate::db::schemas::MeetingDoc;
use crate::types::{Result, WaypointError};

use super::Store;

impl Store {
    /// Build the join link for a room name
    pub fn meeting_link(&self, room_name: &str) -> Result<String> {
        let slug = slugify(room_name);
        if slug.is_empty() {
            return Err(WaypointError::InvalidInput(
                "room name must contain letters or digits".into(),
            ));
        }
        let base = self.settings.meeting_base_url.trim_end_matches('/');
        Ok(format!("{}/{}", base, slug))
    }

    /// Log a created or joined meeting and return its record
    pub async fn log_meeting(&self, room_name: &str, created_by: &str) -> Result<MeetingDoc> {
        let link = self.meeting_link(room_name)?;
        let mut meeting = MeetingDoc::new(
            room_name.trim().to_string(),
            link,
            created_by.to_string(),
            DateTime::now(),
        );
        let id = with_retry(self.retry, || self.meetings.insert_one(meeting.clone())).await?;
        meeting._id = Some(id);
        info!(room = %meeting.room_name, link = %meeting.link, by = %created_by, "meeting logged");
        Ok(meeting)
    }

    /// Most recent meetings, newest first
    pub async fn recent_meetings(&self, limit: i64) -> Result<Vec<MeetingDoc>> {
        with_retry(self.retry, || {
            self.meetings.find_sorted(
                doc! {},
                Some(doc! { "created_at": -1 }),
                Some(limit),
            )
        })
        .await
    }
}

/// Lowercase, spaces to hyphens, everything else but letters, digits
/// and hyphens dropped. Runs of hyphens collapse.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.trim().chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c.is_ascii_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_hyphen = false;
        } else if c == '-' && !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Weekly Standup"), "weekly-standup");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Sprint   Review!!  "), "sprint-review");
        assert_eq!(slugify("demo--day"), "demo-day");
    }

    #[test]
    fn slugify_drops_punctuation() {
        assert_eq!(slugify("Q&A (March)"), "qa-march");
    }

    #[test]
    fn slugify_empty_for_symbol_only_names() {
        assert_eq!(slugify("!!!"), "");
    }
}
