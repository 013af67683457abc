//! User operations and roster import

use bson::doc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::mongo::with_retry;
use crate::db::schemas::{UserDoc, UserRole};
use crate::types::{Result, WaypointError};

use super::Store;

/// Outcome of a CSV roster import
#[derive(Serialize, Clone, Debug, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// One roster row as it appears in the CSV
#[derive(Deserialize, Debug)]
struct RosterRow {
    name: String,
    email: String,
    #[serde(default)]
    college: Option<String>,
    /// Semicolon-separated list
    #[serde(default)]
    skills: Option<String>,
}

impl Store {
    /// Create a user if the email is new, otherwise return the existing
    /// record untouched.
    pub async fn ensure_user(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        college: Option<String>,
        skills: Vec<String>,
    ) -> Result<UserDoc> {
        let email = normalize_email(email)?;

        if let Some(existing) = with_retry(self.retry, || {
            self.users.find_one(doc! { "email": &email })
        })
        .await?
        {
            return Ok(existing);
        }

        let mut user = UserDoc::new(email.clone(), name.to_string(), role, skills, college);
        let id = with_retry(self.retry, || self.users.insert_one(user.clone())).await?;
        user._id = Some(id);
        info!(email = %email, role = role.as_str(), "user created");
        Ok(user)
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let email = normalize_email(email)?;
        with_retry(self.retry, || self.users.find_one(doc! { "email": &email })).await
    }

    /// All users, name order
    pub async fn list_users(&self) -> Result<Vec<UserDoc>> {
        with_retry(self.retry, || {
            self.users.find_sorted(doc! {}, Some(doc! { "name": 1 }), None)
        })
        .await
    }

    pub async fn list_users_by_role(&self, role: UserRole) -> Result<Vec<UserDoc>> {
        with_retry(self.retry, || {
            self.users.find_sorted(
                doc! { "role": role.as_str() },
                Some(doc! { "name": 1 }),
                None,
            )
        })
        .await
    }

    /// Display name for an email, falling back to the local part
    pub async fn display_name(&self, email: &str) -> String {
        match self.user_by_email(email).await {
            Ok(Some(user)) => user.name,
            _ => email.split('@').next().unwrap_or(email).to_string(),
        }
    }

    /// Import interns from a CSV roster. Each row is validated on its
    /// own; bad rows are reported but do not abort the rest.
    pub async fn import_roster_csv(&self, data: &[u8]) -> Result<ImportReport> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);

        let mut report = ImportReport::default();
        for (index, row) in reader.deserialize::<RosterRow>().enumerate() {
            let line = index + 2; // header is line 1
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    report.errors.push(format!("line {}: {}", line, e));
                    continue;
                }
            };
            if row.name.is_empty() {
                report.errors.push(format!("line {}: missing name", line));
                continue;
            }
            let skills: Vec<String> = row
                .skills
                .as_deref()
                .unwrap_or("")
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            let email = match normalize_email(&row.email) {
                Ok(email) => email,
                Err(e) => {
                    report.errors.push(format!("line {}: {}", line, e));
                    continue;
                }
            };

            let existing =
                with_retry(self.retry, || self.users.find_one(doc! { "email": &email })).await?;
            if existing.is_some() {
                report.skipped += 1;
                continue;
            }

            let user = UserDoc::new(
                email,
                row.name.clone(),
                UserRole::Intern,
                skills,
                row.college.clone().filter(|c| !c.is_empty()),
            );
            match with_retry(self.retry, || self.users.insert_one(user.clone())).await {
                Ok(_) => report.imported += 1,
                Err(e) => {
                    warn!(line, error = %e, "roster row failed to insert");
                    report.errors.push(format!("line {}: {}", line, e));
                }
            }
        }

        info!(
            imported = report.imported,
            skipped = report.skipped,
            failed = report.errors.len(),
            "roster import finished"
        );
        Ok(report)
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(WaypointError::InvalidInput(format!(
            "invalid email address: {:?}",
            email
        )));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
    }

    #[test]
    fn normalize_email_rejects_garbage() {
        assert!(normalize_email("").is_err());
        assert!(normalize_email("not-an-email").is_err());
    }

    #[test]
    fn roster_rows_parse_optional_columns() {
        let data = "name,email,college,skills\nAlice,alice@example.com,North,rust;python\nBob,bob@example.com,,\n";
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        let rows: Vec<RosterRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].skills.as_deref(), Some("rust;python"));
        // Trimmed-empty fields deserialize to None for Option<String>
        assert_eq!(rows[1].college, None);
    }
}
