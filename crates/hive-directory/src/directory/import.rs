use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use super::domain::{NewUser, User};
use super::enrollment::{self, EnrollmentOutcome};
use super::repository::{DirectoryRepository, RepositoryError};
use super::service::{DirectoryError, DirectoryService};

/// One account row from a spreadsheet export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportRow {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedAccount {
    pub username: String,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub username: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: Vec<ImportedAccount>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid import CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<ImportRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<ImportRow>() {
        rows.push(record?);
    }
    Ok(rows)
}

pub fn parse_rows_from_path(path: impl AsRef<Path>) -> Result<Vec<ImportRow>, ImportError> {
    parse_rows(File::open(path)?)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

impl<R> DirectoryService<R>
where
    R: DirectoryRepository + 'static,
{
    /// Create active accounts for imported rows. Rows naming an organization are attached to
    /// it; the rest go through the e-mail domain rule. Existing usernames and unknown
    /// organizations are reported and skipped.
    pub fn import_users(&self, rows: Vec<ImportRow>) -> Result<ImportSummary, DirectoryError> {
        let mut summary = ImportSummary::default();

        for row in rows {
            if let Some(slug) = &row.organization {
                if self.repository().organization_by_slug(slug)?.is_none() {
                    warn!(
                        username = %row.username,
                        organization = %slug,
                        "skipping row for unknown organization"
                    );
                    summary.skipped.push(SkippedRow {
                        username: row.username,
                        reason: format!("unknown organization '{slug}'"),
                    });
                    continue;
                }
            }

            let mut new_user = NewUser::new(row.username.clone(), row.email);
            new_user.first_name = row.first_name;
            new_user.last_name = row.last_name;

            let user = match self.create_user(new_user) {
                Ok(user) => user,
                Err(DirectoryError::Repository(RepositoryError::Conflict)) => {
                    summary.skipped.push(SkippedRow {
                        username: row.username,
                        reason: "username already exists".to_string(),
                    });
                    continue;
                }
                Err(other) => return Err(other),
            };
            self.repository().insert_imported_user_info(user.id)?;

            let organization = match row.organization {
                Some(slug) => {
                    self.assign_organization(&user.username, &slug)?;
                    Some(slug)
                }
                None => self.enroll_imported(&user)?,
            };

            summary.created.push(ImportedAccount {
                username: user.username,
                organization,
            });
        }

        info!(
            created = summary.created.len(),
            skipped = summary.skipped.len(),
            "user import finished"
        );
        Ok(summary)
    }

    /// Imported accounts that still need their welcome e-mail.
    pub fn pending_import_notifications(&self) -> Result<Vec<User>, DirectoryError> {
        let mut users = Vec::new();
        for info in self.repository().imported_users_pending_email()? {
            if let Some(user) = self.repository().user(info.user_id)? {
                users.push(user);
            }
        }
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    pub fn mark_import_notified(&self, username: &str) -> Result<(), DirectoryError> {
        let user = self
            .repository()
            .user_by_username(username)?
            .ok_or_else(|| DirectoryError::NotFound(format!("user '{username}'")))?;
        let pending = self
            .repository()
            .imported_users_pending_email()?
            .into_iter()
            .find(|info| info.user_id == user.id);

        match pending {
            Some(mut info) => {
                info.was_sent_email = true;
                self.repository().update_imported_user_info(info)?;
                Ok(())
            }
            None => Err(DirectoryError::NotFound(format!(
                "pending import notification for '{username}'"
            ))),
        }
    }

    fn enroll_imported(&self, user: &User) -> Result<Option<String>, DirectoryError> {
        match enrollment::enroll_by_email_domain(self.repository().as_ref(), user)? {
            EnrollmentOutcome::Assigned(id) => {
                Ok(self.repository().organization(id)?.map(|org| org.slug))
            }
            _ => Ok(None),
        }
    }
}
