use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::domain::{
    ChannelCategory, NewContentChannel, NewOrganization, NewUser, PhoneNumber, TwitterName,
};
use super::repository::{ChannelChange, DirectoryRepository, OrganizationChangeSet};
use super::service::{DirectoryError, DirectoryService};

/// Seed data for a fresh directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryFixture {
    #[serde(default)]
    pub organizations: Vec<OrganizationFixture>,
    #[serde(default)]
    pub users: Vec<UserFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationFixture {
    #[serde(flatten)]
    pub organization: NewOrganization,
    #[serde(default)]
    pub content_channels: Vec<ChannelFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelFixture {
    pub category: ChannelCategory,
    #[serde(default)]
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    #[serde(flatten)]
    pub user: NewUser,
    /// Slug of the organization to attach the membership to.
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub twitter_name: Option<TwitterName>,
    #[serde(default)]
    pub phone_number: Option<PhoneNumber>,
    #[serde(default = "listed_by_default")]
    pub is_listed: bool,
}

fn listed_by_default() -> bool {
    true
}

/// Counts of what a fixture load created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub organizations: usize,
    pub channels: usize,
    pub users: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("fixture references unknown organization '{0}'")]
    UnknownOrganization(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl DirectoryFixture {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FixtureError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R> DirectoryService<R>
where
    R: DirectoryRepository + 'static,
{
    /// Load a fixture through the regular service paths so membership invariants hold.
    pub fn seed(&self, fixture: DirectoryFixture) -> Result<SeedSummary, FixtureError> {
        let mut summary = SeedSummary::default();

        for entry in fixture.organizations {
            let organization = self.register_organization(entry.organization)?;
            summary.organizations += 1;

            if entry.content_channels.is_empty() {
                continue;
            }
            let channels: Vec<ChannelChange> = entry
                .content_channels
                .into_iter()
                .map(|channel| {
                    ChannelChange::Create(NewContentChannel {
                        organization_id: organization.id,
                        category: channel.category,
                        name: channel.name,
                        url: channel.url,
                    })
                })
                .collect();
            summary.channels += channels.len();
            self.repository()
                .apply_organization_changes(OrganizationChangeSet {
                    organization,
                    channels,
                })
                .map_err(DirectoryError::from)?;
        }

        for entry in fixture.users {
            if let Some(slug) = &entry.organization {
                if self
                    .repository()
                    .organization_by_slug(slug)
                    .map_err(DirectoryError::from)?
                    .is_none()
                {
                    return Err(FixtureError::UnknownOrganization(slug.clone()));
                }
            }

            let user = self.create_user(entry.user)?;
            if let Some(slug) = &entry.organization {
                self.assign_organization(&user.username, slug)?;
            }

            let mut membership = self
                .repository()
                .membership_for_user(user.id)
                .map_err(DirectoryError::from)?
                .ok_or_else(|| {
                    DirectoryError::NotFound(format!("membership for '{}'", user.username))
                })?;
            membership.title = entry.title;
            membership.twitter_name = entry.twitter_name;
            membership.phone_number = entry.phone_number;
            membership.is_listed = entry.is_listed;
            self.repository()
                .update_membership(membership)
                .map_err(DirectoryError::from)?;
            summary.users += 1;
        }

        info!(
            organizations = summary.organizations,
            channels = summary.channels,
            users = summary.users,
            "directory seeded"
        );
        Ok(summary)
    }
}
