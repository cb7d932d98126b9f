use serde::{Deserialize, Serialize};

use super::domain::{
    ChannelCategory, ContentChannel, Expertise, ExpertiseCategory, MemberRecord, Organization,
};
use super::validation::{
    ChannelForm, ExpertiseForm, MembershipForm, OrganizationForm, UserProfileForm,
};

/// One page of the public organization listing.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryPage {
    pub page: usize,
    pub num_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub show_privileged_info: bool,
    pub organizations: Vec<OrganizationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationDetail {
    pub show_privileged_info: bool,
    pub organization: OrganizationView,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationView {
    pub name: String,
    pub slug: String,
    pub url: String,
    pub website: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_name: Option<String>,
    /// Month and year only, e.g. "March 2013".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hive_member_since: Option<String>,
    pub mission: String,
    pub min_youth_audience_age: i16,
    pub max_youth_audience_age: i16,
    pub content_channels: Vec<ChannelView>,
    pub members: Vec<MemberEntry>,
}

impl OrganizationView {
    pub(crate) fn new(
        organization: &Organization,
        channels: &[ContentChannel],
        members: Vec<MemberEntry>,
    ) -> Self {
        Self {
            name: organization.name.clone(),
            slug: organization.slug.clone(),
            url: organization.absolute_url(),
            website: organization.website.clone(),
            address: organization.address.clone(),
            twitter_name: organization
                .twitter_name
                .as_ref()
                .map(|name| name.as_str().to_string()),
            hive_member_since: organization
                .hive_member_since
                .map(|date| date.format("%B %Y").to_string()),
            mission: organization.mission.clone(),
            min_youth_audience_age: organization.min_youth_audience_age,
            max_youth_audience_age: organization.max_youth_audience_age,
            content_channels: channels.iter().map(ChannelView::from).collect(),
            members,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelView {
    pub category: ChannelCategory,
    pub display_name: String,
    pub fa_icon: &'static str,
    pub url: String,
}

impl From<&ContentChannel> for ChannelView {
    fn from(channel: &ContentChannel) -> Self {
        Self {
            category: channel.category,
            display_name: channel.display_name().to_string(),
            fa_icon: channel.fa_icon(),
            url: channel.url.clone(),
        }
    }
}

/// Directory line for a member. Contact fields are only filled for privileged viewers.
#[derive(Debug, Clone, Serialize)]
pub struct MemberEntry {
    pub username: String,
    pub full_name: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl MemberEntry {
    pub(crate) fn new(record: &MemberRecord, show_privileged_info: bool) -> Self {
        let contact = |value: Option<String>| value.filter(|_| show_privileged_info);
        let email = Some(record.user.email.clone()).filter(|email| !email.is_empty());

        Self {
            username: record.user.username.clone(),
            full_name: record.user.full_name(),
            title: record.membership.title.clone(),
            url: record.user.absolute_url(),
            twitter_name: record
                .membership
                .twitter_name
                .as_ref()
                .map(|name| name.as_str().to_string()),
            email: contact(email),
            phone_number: contact(
                record
                    .membership
                    .phone_number
                    .as_ref()
                    .map(|phone| phone.as_str().to_string()),
            ),
        }
    }
}

/// Autocomplete entry returned by `/find.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub value: String,
    pub url: String,
}

/// Full member profile; only ever built for privileged viewers.
#[derive(Debug, Clone, Serialize)]
pub struct MemberProfile {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationLink>,
    pub expertise: Vec<ExpertiseView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpertiseView {
    pub category: ExpertiseCategory,
    pub label: &'static str,
    pub details: String,
}

impl From<&Expertise> for ExpertiseView {
    fn from(expertise: &Expertise) -> Self {
        Self {
            category: expertise.category,
            label: expertise.category.label(),
            details: expertise.details.clone(),
        }
    }
}

/// Organization edit page: current values on GET, submitted values on POST.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationSubmission {
    pub org: OrganizationForm,
    pub channels: Vec<ChannelForm>,
}

/// Profile page: the membership form is only present for vouched-for members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<MembershipForm>,
    pub user_profile: UserProfileForm,
    pub expertise: Vec<ExpertiseForm>,
}
