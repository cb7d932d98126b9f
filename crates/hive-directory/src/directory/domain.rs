use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier for a user identity.
    UserId
);
record_id!(
    /// Identifier for an organization.
    OrganizationId
);
record_id!(MembershipId);
record_id!(ExpertiseId);
record_id!(ChannelId);

/// Local mirror of the authentication system's user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn absolute_url(&self) -> String {
        format!("/users/{}/", self.username)
    }
}

/// Account details supplied when an identity is first created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

/// A Hive organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub slug: String,
    pub website: String,
    pub email_domain: String,
    pub address: String,
    pub twitter_name: Option<TwitterName>,
    pub hive_member_since: Option<NaiveDate>,
    pub mission: String,
    pub min_youth_audience_age: i16,
    pub max_youth_audience_age: i16,
    pub is_active: bool,
}

impl Organization {
    pub fn absolute_url(&self) -> String {
        format!("/orgs/{}/", self.slug)
    }
}

/// Organization details used for registration and seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub website: String,
    #[serde(default)]
    pub email_domain: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub twitter_name: Option<TwitterName>,
    #[serde(default)]
    pub hive_member_since: Option<NaiveDate>,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub min_youth_audience_age: i16,
    #[serde(default = "default_max_youth_age")]
    pub max_youth_audience_age: i16,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewOrganization {
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        website: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            website: website.into(),
            email_domain: String::new(),
            address: String::new(),
            twitter_name: None,
            hive_member_since: None,
            mission: String::new(),
            min_youth_audience_age: 0,
            max_youth_audience_age: default_max_youth_age(),
            is_active: true,
        }
    }

    pub fn with_email_domain(mut self, domain: impl Into<String>) -> Self {
        self.email_domain = domain.into();
        self
    }
}

/// Ties a user to (at most) one organization, plus directory contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub title: String,
    pub twitter_name: Option<TwitterName>,
    pub phone_number: Option<PhoneNumber>,
    pub receives_minigroup_digest: bool,
    pub is_listed: bool,
}

/// Fresh membership for a newly created identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
}

/// Membership joined with its user, as shown in directories and search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub user: User,
    pub membership: Membership,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expertise {
    pub id: ExpertiseId,
    pub user_id: UserId,
    pub category: ExpertiseCategory,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpertise {
    pub user_id: UserId,
    pub category: ExpertiseCategory,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpertiseCategory {
    Youth,
    Partnerships,
    Rfp,
    LeveragingResources,
    Volunteers,
    SharingOutcomes,
    Events,
    ProgramDesign,
    Badges,
    Innovation,
    LeveragingHive,
    Curriculum,
    Assessment,
    Technology,
    Other,
}

impl ExpertiseCategory {
    pub const ALL: [ExpertiseCategory; 15] = [
        ExpertiseCategory::Youth,
        ExpertiseCategory::Partnerships,
        ExpertiseCategory::Rfp,
        ExpertiseCategory::LeveragingResources,
        ExpertiseCategory::Volunteers,
        ExpertiseCategory::SharingOutcomes,
        ExpertiseCategory::Events,
        ExpertiseCategory::ProgramDesign,
        ExpertiseCategory::Badges,
        ExpertiseCategory::Innovation,
        ExpertiseCategory::LeveragingHive,
        ExpertiseCategory::Curriculum,
        ExpertiseCategory::Assessment,
        ExpertiseCategory::Technology,
        ExpertiseCategory::Other,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            ExpertiseCategory::Youth => "youth",
            ExpertiseCategory::Partnerships => "partnerships",
            ExpertiseCategory::Rfp => "rfp",
            ExpertiseCategory::LeveragingResources => "leveragingresources",
            ExpertiseCategory::Volunteers => "volunteers",
            ExpertiseCategory::SharingOutcomes => "sharingoutcomes",
            ExpertiseCategory::Events => "events",
            ExpertiseCategory::ProgramDesign => "programdesign",
            ExpertiseCategory::Badges => "badges",
            ExpertiseCategory::Innovation => "innovation",
            ExpertiseCategory::LeveragingHive => "leveraginghive",
            ExpertiseCategory::Curriculum => "curriculum",
            ExpertiseCategory::Assessment => "assessment",
            ExpertiseCategory::Technology => "technology",
            ExpertiseCategory::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ExpertiseCategory::Youth => "Youth",
            ExpertiseCategory::Partnerships => "Collaboration and Partnerships",
            ExpertiseCategory::Rfp => "RFP",
            ExpertiseCategory::LeveragingResources => "Leveraging Resources",
            ExpertiseCategory::Volunteers => "Mentors and Volunteers",
            ExpertiseCategory::SharingOutcomes => "Sharing Outcomes",
            ExpertiseCategory::Events => "Activities and Events",
            ExpertiseCategory::ProgramDesign => "Program Design and Facilitation",
            ExpertiseCategory::Badges => "Badges",
            ExpertiseCategory::Innovation => "Innovation Design Strategies",
            ExpertiseCategory::LeveragingHive => "Leveraging Hive",
            ExpertiseCategory::Curriculum => "Curriculum Development",
            ExpertiseCategory::Assessment => "Assessment and Evaluative Approaches",
            ExpertiseCategory::Technology => "Technological Solutions and Possibilities",
            ExpertiseCategory::Other => "Other",
        }
    }
}

impl FromStr for ExpertiseCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.key() == value)
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChannel {
    pub id: ChannelId,
    pub organization_id: OrganizationId,
    pub category: ChannelCategory,
    pub name: String,
    pub url: String,
}

impl ContentChannel {
    /// Font Awesome icon class for the channel, empty for uncategorized channels.
    pub fn fa_icon(&self) -> &'static str {
        self.category.fa_icon()
    }

    pub fn display_name(&self) -> &str {
        if self.category == ChannelCategory::Other && !self.name.is_empty() {
            return &self.name;
        }
        self.category.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContentChannel {
    pub organization_id: OrganizationId,
    pub category: ChannelCategory,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelCategory {
    Facebook,
    YouTube,
    Vimeo,
    Flickr,
    Tumblr,
    Pinterest,
    GitHub,
    Instagram,
    Other,
}

impl ChannelCategory {
    pub const ALL: [ChannelCategory; 9] = [
        ChannelCategory::Facebook,
        ChannelCategory::YouTube,
        ChannelCategory::Vimeo,
        ChannelCategory::Flickr,
        ChannelCategory::Tumblr,
        ChannelCategory::Pinterest,
        ChannelCategory::GitHub,
        ChannelCategory::Instagram,
        ChannelCategory::Other,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            ChannelCategory::Facebook => "facebook",
            ChannelCategory::YouTube => "youtube",
            ChannelCategory::Vimeo => "vimeo",
            ChannelCategory::Flickr => "flickr",
            ChannelCategory::Tumblr => "tumblr",
            ChannelCategory::Pinterest => "pinterest",
            ChannelCategory::GitHub => "github",
            ChannelCategory::Instagram => "instagram",
            ChannelCategory::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ChannelCategory::Facebook => "Facebook",
            ChannelCategory::YouTube => "YouTube",
            ChannelCategory::Vimeo => "Vimeo",
            ChannelCategory::Flickr => "Flickr",
            ChannelCategory::Tumblr => "Tumblr",
            ChannelCategory::Pinterest => "Pinterest",
            ChannelCategory::GitHub => "GitHub",
            ChannelCategory::Instagram => "Instagram",
            ChannelCategory::Other => "Other",
        }
    }

    pub const fn fa_icon(self) -> &'static str {
        match self {
            ChannelCategory::Facebook => "fa-facebook-square",
            ChannelCategory::YouTube => "fa-youtube-square",
            ChannelCategory::Vimeo => "fa-vimeo-square",
            ChannelCategory::Flickr => "fa-flickr",
            ChannelCategory::Tumblr => "fa-tumblr-square",
            ChannelCategory::Pinterest => "fa-pinterest-square",
            ChannelCategory::GitHub => "fa-github-square",
            ChannelCategory::Instagram => "fa-instagram",
            ChannelCategory::Other => "",
        }
    }
}

impl FromStr for ChannelCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.key() == value)
            .ok_or_else(|| UnknownCategory(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not one of the available choices")]
pub struct UnknownCategory(pub String);

/// Book-keeping for accounts created from a bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedUserInfo {
    pub user_id: UserId,
    pub was_sent_email: bool,
}

/// Twitter handle without the leading `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TwitterName(String);

impl TwitterName {
    pub fn parse(raw: &str) -> Result<Self, FieldValueError> {
        let name = raw.trim();
        let name = name.strip_prefix('@').unwrap_or(name);
        let valid = !name.is_empty()
            && name.len() <= 15
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(FieldValueError::TwitterName)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TwitterName {
    type Error = FieldValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TwitterName> for String {
    fn from(value: TwitterName) -> Self {
        value.0
    }
}

impl fmt::Display for TwitterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// North American phone number stored as `NNN-NNN-NNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, FieldValueError> {
        let allowed = raw
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, ' ' | '-' | '.' | '(' | ')' | '+'));
        if !allowed {
            return Err(FieldValueError::PhoneNumber);
        }

        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        let digits = match digits.len() {
            10 => digits.as_str(),
            11 if digits.starts_with('1') => &digits[1..],
            _ => return Err(FieldValueError::PhoneNumber),
        };

        Ok(Self(format!(
            "{}-{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..10]
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = FieldValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldValueError {
    #[error("Enter a valid Twitter name: up to 15 letters, numbers, or underscores.")]
    TwitterName,
    #[error("Enter a valid 10-digit phone number.")]
    PhoneNumber,
}

/// Slugs are restricted to ASCII letters, numbers, underscores, and hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn default_true() -> bool {
    true
}

fn default_max_youth_age() -> i16 {
    18
}
