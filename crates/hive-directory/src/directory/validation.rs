//! Edit forms and their validation.
//!
//! Forms are deserialized from request bodies, cleaned into domain values, and report problems
//! through [`FormErrors`] keyed the same way the edit pages prefix their fields
//! (`org-name`, `chan-0-url`, `expertise-1-category`, ...).

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    ChannelCategory, ChannelId, ContentChannel, Expertise, ExpertiseCategory, ExpertiseId,
    Membership, Organization, PhoneNumber, TwitterName, User,
};

pub const NON_FIELD: &str = "__all__";

const REQUIRED: &str = "This field is required.";

/// Field errors collected across every form in a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, prefix: &str, field: &str, message: impl Into<String>) {
        self.0
            .entry(format!("{prefix}-{field}"))
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.keys().collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Organization profile fields editable by vouched-for members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationForm {
    pub name: String,
    pub website: String,
    pub address: String,
    pub twitter_name: String,
    pub hive_member_since: Option<NaiveDate>,
    pub mission: String,
    pub min_youth_audience_age: Option<i32>,
    pub max_youth_audience_age: Option<i32>,
}

impl OrganizationForm {
    pub const PREFIX: &'static str = "org";

    pub fn from_organization(organization: &Organization) -> Self {
        Self {
            name: organization.name.clone(),
            website: organization.website.clone(),
            address: organization.address.clone(),
            twitter_name: organization
                .twitter_name
                .as_ref()
                .map(|name| name.as_str().to_string())
                .unwrap_or_default(),
            hive_member_since: organization.hive_member_since,
            mission: organization.mission.clone(),
            min_youth_audience_age: Some(i32::from(organization.min_youth_audience_age)),
            max_youth_audience_age: Some(i32::from(organization.max_youth_audience_age)),
        }
    }

    /// Apply the form to `base`, returning the updated organization when every field is valid.
    pub fn clean(&self, base: &Organization, errors: &mut FormErrors) -> Option<Organization> {
        let prefix = Self::PREFIX;
        let before = errors.len();

        let name = required_text(&self.name, 100, errors, prefix, "name");
        let website = web_url(&self.website, errors, prefix, "website");
        let twitter_name = optional_twitter(&self.twitter_name, errors, prefix);
        let min_age = youth_age(
            self.min_youth_audience_age,
            errors,
            prefix,
            "min_youth_audience_age",
        );
        let max_age = youth_age(
            self.max_youth_audience_age,
            errors,
            prefix,
            "max_youth_audience_age",
        );

        if let (Some(min), Some(max)) = (min_age, max_age) {
            if max < min {
                errors.add(
                    prefix,
                    NON_FIELD,
                    "Minimum youth audience age may not be greater than maximum youth audience age.",
                );
            }
        }

        if errors.len() != before {
            return None;
        }

        Some(Organization {
            name: name?,
            website: website?,
            address: self.address.trim().to_string(),
            twitter_name,
            hive_member_since: self.hive_member_since,
            mission: self.mission.trim().to_string(),
            min_youth_audience_age: min_age?,
            max_youth_audience_age: max_age?,
            ..base.clone()
        })
    }
}

/// One entry of the content-channel formset on the organization edit page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelForm {
    pub id: Option<ChannelId>,
    pub category: String,
    pub name: String,
    pub url: String,
    pub delete: bool,
}

/// Cleaned outcome of a single channel form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEdit {
    Create {
        category: ChannelCategory,
        name: String,
        url: String,
    },
    Update {
        id: ChannelId,
        category: ChannelCategory,
        name: String,
        url: String,
    },
    Delete(ChannelId),
}

impl ChannelForm {
    pub const PREFIX: &'static str = "chan";

    pub fn from_channel(channel: &ContentChannel) -> Self {
        Self {
            id: Some(channel.id),
            category: channel.category.key().to_string(),
            name: channel.name.clone(),
            url: channel.url.clone(),
            delete: false,
        }
    }

    fn is_blank(&self) -> bool {
        self.id.is_none()
            && self.category.trim().is_empty()
            && self.name.trim().is_empty()
            && self.url.trim().is_empty()
    }

    /// Returns `None` for untouched extra forms and for forms with errors.
    pub fn clean(&self, index: usize, errors: &mut FormErrors) -> Option<ChannelEdit> {
        let prefix = format!("{}-{index}", Self::PREFIX);

        if self.delete {
            return self.id.map(ChannelEdit::Delete);
        }
        if self.is_blank() {
            return None;
        }

        let before = errors.len();
        let category = choice::<ChannelCategory>(&self.category, errors, &prefix);
        let name = optional_text(&self.name, 100, errors, &prefix, "name");
        let url = web_url(&self.url, errors, &prefix, "url");
        if errors.len() != before {
            return None;
        }

        let (category, name, url) = (category?, name?, url?);
        Some(match self.id {
            Some(id) => ChannelEdit::Update {
                id,
                category,
                name,
                url,
            },
            None => ChannelEdit::Create {
                category,
                name,
                url,
            },
        })
    }
}

/// Account fields every signed-in user may edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfileForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserProfileForm {
    pub const PREFIX: &'static str = "user_profile";

    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }

    pub fn clean(&self, base: &User, errors: &mut FormErrors) -> Option<User> {
        let prefix = Self::PREFIX;
        let before = errors.len();

        let username = required_text(&self.username, 30, errors, prefix, "username");
        if let Some(username) = &username {
            let valid = username
                .chars()
                .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '@' | '+' | '-'));
            if !valid {
                errors.add(
                    prefix,
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers and @/./+/-/_ characters.",
                );
            }
        }
        let first_name = optional_text(&self.first_name, 30, errors, prefix, "first_name");
        let last_name = optional_text(&self.last_name, 30, errors, prefix, "last_name");

        if errors.len() != before {
            return None;
        }

        Some(User {
            username: username?,
            first_name: first_name?,
            last_name: last_name?,
            ..base.clone()
        })
    }
}

/// Directory details shown for members of an affiliated organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipForm {
    pub title: String,
    pub twitter_name: String,
    pub phone_number: String,
    pub receives_minigroup_digest: bool,
    pub is_listed: bool,
}

impl MembershipForm {
    pub const PREFIX: &'static str = "membership";

    pub fn from_membership(membership: &Membership) -> Self {
        Self {
            title: membership.title.clone(),
            twitter_name: membership
                .twitter_name
                .as_ref()
                .map(|name| name.as_str().to_string())
                .unwrap_or_default(),
            phone_number: membership
                .phone_number
                .as_ref()
                .map(|phone| phone.as_str().to_string())
                .unwrap_or_default(),
            receives_minigroup_digest: membership.receives_minigroup_digest,
            is_listed: membership.is_listed,
        }
    }

    pub fn clean(&self, base: &Membership, errors: &mut FormErrors) -> Option<Membership> {
        let prefix = Self::PREFIX;
        let before = errors.len();

        let title = optional_text(&self.title, 100, errors, prefix, "title");
        let twitter_name = optional_twitter(&self.twitter_name, errors, prefix);
        let phone_number = match self.phone_number.trim() {
            "" => None,
            raw => match PhoneNumber::parse(raw) {
                Ok(phone) => Some(phone),
                Err(err) => {
                    errors.add(prefix, "phone_number", err.to_string());
                    None
                }
            },
        };

        if errors.len() != before {
            return None;
        }

        Some(Membership {
            title: title?,
            twitter_name,
            phone_number,
            receives_minigroup_digest: self.receives_minigroup_digest,
            is_listed: self.is_listed,
            ..base.clone()
        })
    }
}

/// One entry of the expertise formset on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertiseForm {
    pub id: Option<ExpertiseId>,
    pub category: String,
    pub details: String,
    pub delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpertiseEdit {
    Create {
        category: ExpertiseCategory,
        details: String,
    },
    Update {
        id: ExpertiseId,
        category: ExpertiseCategory,
        details: String,
    },
    Delete(ExpertiseId),
}

impl ExpertiseForm {
    pub const PREFIX: &'static str = "expertise";

    pub fn from_expertise(expertise: &Expertise) -> Self {
        Self {
            id: Some(expertise.id),
            category: expertise.category.key().to_string(),
            details: expertise.details.clone(),
            delete: false,
        }
    }

    pub fn clean(&self, index: usize, errors: &mut FormErrors) -> Option<ExpertiseEdit> {
        let prefix = format!("{}-{index}", Self::PREFIX);

        if self.delete {
            return self.id.map(ExpertiseEdit::Delete);
        }
        if self.id.is_none() && self.category.trim().is_empty() && self.details.trim().is_empty()
        {
            return None;
        }

        let before = errors.len();
        let category = choice::<ExpertiseCategory>(&self.category, errors, &prefix);
        let details = optional_text(&self.details, 255, errors, &prefix, "details");
        if errors.len() != before {
            return None;
        }

        let (category, details) = (category?, details?);
        Some(match self.id {
            Some(id) => ExpertiseEdit::Update {
                id,
                category,
                details,
            },
            None => ExpertiseEdit::Create { category, details },
        })
    }
}

fn required_text(
    value: &str,
    max_chars: usize,
    errors: &mut FormErrors,
    prefix: &str,
    field: &str,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(prefix, field, REQUIRED);
        return None;
    }
    optional_text(value, max_chars, errors, prefix, field)
}

fn optional_text(
    value: &str,
    max_chars: usize,
    errors: &mut FormErrors,
    prefix: &str,
    field: &str,
) -> Option<String> {
    let value = value.trim();
    let length = value.chars().count();
    if length > max_chars {
        errors.add(
            prefix,
            field,
            format!("Ensure this value has at most {max_chars} characters (it has {length})."),
        );
        return None;
    }
    Some(value.to_string())
}

fn web_url(value: &str, errors: &mut FormErrors, prefix: &str, field: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(prefix, field, REQUIRED);
        return None;
    }

    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Some(value.to_string())
        }
        _ => {
            errors.add(prefix, field, "Enter a valid URL.");
            None
        }
    }
}

fn optional_twitter(value: &str, errors: &mut FormErrors, prefix: &str) -> Option<TwitterName> {
    if value.trim().is_empty() {
        return None;
    }
    match TwitterName::parse(value) {
        Ok(name) => Some(name),
        Err(err) => {
            errors.add(prefix, "twitter_name", err.to_string());
            None
        }
    }
}

fn youth_age(
    value: Option<i32>,
    errors: &mut FormErrors,
    prefix: &str,
    field: &str,
) -> Option<i16> {
    let Some(value) = value else {
        errors.add(prefix, field, REQUIRED);
        return None;
    };
    if value < 0 {
        errors.add(
            prefix,
            field,
            "Ensure this value is greater than or equal to 0.",
        );
        return None;
    }
    match i16::try_from(value) {
        Ok(age) => Some(age),
        Err(_) => {
            errors.add(prefix, field, "Ensure this value is less than or equal to 32767.");
            None
        }
    }
}

fn choice<T>(value: &str, errors: &mut FormErrors, prefix: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    if value.trim().is_empty() {
        errors.add(prefix, "category", REQUIRED);
        return None;
    }
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.add(
                prefix,
                "category",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    value.trim()
                ),
            );
            None
        }
    }
}
