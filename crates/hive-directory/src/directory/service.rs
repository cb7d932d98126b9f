use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::{
    ChannelId, ContentChannel, Expertise, ExpertiseId, MemberRecord, NewContentChannel,
    NewExpertise, NewOrganization, NewUser, Organization, User,
};
use super::enrollment::{self, EnrollmentOutcome};
use super::pagination::PageWindow;
use super::policy::{self, MemberContext, Viewer};
use super::repository::{
    ChannelChange, DirectoryRepository, ExpertiseChange, OrganizationChangeSet, ProfileChangeSet,
    RepositoryError,
};
use super::validation::{
    ChannelEdit, ChannelForm, ExpertiseEdit, ExpertiseForm, FormErrors, MembershipForm,
    OrganizationForm, UserProfileForm, NON_FIELD,
};
use super::views::{
    DirectoryPage, MemberEntry, MemberProfile, OrganizationDetail, OrganizationLink,
    OrganizationSubmission, OrganizationView, ProfileSubmission, SearchHit,
};
use crate::config::DirectoryConfig;

/// Service composing the repository, visibility policy, and enrollment rules.
pub struct DirectoryService<R> {
    repository: Arc<R>,
    config: DirectoryConfig,
}

impl<R> DirectoryService<R>
where
    R: DirectoryRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: DirectoryConfig) -> Self {
        Self { repository, config }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Create an identity and its membership. This is the only path that creates users.
    pub fn create_user(&self, new_user: NewUser) -> Result<User, DirectoryError> {
        let user = self.repository.insert_user(new_user)?;
        enrollment::ensure_membership(self.repository.as_ref(), &user)?;
        info!(username = %user.username, active = user.is_active, "user created");
        Ok(user)
    }

    /// Complete account activation and attach the user to their e-mail domain's organization.
    pub fn activate_user(
        &self,
        username: &str,
    ) -> Result<(User, EnrollmentOutcome), DirectoryError> {
        let mut user = self
            .repository
            .user_by_username(username)?
            .ok_or_else(|| DirectoryError::NotFound(format!("user '{username}'")))?;

        if !user.is_active {
            user.is_active = true;
            self.repository.update_user(user.clone())?;
        }

        let outcome = enrollment::enroll_by_email_domain(self.repository.as_ref(), &user)?;
        info!(username = %user.username, ?outcome, "account activated");
        Ok((user, outcome))
    }

    pub fn register_organization(
        &self,
        organization: NewOrganization,
    ) -> Result<Organization, DirectoryError> {
        if !super::domain::is_valid_slug(&organization.slug) {
            let mut errors = FormErrors::default();
            errors.add(
                OrganizationForm::PREFIX,
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
            return Err(DirectoryError::Invalid(errors));
        }
        if organization.max_youth_audience_age < organization.min_youth_audience_age {
            let mut errors = FormErrors::default();
            errors.add(
                OrganizationForm::PREFIX,
                NON_FIELD,
                "Minimum youth audience age may not be greater than maximum youth audience age.",
            );
            return Err(DirectoryError::Invalid(errors));
        }

        let organization = self.repository.insert_organization(organization)?;
        info!(organization = %organization.slug, "organization registered");
        Ok(organization)
    }

    /// Administrative assignment, bypassing the e-mail domain rule.
    pub fn assign_organization(&self, username: &str, slug: &str) -> Result<(), DirectoryError> {
        let user = self.require_user(username)?;
        let organization = self
            .repository
            .organization_by_slug(slug)?
            .ok_or_else(|| DirectoryError::NotFound(format!("organization '{slug}'")))?;

        let mut membership = enrollment::ensure_membership(self.repository.as_ref(), &user)?;
        membership.organization_id = Some(organization.id);
        self.repository.update_membership(membership)?;
        debug!(%username, organization = %slug, "organization assigned");
        Ok(())
    }

    /// Resolve the identity asserted by the request boundary. Unknown and inactive accounts
    /// are treated as anonymous.
    pub fn viewer(&self, username: Option<&str>) -> Result<Viewer, DirectoryError> {
        let Some(username) = username.map(str::trim).filter(|name| !name.is_empty()) else {
            return Ok(Viewer::Anonymous);
        };

        match self.repository.user_by_username(username)? {
            Some(user) if user.is_active => Ok(Viewer::Authenticated(self.member_context(user)?)),
            Some(_) | None => {
                debug!(%username, "identity not usable; continuing anonymously");
                Ok(Viewer::Anonymous)
            }
        }
    }

    pub fn member_context(&self, user: User) -> Result<MemberContext, DirectoryError> {
        let membership = self.repository.membership_for_user(user.id)?;
        let organization = match membership
            .as_ref()
            .and_then(|membership| membership.organization_id)
        {
            Some(id) => self.repository.organization(id)?,
            None => None,
        };

        Ok(MemberContext {
            user,
            membership,
            organization,
        })
    }

    /// Active organizations by name, one page at a time.
    pub fn home(
        &self,
        viewer: &Viewer,
        page: Option<&str>,
    ) -> Result<DirectoryPage, DirectoryError> {
        let organizations = self.repository.active_organizations()?;
        let window = PageWindow::resolve(page, organizations.len(), self.config.orgs_per_page);
        let show_privileged_info = viewer.is_privileged();

        let views = organizations[window.range.clone()]
            .iter()
            .map(|organization| self.organization_view(organization, show_privileged_info))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DirectoryPage {
            page: window.number,
            num_pages: window.num_pages,
            has_previous: window.has_previous(),
            has_next: window.has_next(),
            show_privileged_info,
            organizations: views,
        })
    }

    /// Autocomplete over organization names and, for privileged viewers, member names.
    pub fn find(
        &self,
        viewer: &Viewer,
        query: Option<&str>,
    ) -> Result<Vec<SearchHit>, DirectoryError> {
        let query = match query {
            Some(query) if !query.is_empty() => query,
            _ => return Err(DirectoryError::EmptyQuery),
        };

        let mut hits: Vec<SearchHit> = self
            .repository
            .search_organizations(query)?
            .into_iter()
            .map(|organization| SearchHit {
                url: organization.absolute_url(),
                value: organization.name,
            })
            .collect();

        if viewer.is_privileged() {
            hits.extend(
                self.repository
                    .search_members(query)?
                    .into_iter()
                    .map(|record| SearchHit {
                        value: record.user.full_name(),
                        url: record.user.absolute_url(),
                    }),
            );
        }

        Ok(hits)
    }

    pub fn organization_detail(
        &self,
        viewer: &Viewer,
        slug: &str,
    ) -> Result<OrganizationDetail, DirectoryError> {
        let organization = self.active_organization(slug)?;
        let show_privileged_info = viewer.is_privileged();
        Ok(OrganizationDetail {
            show_privileged_info,
            organization: self.organization_view(&organization, show_privileged_info)?,
        })
    }

    /// Current values for the organization edit page.
    pub fn organization_edit_form(
        &self,
        viewer: &Viewer,
        slug: &str,
    ) -> Result<OrganizationSubmission, DirectoryError> {
        let organization = self.editable_organization(viewer, slug)?;
        let channels = self.repository.channels_for(organization.id)?;
        Ok(OrganizationSubmission {
            org: OrganizationForm::from_organization(&organization),
            channels: channels.iter().map(ChannelForm::from_channel).collect(),
        })
    }

    /// Confirm the viewer may edit `slug` before a submission is read.
    pub fn authorize_organization_edit(
        &self,
        viewer: &Viewer,
        slug: &str,
    ) -> Result<(), DirectoryError> {
        self.editable_organization(viewer, slug).map(|_| ())
    }

    /// Validate the organization form and every channel form, then save them together.
    pub fn update_organization(
        &self,
        viewer: &Viewer,
        slug: &str,
        submission: OrganizationSubmission,
    ) -> Result<Organization, DirectoryError> {
        let organization = self.editable_organization(viewer, slug)?;
        let existing = self.repository.channels_for(organization.id)?;
        let owned: HashSet<ChannelId> = existing.iter().map(|channel| channel.id).collect();

        let mut errors = FormErrors::default();
        let updated = submission.org.clean(&organization, &mut errors);
        let mut seen = HashSet::new();
        let mut channels = Vec::new();
        for (index, form) in submission.channels.iter().enumerate() {
            if form.id.is_some_and(|id| !owned.contains(&id)) {
                errors.add(
                    &format!("{}-{index}", ChannelForm::PREFIX),
                    NON_FIELD,
                    "Select a valid content channel.",
                );
                continue;
            }
            if form.id.is_some_and(|id| !seen.insert(id)) {
                errors.add(
                    &format!("{}-{index}", ChannelForm::PREFIX),
                    NON_FIELD,
                    "This content channel is already part of the submission.",
                );
                continue;
            }
            if let Some(edit) = form.clean(index, &mut errors) {
                channels.push(channel_change(&organization, edit));
            }
        }

        let updated = match updated {
            Some(updated) if errors.is_empty() => updated,
            _ => {
                debug!(organization = %slug, %errors, "organization edit rejected");
                return Err(DirectoryError::Invalid(errors));
            }
        };

        let saved = self
            .repository
            .apply_organization_changes(OrganizationChangeSet {
                organization: updated,
                channels,
            })?;
        info!(organization = %saved.slug, "organization profile updated");
        Ok(saved)
    }

    /// Full profile of an active member; privileged viewers only.
    pub fn member_detail(
        &self,
        viewer: &Viewer,
        username: &str,
    ) -> Result<MemberProfile, DirectoryError> {
        if !viewer.is_privileged() {
            return Err(DirectoryError::LoginRequired);
        }

        let user = self
            .repository
            .user_by_username(username)?
            .filter(|user| user.is_active)
            .ok_or_else(|| DirectoryError::NotFound(format!("user '{username}'")))?;
        let context = self.member_context(user)?;
        let membership = context
            .membership
            .ok_or_else(|| DirectoryError::NotFound(format!("membership for '{username}'")))?;
        let expertise = self.repository.expertise_for(context.user.id)?;

        Ok(MemberProfile {
            username: context.user.username.clone(),
            full_name: context.user.full_name(),
            email: context.user.email.clone(),
            title: membership.title,
            twitter_name: membership.twitter_name.map(String::from),
            phone_number: membership.phone_number.map(String::from),
            organization: context.organization.map(|organization| OrganizationLink {
                url: organization.absolute_url(),
                name: organization.name,
            }),
            expertise: expertise.iter().map(Into::into).collect(),
        })
    }

    /// Current values for the viewer's own profile page.
    pub fn profile_form(&self, viewer: &Viewer) -> Result<ProfileSubmission, DirectoryError> {
        let context = viewer.context().ok_or(DirectoryError::LoginRequired)?;
        let membership = if policy::is_vouched_for(context, None) {
            context.membership.as_ref().map(MembershipForm::from_membership)
        } else {
            None
        };
        let expertise = self.repository.expertise_for(context.user.id)?;

        Ok(ProfileSubmission {
            membership,
            user_profile: UserProfileForm::from_user(&context.user),
            expertise: expertise.iter().map(ExpertiseForm::from_expertise).collect(),
        })
    }

    /// Validate every form present on the profile page, then save them together.
    pub fn update_profile(
        &self,
        viewer: &Viewer,
        submission: ProfileSubmission,
    ) -> Result<User, DirectoryError> {
        let context = viewer.context().ok_or(DirectoryError::LoginRequired)?;
        let user = &context.user;
        let mut errors = FormErrors::default();

        let updated_user = submission.user_profile.clean(user, &mut errors);
        if let Some(candidate) = &updated_user {
            let taken = self
                .repository
                .user_by_username(&candidate.username)?
                .is_some_and(|other| other.id != user.id);
            if taken {
                errors.add(
                    UserProfileForm::PREFIX,
                    "username",
                    "A user with that username already exists.",
                );
            }
        }

        let membership = match (policy::is_vouched_for(context, None), &context.membership) {
            (true, Some(current)) => match &submission.membership {
                Some(form) => form.clean(current, &mut errors),
                None => {
                    errors.add(MembershipForm::PREFIX, NON_FIELD, "This form is required.");
                    None
                }
            },
            _ => None,
        };

        let existing = self.repository.expertise_for(user.id)?;
        let owned: HashSet<ExpertiseId> = existing.iter().map(|expertise| expertise.id).collect();
        let mut seen = HashSet::new();
        let mut expertise = Vec::new();
        for (index, form) in submission.expertise.iter().enumerate() {
            if form.id.is_some_and(|id| !owned.contains(&id)) {
                errors.add(
                    &format!("{}-{index}", ExpertiseForm::PREFIX),
                    NON_FIELD,
                    "Select a valid expertise entry.",
                );
                continue;
            }
            if form.id.is_some_and(|id| !seen.insert(id)) {
                errors.add(
                    &format!("{}-{index}", ExpertiseForm::PREFIX),
                    NON_FIELD,
                    "This expertise entry is already part of the submission.",
                );
                continue;
            }
            if let Some(edit) = form.clean(index, &mut errors) {
                expertise.push(expertise_change(user, edit));
            }
        }

        let updated_user = match updated_user {
            Some(updated) if errors.is_empty() => updated,
            _ => {
                debug!(username = %user.username, %errors, "profile edit rejected");
                return Err(DirectoryError::Invalid(errors));
            }
        };

        self.repository.apply_profile_changes(ProfileChangeSet {
            user: updated_user.clone(),
            membership,
            expertise,
        })?;
        info!(username = %updated_user.username, "profile updated");
        Ok(updated_user)
    }

    fn require_user(&self, username: &str) -> Result<User, DirectoryError> {
        self.repository
            .user_by_username(username)?
            .ok_or_else(|| DirectoryError::NotFound(format!("user '{username}'")))
    }

    fn active_organization(&self, slug: &str) -> Result<Organization, DirectoryError> {
        self.repository
            .organization_by_slug(slug)?
            .filter(|organization| organization.is_active)
            .ok_or_else(|| DirectoryError::NotFound(format!("organization '{slug}'")))
    }

    fn editable_organization(
        &self,
        viewer: &Viewer,
        slug: &str,
    ) -> Result<Organization, DirectoryError> {
        let context = viewer.context().ok_or(DirectoryError::LoginRequired)?;
        let organization = self.active_organization(slug)?;

        if !(context.user.is_superuser || policy::is_vouched_for(context, Some(&organization))) {
            warn!(
                username = %context.user.username,
                organization = %slug,
                "organization edit denied"
            );
            return Err(DirectoryError::Forbidden);
        }
        Ok(organization)
    }

    fn organization_view(
        &self,
        organization: &Organization,
        show_privileged_info: bool,
    ) -> Result<OrganizationView, DirectoryError> {
        let channels = self.repository.channels_for(organization.id)?;
        let members = self
            .membership_directory(organization)?
            .iter()
            .map(|record| MemberEntry::new(record, show_privileged_info))
            .collect();
        Ok(OrganizationView::new(organization, &channels, members))
    }

    /// Listed memberships of active users, ordered by last name.
    fn membership_directory(
        &self,
        organization: &Organization,
    ) -> Result<Vec<MemberRecord>, DirectoryError> {
        let mut records: Vec<MemberRecord> = self
            .repository
            .members_of(organization.id)?
            .into_iter()
            .filter(|record| record.membership.is_listed && record.user.is_active)
            .collect();
        records.sort_by(|a, b| {
            a.user
                .last_name
                .cmp(&b.user.last_name)
                .then_with(|| a.user.first_name.cmp(&b.user.first_name))
        });
        Ok(records)
    }
}

fn channel_change(organization: &Organization, edit: ChannelEdit) -> ChannelChange {
    match edit {
        ChannelEdit::Create {
            category,
            name,
            url,
        } => ChannelChange::Create(NewContentChannel {
            organization_id: organization.id,
            category,
            name,
            url,
        }),
        ChannelEdit::Update {
            id,
            category,
            name,
            url,
        } => ChannelChange::Update(ContentChannel {
            id,
            organization_id: organization.id,
            category,
            name,
            url,
        }),
        ChannelEdit::Delete(id) => ChannelChange::Delete(id),
    }
}

fn expertise_change(user: &User, edit: ExpertiseEdit) -> ExpertiseChange {
    match edit {
        ExpertiseEdit::Create { category, details } => ExpertiseChange::Create(NewExpertise {
            user_id: user.id,
            category,
            details,
        }),
        ExpertiseEdit::Update {
            id,
            category,
            details,
        } => ExpertiseChange::Update(Expertise {
            id,
            user_id: user.id,
            category,
            details,
        }),
        ExpertiseEdit::Delete(id) => ExpertiseChange::Delete(id),
    }
}

/// Error raised by the directory service.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Permission denied.")]
    Forbidden,
    #[error("authentication required")]
    LoginRequired,
    #[error("query must be non-empty")]
    EmptyQuery,
    #[error("malformed submission: {0}")]
    MalformedSubmission(String),
    #[error("Your submission had some problems: {0}")]
    Invalid(FormErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
