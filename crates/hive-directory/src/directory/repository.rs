use super::domain::{
    ChannelId, ContentChannel, Expertise, ExpertiseId, ImportedUserInfo, MemberRecord, Membership,
    NewContentChannel, NewExpertise, NewMembership, NewOrganization, NewUser, Organization,
    OrganizationId, User, UserId,
};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Query methods document their filters and ordering; implementations backed by a relational
/// store are expected to push those down into the query.
pub trait DirectoryRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the username is taken.
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    fn update_user(&self, user: User) -> Result<(), RepositoryError>;
    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the user already has a membership.
    fn insert_membership(&self, membership: NewMembership) -> Result<Membership, RepositoryError>;
    fn update_membership(&self, membership: Membership) -> Result<(), RepositoryError>;
    fn membership_for_user(&self, user: UserId) -> Result<Option<Membership>, RepositoryError>;
    /// Every membership of the organization with its user, unfiltered and unordered.
    fn members_of(&self, organization: OrganizationId)
        -> Result<Vec<MemberRecord>, RepositoryError>;
    /// Listed memberships of active users whose first or last name contains `fragment`,
    /// ignoring case.
    fn search_members(&self, fragment: &str) -> Result<Vec<MemberRecord>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the slug is taken.
    fn insert_organization(
        &self,
        organization: NewOrganization,
    ) -> Result<Organization, RepositoryError>;
    fn organization(&self, id: OrganizationId) -> Result<Option<Organization>, RepositoryError>;
    fn organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, RepositoryError>;
    /// Active organizations ordered by name.
    fn active_organizations(&self) -> Result<Vec<Organization>, RepositoryError>;
    /// Active organizations whose name contains `fragment`, ignoring case, ordered by name.
    fn search_organizations(&self, fragment: &str) -> Result<Vec<Organization>, RepositoryError>;
    /// Active organizations registered for `domain`, compared ignoring ASCII case.
    fn organizations_with_email_domain(
        &self,
        domain: &str,
    ) -> Result<Vec<Organization>, RepositoryError>;

    /// Channels of the organization in creation order.
    fn channels_for(
        &self,
        organization: OrganizationId,
    ) -> Result<Vec<ContentChannel>, RepositoryError>;
    /// Expertise of the user in creation order.
    fn expertise_for(&self, user: UserId) -> Result<Vec<Expertise>, RepositoryError>;

    /// Persist an organization edit together with its channel changes, or nothing at all.
    fn apply_organization_changes(
        &self,
        changes: OrganizationChangeSet,
    ) -> Result<Organization, RepositoryError>;
    /// Persist a profile edit together with its membership and expertise changes, or nothing.
    fn apply_profile_changes(&self, changes: ProfileChangeSet) -> Result<(), RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the user is already recorded.
    fn insert_imported_user_info(&self, user: UserId)
        -> Result<ImportedUserInfo, RepositoryError>;
    /// Imported users that have not been sent their account e-mail yet.
    fn imported_users_pending_email(&self) -> Result<Vec<ImportedUserInfo>, RepositoryError>;
    fn update_imported_user_info(&self, info: ImportedUserInfo) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Organization row plus the channel writes that must land with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationChangeSet {
    pub organization: Organization,
    pub channels: Vec<ChannelChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelChange {
    Create(NewContentChannel),
    Update(ContentChannel),
    Delete(ChannelId),
}

/// User row plus the membership and expertise writes that must land with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChangeSet {
    pub user: User,
    pub membership: Option<Membership>,
    pub expertise: Vec<ExpertiseChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpertiseChange {
    Create(NewExpertise),
    Update(Expertise),
    Delete(ExpertiseId),
}
