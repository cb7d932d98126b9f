use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    ChannelId, ContentChannel, Expertise, ExpertiseId, ImportedUserInfo, MemberRecord, Membership,
    MembershipId, NewMembership, NewOrganization, NewUser, Organization, OrganizationId, User,
    UserId,
};
use super::repository::{
    ChannelChange, DirectoryRepository, ExpertiseChange, OrganizationChangeSet, ProfileChangeSet,
    RepositoryError,
};

/// Process-local store. Every operation holds the single state lock, which makes the
/// multi-record change sets all-or-nothing.
#[derive(Default, Clone)]
pub struct InMemoryDirectoryRepository {
    state: Arc<Mutex<DirectoryState>>,
}

#[derive(Default)]
struct DirectoryState {
    next_id: u64,
    users: BTreeMap<UserId, User>,
    memberships: BTreeMap<MembershipId, Membership>,
    organizations: BTreeMap<OrganizationId, Organization>,
    channels: BTreeMap<ChannelId, ContentChannel>,
    expertise: BTreeMap<ExpertiseId, Expertise>,
    imported: BTreeMap<UserId, ImportedUserInfo>,
}

impl DirectoryState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn member_record(&self, membership: &Membership) -> Option<MemberRecord> {
        self.users.get(&membership.user_id).map(|user| MemberRecord {
            user: user.clone(),
            membership: membership.clone(),
        })
    }

    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|user| user.username == username && Some(user.id) != except)
    }
}

impl InMemoryDirectoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, DirectoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("directory state lock poisoned".to_string()))
    }
}

fn contains_ignoring_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn sorted_by_name(mut organizations: Vec<Organization>) -> Vec<Organization> {
    organizations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    organizations
}

impl DirectoryRepository for InMemoryDirectoryRepository {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state()?;
        if state.username_taken(&user.username, None) {
            return Err(RepositoryError::Conflict);
        }

        let id = UserId(state.allocate());
        let record = User {
            id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        };
        state.users.insert(id, record.clone());
        Ok(record)
    }

    fn update_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        if state.username_taken(&user.username, Some(user.id)) {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    fn insert_membership(&self, membership: NewMembership) -> Result<Membership, RepositoryError> {
        let mut state = self.state()?;
        if !state.users.contains_key(&membership.user_id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .memberships
            .values()
            .any(|existing| existing.user_id == membership.user_id)
        {
            return Err(RepositoryError::Conflict);
        }

        let id = MembershipId(state.allocate());
        let record = Membership {
            id,
            user_id: membership.user_id,
            organization_id: membership.organization_id,
            title: String::new(),
            twitter_name: None,
            phone_number: None,
            receives_minigroup_digest: false,
            is_listed: true,
        };
        state.memberships.insert(id, record.clone());
        Ok(record)
    }

    fn update_membership(&self, membership: Membership) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.memberships.get(&membership.id) {
            Some(existing) if existing.user_id == membership.user_id => {
                state.memberships.insert(membership.id, membership);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn membership_for_user(&self, user: UserId) -> Result<Option<Membership>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .memberships
            .values()
            .find(|membership| membership.user_id == user)
            .cloned())
    }

    fn members_of(
        &self,
        organization: OrganizationId,
    ) -> Result<Vec<MemberRecord>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .memberships
            .values()
            .filter(|membership| membership.organization_id == Some(organization))
            .filter_map(|membership| state.member_record(membership))
            .collect())
    }

    fn search_members(&self, fragment: &str) -> Result<Vec<MemberRecord>, RepositoryError> {
        let needle = fragment.to_lowercase();
        let state = self.state()?;
        Ok(state
            .memberships
            .values()
            .filter(|membership| membership.is_listed)
            .filter_map(|membership| state.member_record(membership))
            .filter(|record| {
                record.user.is_active
                    && (contains_ignoring_case(&record.user.first_name, &needle)
                        || contains_ignoring_case(&record.user.last_name, &needle))
            })
            .collect())
    }

    fn insert_organization(
        &self,
        organization: NewOrganization,
    ) -> Result<Organization, RepositoryError> {
        let mut state = self.state()?;
        if state
            .organizations
            .values()
            .any(|existing| existing.slug == organization.slug)
        {
            return Err(RepositoryError::Conflict);
        }

        let id = OrganizationId(state.allocate());
        let record = Organization {
            id,
            name: organization.name,
            slug: organization.slug,
            website: organization.website,
            email_domain: organization.email_domain,
            address: organization.address,
            twitter_name: organization.twitter_name,
            hive_member_since: organization.hive_member_since,
            mission: organization.mission,
            min_youth_audience_age: organization.min_youth_audience_age,
            max_youth_audience_age: organization.max_youth_audience_age,
            is_active: organization.is_active,
        };
        state.organizations.insert(id, record.clone());
        Ok(record)
    }

    fn organization(&self, id: OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        Ok(self.state()?.organizations.get(&id).cloned())
    }

    fn organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .organizations
            .values()
            .find(|organization| organization.slug == slug)
            .cloned())
    }

    fn active_organizations(&self) -> Result<Vec<Organization>, RepositoryError> {
        let state = self.state()?;
        let active = state
            .organizations
            .values()
            .filter(|organization| organization.is_active)
            .cloned()
            .collect();
        Ok(sorted_by_name(active))
    }

    fn search_organizations(&self, fragment: &str) -> Result<Vec<Organization>, RepositoryError> {
        let needle = fragment.to_lowercase();
        let state = self.state()?;
        let matches = state
            .organizations
            .values()
            .filter(|organization| {
                organization.is_active && contains_ignoring_case(&organization.name, &needle)
            })
            .cloned()
            .collect();
        Ok(sorted_by_name(matches))
    }

    fn organizations_with_email_domain(
        &self,
        domain: &str,
    ) -> Result<Vec<Organization>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .organizations
            .values()
            .filter(|organization| {
                organization.is_active && organization.email_domain.eq_ignore_ascii_case(domain)
            })
            .cloned()
            .collect())
    }

    fn channels_for(
        &self,
        organization: OrganizationId,
    ) -> Result<Vec<ContentChannel>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .channels
            .values()
            .filter(|channel| channel.organization_id == organization)
            .cloned()
            .collect())
    }

    fn expertise_for(&self, user: UserId) -> Result<Vec<Expertise>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .expertise
            .values()
            .filter(|expertise| expertise.user_id == user)
            .cloned()
            .collect())
    }

    fn apply_organization_changes(
        &self,
        changes: OrganizationChangeSet,
    ) -> Result<Organization, RepositoryError> {
        let mut state = self.state()?;
        let organization = changes.organization;

        if !state.organizations.contains_key(&organization.id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .organizations
            .values()
            .any(|other| other.slug == organization.slug && other.id != organization.id)
        {
            return Err(RepositoryError::Conflict);
        }

        let owned = |id: &ChannelId| {
            state
                .channels
                .get(id)
                .is_some_and(|channel| channel.organization_id == organization.id)
        };
        let references_valid = changes.channels.iter().all(|change| match change {
            ChannelChange::Create(channel) => channel.organization_id == organization.id,
            ChannelChange::Update(channel) => {
                owned(&channel.id) && channel.organization_id == organization.id
            }
            ChannelChange::Delete(id) => owned(id),
        });
        if !references_valid {
            return Err(RepositoryError::NotFound);
        }

        for change in changes.channels {
            match change {
                ChannelChange::Create(channel) => {
                    let id = ChannelId(state.allocate());
                    state.channels.insert(
                        id,
                        ContentChannel {
                            id,
                            organization_id: channel.organization_id,
                            category: channel.category,
                            name: channel.name,
                            url: channel.url,
                        },
                    );
                }
                ChannelChange::Update(channel) => {
                    state.channels.insert(channel.id, channel);
                }
                ChannelChange::Delete(id) => {
                    state.channels.remove(&id);
                }
            }
        }

        state
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    fn apply_profile_changes(&self, changes: ProfileChangeSet) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let user = changes.user;

        if !state.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        if state.username_taken(&user.username, Some(user.id)) {
            return Err(RepositoryError::Conflict);
        }
        if let Some(membership) = &changes.membership {
            let belongs = state
                .memberships
                .get(&membership.id)
                .is_some_and(|existing| existing.user_id == user.id)
                && membership.user_id == user.id;
            if !belongs {
                return Err(RepositoryError::NotFound);
            }
        }

        let owned = |id: &ExpertiseId| {
            state
                .expertise
                .get(id)
                .is_some_and(|expertise| expertise.user_id == user.id)
        };
        let references_valid = changes.expertise.iter().all(|change| match change {
            ExpertiseChange::Create(expertise) => expertise.user_id == user.id,
            ExpertiseChange::Update(expertise) => {
                owned(&expertise.id) && expertise.user_id == user.id
            }
            ExpertiseChange::Delete(id) => owned(id),
        });
        if !references_valid {
            return Err(RepositoryError::NotFound);
        }

        for change in changes.expertise {
            match change {
                ExpertiseChange::Create(expertise) => {
                    let id = ExpertiseId(state.allocate());
                    state.expertise.insert(
                        id,
                        Expertise {
                            id,
                            user_id: expertise.user_id,
                            category: expertise.category,
                            details: expertise.details,
                        },
                    );
                }
                ExpertiseChange::Update(expertise) => {
                    state.expertise.insert(expertise.id, expertise);
                }
                ExpertiseChange::Delete(id) => {
                    state.expertise.remove(&id);
                }
            }
        }

        if let Some(membership) = changes.membership {
            state.memberships.insert(membership.id, membership);
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    fn insert_imported_user_info(
        &self,
        user: UserId,
    ) -> Result<ImportedUserInfo, RepositoryError> {
        let mut state = self.state()?;
        if !state.users.contains_key(&user) {
            return Err(RepositoryError::NotFound);
        }
        if state.imported.contains_key(&user) {
            return Err(RepositoryError::Conflict);
        }

        let info = ImportedUserInfo {
            user_id: user,
            was_sent_email: false,
        };
        state.imported.insert(user, info.clone());
        Ok(info)
    }

    fn imported_users_pending_email(&self) -> Result<Vec<ImportedUserInfo>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .imported
            .values()
            .filter(|info| !info.was_sent_email)
            .cloned()
            .collect())
    }

    fn update_imported_user_info(&self, info: ImportedUserInfo) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.imported.get_mut(&info.user_id) {
            Some(existing) => {
                *existing = info;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::domain::{ChannelCategory, NewContentChannel};

    fn seeded() -> (InMemoryDirectoryRepository, Organization) {
        let repository = InMemoryDirectoryRepository::new();
        let organization = repository
            .insert_organization(NewOrganization::new(
                "WNYC Radio Rookies",
                "wnyc",
                "https://www.wnyc.org/",
            ))
            .expect("organization inserted");
        (repository, organization)
    }

    #[test]
    fn duplicate_slugs_and_usernames_conflict() {
        let (repository, _) = seeded();
        let duplicate = repository.insert_organization(NewOrganization::new(
            "Another",
            "wnyc",
            "https://example.org/",
        ));
        assert!(matches!(duplicate, Err(RepositoryError::Conflict)));

        repository
            .insert_user(NewUser::new("rookie", "rookie@wnyc.org"))
            .expect("user inserted");
        let duplicate = repository.insert_user(NewUser::new("rookie", "other@wnyc.org"));
        assert!(matches!(duplicate, Err(RepositoryError::Conflict)));
    }

    #[test]
    fn channel_changes_for_foreign_channels_apply_nothing() {
        let (repository, wnyc) = seeded();
        let other = repository
            .insert_organization(NewOrganization::new(
                "Hive NYC",
                "hivenyc",
                "https://hivenyc.org/",
            ))
            .expect("organization inserted");
        let foreign = repository
            .apply_organization_changes(OrganizationChangeSet {
                organization: other.clone(),
                channels: vec![ChannelChange::Create(NewContentChannel {
                    organization_id: other.id,
                    category: ChannelCategory::GitHub,
                    name: String::new(),
                    url: "https://github.com/hivenyc".to_string(),
                })],
            })
            .map(|_| repository.channels_for(other.id).expect("channels"))
            .expect("channel created");

        let mut renamed = wnyc.clone();
        renamed.name = "Renamed".to_string();
        let result = repository.apply_organization_changes(OrganizationChangeSet {
            organization: renamed,
            channels: vec![ChannelChange::Delete(foreign[0].id)],
        });

        assert!(matches!(result, Err(RepositoryError::NotFound)));
        let stored = repository
            .organization(wnyc.id)
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.name, "WNYC Radio Rookies");
        assert_eq!(repository.channels_for(other.id).expect("channels").len(), 1);
    }

    #[test]
    fn active_organizations_sort_by_name() {
        let (repository, _) = seeded();
        let mut hidden = NewOrganization::new("Archived", "archived", "https://example.org/");
        hidden.is_active = false;
        repository.insert_organization(hidden).expect("inserted");
        repository
            .insert_organization(NewOrganization::new(
                "Brooklyn Public Library",
                "bpl",
                "https://bklynlibrary.org/",
            ))
            .expect("inserted");

        let names: Vec<String> = repository
            .active_organizations()
            .expect("listing")
            .into_iter()
            .map(|organization| organization.name)
            .collect();
        assert_eq!(names, vec!["Brooklyn Public Library", "WNYC Radio Rookies"]);
    }
}
