use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use serde_json::Value;

use crate::config::DirectoryConfig;
use crate::directory::domain::{
    ChannelCategory, ContentChannel, Expertise, ImportedUserInfo, MemberRecord, Membership,
    MembershipId, NewContentChannel, NewMembership, NewOrganization, NewUser, Organization,
    OrganizationId, PhoneNumber, User, UserId,
};
use crate::directory::memory::InMemoryDirectoryRepository;
use crate::directory::policy::{MemberContext, Viewer};
use crate::directory::repository::{
    DirectoryRepository, OrganizationChangeSet, ProfileChangeSet, RepositoryError,
};
use crate::directory::router::REMOTE_USER_HEADER;
use crate::directory::{directory_router, DirectoryService};

pub(super) type MemoryService = DirectoryService<InMemoryDirectoryRepository>;

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryDirectoryRepository>) {
    build_service_with(DirectoryConfig::default())
}

pub(super) fn build_service_with(
    config: DirectoryConfig,
) -> (MemoryService, Arc<InMemoryDirectoryRepository>) {
    let repository = Arc::new(InMemoryDirectoryRepository::new());
    let service = DirectoryService::new(repository.clone(), config);
    (service, repository)
}

pub(super) fn wnyc() -> NewOrganization {
    let mut organization = NewOrganization::new(
        "WNYC Radio Rookies",
        "wnyc",
        "https://www.wnyc.org/radio-rookies/",
    )
    .with_email_domain("wnyc.org");
    organization.mission = "Teen reporters telling true stories.".to_string();
    organization.min_youth_audience_age = 13;
    organization
}

pub(super) fn hivenyc() -> NewOrganization {
    NewOrganization::new("Hive NYC Learning Network", "hivenyc", "https://hivenyc.org/")
}

/// Registers WNYC plus a listed, affiliated member named Rita Radiotelli.
pub(super) fn seeded_service() -> (MemoryService, Arc<InMemoryDirectoryRepository>) {
    let (service, repository) = build_service();
    service.register_organization(wnyc()).expect("wnyc registered");
    service
        .register_organization(hivenyc())
        .expect("hivenyc registered");
    add_member(&service, "rita", "Rita", "Radiotelli", Some("wnyc"));
    (service, repository)
}

pub(super) fn add_member(
    service: &MemoryService,
    username: &str,
    first_name: &str,
    last_name: &str,
    organization: Option<&str>,
) -> User {
    let mut new_user = NewUser::new(username, format!("{username}@example.org"));
    new_user.first_name = first_name.to_string();
    new_user.last_name = last_name.to_string();
    let user = service.create_user(new_user).expect("user created");

    if let Some(slug) = organization {
        service
            .assign_organization(username, slug)
            .expect("organization assigned");
        let mut membership = service
            .repository()
            .membership_for_user(user.id)
            .expect("lookup")
            .expect("membership exists");
        membership.title = "Producer".to_string();
        membership.phone_number = Some(
            PhoneNumber::parse("212-555-0134").expect("valid phone"),
        );
        service
            .repository()
            .update_membership(membership)
            .expect("membership updated");
    }
    user
}

pub(super) fn add_staff(service: &MemoryService, username: &str) -> User {
    let mut new_user = NewUser::new(username, format!("{username}@hive.org"));
    new_user.is_staff = true;
    service.create_user(new_user).expect("staff created")
}

pub(super) fn viewer(service: &MemoryService, username: &str) -> Viewer {
    let viewer = service.viewer(Some(username)).expect("viewer resolved");
    assert!(viewer.is_authenticated(), "{username} should be signed in");
    viewer
}

pub(super) fn organization(service: &MemoryService, slug: &str) -> Organization {
    service
        .repository()
        .organization_by_slug(slug)
        .expect("lookup")
        .expect("organization exists")
}

pub(super) fn membership(service: &MemoryService, username: &str) -> Membership {
    let user = service
        .repository()
        .user_by_username(username)
        .expect("lookup")
        .expect("user exists");
    service
        .repository()
        .membership_for_user(user.id)
        .expect("lookup")
        .expect("membership exists")
}

pub(super) fn sample_user(is_active: bool, is_staff: bool) -> User {
    User {
        id: UserId(1),
        username: "rita".to_string(),
        first_name: "Rita".to_string(),
        last_name: "Radiotelli".to_string(),
        email: "rita@wnyc.org".to_string(),
        is_active,
        is_staff,
        is_superuser: false,
    }
}

pub(super) fn sample_organization(id: u64, is_active: bool) -> Organization {
    Organization {
        id: OrganizationId(id),
        name: format!("Organization {id}"),
        slug: format!("org-{id}"),
        website: "https://example.org/".to_string(),
        email_domain: String::new(),
        address: String::new(),
        twitter_name: None,
        hive_member_since: None,
        mission: String::new(),
        min_youth_audience_age: 0,
        max_youth_audience_age: 18,
        is_active,
    }
}

pub(super) fn sample_membership(organization: Option<OrganizationId>) -> Membership {
    Membership {
        id: MembershipId(1),
        user_id: UserId(1),
        organization_id: organization,
        title: String::new(),
        twitter_name: None,
        phone_number: None,
        receives_minigroup_digest: false,
        is_listed: true,
    }
}

pub(super) fn context(
    user: User,
    membership: Option<Membership>,
    organization: Option<Organization>,
) -> MemberContext {
    MemberContext {
        user,
        membership,
        organization,
    }
}

pub(super) fn directory_router_with_service(service: MemoryService) -> axum::Router {
    directory_router(Arc::new(service))
}

pub(super) fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, user, Body::empty())
}

pub(super) fn post_json(uri: &str, user: Option<&str>, payload: &Value) -> Request<Body> {
    let body = serde_json::to_vec(payload).expect("serialize payload");
    let mut request = request(Method::POST, uri, user, Body::from(body));
    request.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    request
}

pub(super) fn post_form(uri: &str, user: Option<&str>, body: &'static str) -> Request<Body> {
    let mut request = request(Method::POST, uri, user, Body::from(body));
    request.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    request
}

pub(super) fn post_empty(uri: &str, user: Option<&str>) -> Request<Body> {
    request(Method::POST, uri, user, Body::empty())
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(REMOTE_USER_HEADER, user);
    }
    builder.body(body).expect("request builds")
}

pub(super) fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii location")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl DirectoryRepository for UnavailableRepository {
    fn insert_user(&self, _user: NewUser) -> Result<User, RepositoryError> {
        offline()
    }

    fn update_user(&self, _user: User) -> Result<(), RepositoryError> {
        offline()
    }

    fn user(&self, _id: UserId) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn user_by_username(&self, _username: &str) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn insert_membership(&self, _membership: NewMembership) -> Result<Membership, RepositoryError> {
        offline()
    }

    fn update_membership(&self, _membership: Membership) -> Result<(), RepositoryError> {
        offline()
    }

    fn membership_for_user(&self, _user: UserId) -> Result<Option<Membership>, RepositoryError> {
        offline()
    }

    fn members_of(
        &self,
        _organization: OrganizationId,
    ) -> Result<Vec<MemberRecord>, RepositoryError> {
        offline()
    }

    fn search_members(&self, _fragment: &str) -> Result<Vec<MemberRecord>, RepositoryError> {
        offline()
    }

    fn insert_organization(
        &self,
        _organization: NewOrganization,
    ) -> Result<Organization, RepositoryError> {
        offline()
    }

    fn organization(&self, _id: OrganizationId) -> Result<Option<Organization>, RepositoryError> {
        offline()
    }

    fn organization_by_slug(&self, _slug: &str) -> Result<Option<Organization>, RepositoryError> {
        offline()
    }

    fn active_organizations(&self) -> Result<Vec<Organization>, RepositoryError> {
        offline()
    }

    fn search_organizations(&self, _fragment: &str) -> Result<Vec<Organization>, RepositoryError> {
        offline()
    }

    fn organizations_with_email_domain(
        &self,
        _domain: &str,
    ) -> Result<Vec<Organization>, RepositoryError> {
        offline()
    }

    fn channels_for(
        &self,
        _organization: OrganizationId,
    ) -> Result<Vec<ContentChannel>, RepositoryError> {
        offline()
    }

    fn expertise_for(&self, _user: UserId) -> Result<Vec<Expertise>, RepositoryError> {
        offline()
    }

    fn apply_organization_changes(
        &self,
        _changes: OrganizationChangeSet,
    ) -> Result<Organization, RepositoryError> {
        offline()
    }

    fn apply_profile_changes(&self, _changes: ProfileChangeSet) -> Result<(), RepositoryError> {
        offline()
    }

    fn insert_imported_user_info(
        &self,
        _user: UserId,
    ) -> Result<ImportedUserInfo, RepositoryError> {
        offline()
    }

    fn imported_users_pending_email(&self) -> Result<Vec<ImportedUserInfo>, RepositoryError> {
        offline()
    }

    fn update_imported_user_info(&self, _info: ImportedUserInfo) -> Result<(), RepositoryError> {
        offline()
    }
}

pub(super) fn new_channel(organization: &Organization, url: &str) -> NewContentChannel {
    NewContentChannel {
        organization_id: organization.id,
        category: ChannelCategory::YouTube,
        name: String::new(),
        url: url.to_string(),
    }
}
