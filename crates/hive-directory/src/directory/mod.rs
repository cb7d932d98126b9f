//! Organization directory: membership records, privilege-gated visibility, and the
//! editing flows for organizations and member profiles.

pub mod domain;
pub(crate) mod enrollment;
pub mod fixtures;
pub mod import;
pub mod memory;
pub(crate) mod pagination;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    ChannelCategory, ChannelId, ContentChannel, Expertise, ExpertiseCategory, ExpertiseId,
    FieldValueError, ImportedUserInfo, MemberRecord, Membership, MembershipId, NewContentChannel,
    NewExpertise, NewMembership, NewOrganization, NewUser, Organization, OrganizationId,
    PhoneNumber, TwitterName, User, UserId,
};
pub use enrollment::{email_domain, EnrollmentOutcome};
pub use fixtures::{DirectoryFixture, FixtureError, SeedSummary};
pub use import::{parse_rows, parse_rows_from_path, ImportError, ImportRow, ImportSummary};
pub use memory::InMemoryDirectoryRepository;
pub use pagination::PageWindow;
pub use policy::{is_privileged, is_vouched_for, MemberContext, Viewer};
pub use repository::{
    ChannelChange, DirectoryRepository, ExpertiseChange, OrganizationChangeSet, ProfileChangeSet,
    RepositoryError,
};
pub use router::{directory_router, REMOTE_USER_HEADER};
pub use service::{DirectoryError, DirectoryService};
pub use validation::FormErrors;
pub use views::{OrganizationSubmission, ProfileSubmission, SearchHit};
