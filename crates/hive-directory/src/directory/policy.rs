use super::domain::{Membership, Organization, User};

/// A user together with the affiliation state the visibility rules depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberContext {
    pub user: User,
    pub membership: Option<Membership>,
    pub organization: Option<Organization>,
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated(MemberContext),
}

impl Viewer {
    pub fn context(&self) -> Option<&MemberContext> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(context) => Some(context),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated(_))
    }

    /// Whether personal contact details may be shown to this viewer.
    pub fn is_privileged(&self) -> bool {
        self.context().is_some_and(is_privileged)
    }
}

/// Returns whether the user belongs to an active, Hive-affiliated organization. When an
/// organization is supplied, also requires that it is the user's own organization.
pub fn is_vouched_for(context: &MemberContext, organization: Option<&Organization>) -> bool {
    if !context.user.is_active {
        return false;
    }

    let affiliated = match (&context.membership, &context.organization) {
        (Some(membership), Some(own)) => {
            membership.organization_id == Some(own.id) && own.is_active
        }
        _ => false,
    };
    if !affiliated {
        return false;
    }

    match (organization, &context.organization) {
        (None, _) => true,
        (Some(requested), Some(own)) => requested.id == own.id,
        (Some(_), None) => false,
    }
}

/// Returns whether the user may view personally identifiable information such as e-mail
/// addresses and phone numbers.
pub fn is_privileged(context: &MemberContext) -> bool {
    is_vouched_for(context, None) || (context.user.is_active && context.user.is_staff)
}
