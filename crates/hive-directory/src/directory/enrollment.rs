use tracing::{debug, info};

use super::domain::{Membership, NewMembership, OrganizationId, User};
use super::repository::{DirectoryRepository, RepositoryError};

/// Result of trying to attach an activated account to an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Assigned(OrganizationId),
    AlreadyAssigned,
    MalformedEmail,
    NoMatchingOrganization,
    /// Several organizations share the domain; left for manual assignment.
    Ambiguous(usize),
}

/// Domain part of an e-mail address, or `None` when there is no usable domain.
pub fn email_domain(email: &str) -> Option<&str> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

/// Ensure the user has exactly one membership, creating an unaffiliated one if needed.
pub(crate) fn ensure_membership<R>(
    repository: &R,
    user: &User,
) -> Result<Membership, RepositoryError>
where
    R: DirectoryRepository + ?Sized,
{
    if let Some(existing) = repository.membership_for_user(user.id)? {
        return Ok(existing);
    }

    let created = repository.insert_membership(NewMembership {
        user_id: user.id,
        organization_id: None,
    });

    match created {
        Ok(membership) => {
            debug!(username = %user.username, "created membership");
            Ok(membership)
        }
        Err(RepositoryError::Conflict) => repository
            .membership_for_user(user.id)?
            .ok_or(RepositoryError::NotFound),
        Err(other) => Err(other),
    }
}

/// Assign the user's membership to the single active organization registered for their
/// e-mail domain. Existing assignments are never overwritten.
pub(crate) fn enroll_by_email_domain<R>(
    repository: &R,
    user: &User,
) -> Result<EnrollmentOutcome, RepositoryError>
where
    R: DirectoryRepository + ?Sized,
{
    let Some(domain) = email_domain(&user.email) else {
        return Ok(EnrollmentOutcome::MalformedEmail);
    };

    let mut membership = ensure_membership(repository, user)?;
    if membership.organization_id.is_some() {
        return Ok(EnrollmentOutcome::AlreadyAssigned);
    }

    let matches = repository.organizations_with_email_domain(domain)?;
    let organization = match matches.as_slice() {
        [only] => only,
        [] => {
            debug!(username = %user.username, %domain, "no organization registered for domain");
            return Ok(EnrollmentOutcome::NoMatchingOrganization);
        }
        several => {
            info!(
                username = %user.username,
                %domain,
                candidates = several.len(),
                "e-mail domain matches several organizations; leaving for manual assignment"
            );
            return Ok(EnrollmentOutcome::Ambiguous(several.len()));
        }
    };

    membership.organization_id = Some(organization.id);
    repository.update_membership(membership)?;
    info!(
        username = %user.username,
        organization = %organization.slug,
        "enrolled by e-mail domain"
    );

    Ok(EnrollmentOutcome::Assigned(organization.id))
}

#[cfg(test)]
mod tests {
    use super::email_domain;

    #[test]
    fn email_domain_requires_at_sign_and_domain() {
        assert_eq!(email_domain("member@wnyc.org"), Some("wnyc.org"));
        assert_eq!(email_domain(" member@wnyc.org "), Some("wnyc.org"));
        assert_eq!(email_domain("member"), None);
        assert_eq!(email_domain("member@"), None);
        assert_eq!(email_domain(""), None);
    }
}
