use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::policy::Viewer;
use super::repository::{DirectoryRepository, RepositoryError};
use super::service::{DirectoryError, DirectoryService};
use super::views::{OrganizationSubmission, ProfileSubmission};

/// Header set by the authenticating proxy in front of the service.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

pub const LOGIN_PATH: &str = "/accounts/login/";
pub const PROFILE_PATH: &str = "/accounts/profile/";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageParams {
    pub(crate) page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FindParams {
    pub(crate) query: Option<String>,
}

/// Router builder exposing the public directory and the member editing pages.
pub fn directory_router<R>(service: Arc<DirectoryService<R>>) -> Router
where
    R: DirectoryRepository + 'static,
{
    Router::new()
        .route("/", get(home_handler::<R>))
        .route("/find.json", get(find_handler::<R>))
        .route("/orgs/:slug/", get(organization_handler::<R>))
        .route(
            "/orgs/:slug/edit/",
            get(organization_edit_form_handler::<R>).post(organization_edit_handler::<R>),
        )
        .route("/users/:username/", get(member_handler::<R>))
        .route(
            PROFILE_PATH,
            get(profile_form_handler::<R>).post(profile_edit_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn home_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<PageParams>,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result = resolve_viewer(&service, &headers)
        .and_then(|viewer| service.home(&viewer, params.page.as_deref()));
    respond(result, &uri, |page| (StatusCode::OK, axum::Json(page)).into_response())
}

pub(crate) async fn find_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<FindParams>,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result = resolve_viewer(&service, &headers)
        .and_then(|viewer| service.find(&viewer, params.query.as_deref()));
    respond(result, &uri, |hits| (StatusCode::OK, axum::Json(hits)).into_response())
}

pub(crate) async fn organization_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result = resolve_viewer(&service, &headers)
        .and_then(|viewer| service.organization_detail(&viewer, &slug));
    respond(result, &uri, |detail| {
        (StatusCode::OK, axum::Json(detail)).into_response()
    })
}

pub(crate) async fn organization_edit_form_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result = resolve_viewer(&service, &headers)
        .and_then(|viewer| service.organization_edit_form(&viewer, &slug));
    respond(result, &uri, |form| (StatusCode::OK, axum::Json(form)).into_response())
}

pub(crate) async fn organization_edit_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
    Path(slug): Path<String>,
    body: Bytes,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result = resolve_viewer(&service, &headers).and_then(|viewer| {
        service.authorize_organization_edit(&viewer, &slug)?;
        let submission: OrganizationSubmission = parse_submission(&body)?;
        service.update_organization(&viewer, &slug, submission)
    });
    respond(result, &uri, |organization| {
        found(&organization.absolute_url())
    })
}

pub(crate) async fn member_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
    Path(username): Path<String>,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result = resolve_viewer(&service, &headers)
        .and_then(|viewer| service.member_detail(&viewer, &username));
    respond(result, &uri, |profile| {
        (StatusCode::OK, axum::Json(profile)).into_response()
    })
}

pub(crate) async fn profile_form_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result =
        resolve_viewer(&service, &headers).and_then(|viewer| service.profile_form(&viewer));
    respond(result, &uri, |form| (StatusCode::OK, axum::Json(form)).into_response())
}

pub(crate) async fn profile_edit_handler<R>(
    State(service): State<Arc<DirectoryService<R>>>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response
where
    R: DirectoryRepository + 'static,
{
    let result = resolve_viewer(&service, &headers).and_then(|viewer| {
        if viewer.context().is_none() {
            return Err(DirectoryError::LoginRequired);
        }
        let submission: ProfileSubmission = parse_submission(&body)?;
        service.update_profile(&viewer, submission)
    });
    respond(result, &uri, |_| found(PROFILE_PATH))
}

fn resolve_viewer<R>(
    service: &DirectoryService<R>,
    headers: &HeaderMap,
) -> Result<Viewer, DirectoryError>
where
    R: DirectoryRepository + 'static,
{
    let username = headers
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok());
    service.viewer(username)
}

/// Bodies are read only after the viewer has been authorized.
fn parse_submission<T: DeserializeOwned>(body: &[u8]) -> Result<T, DirectoryError> {
    serde_json::from_slice(body)
        .map_err(|err| DirectoryError::MalformedSubmission(err.to_string()))
}

fn respond<T>(
    result: Result<T, DirectoryError>,
    uri: &Uri,
    on_success: impl FnOnce(T) -> Response,
) -> Response {
    match result {
        Ok(value) => on_success(value),
        Err(err) => error_response(err, uri.path()),
    }
}

/// Map a service error onto the directory's HTTP conventions.
pub(crate) fn error_response(err: DirectoryError, path: &str) -> Response {
    match err {
        DirectoryError::LoginRequired => found(&login_url(path)),
        DirectoryError::Forbidden => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        DirectoryError::NotFound(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        DirectoryError::EmptyQuery | DirectoryError::MalformedSubmission(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        DirectoryError::Invalid(form_errors) => {
            let payload = json!({
                "error": "Your submission had some problems.",
                "form_errors": form_errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        DirectoryError::Repository(RepositoryError::Conflict) => {
            let payload = json!({ "error": "record already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        DirectoryError::Repository(other) => {
            error!(error = %other, %path, "directory repository failure");
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) fn login_url(next: &str) -> String {
    format!("{LOGIN_PATH}?next={next}")
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
