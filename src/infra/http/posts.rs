//! Post create/edit/delete and comment handlers.

use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::{error, warn};

use crate::{
    application::{
        error::HttpError,
        posts::{ImageUpload, PostCommandError, PostDraft, PostFormErrors},
    },
    domain::entities::{GroupRecord, PostRecord},
    presentation::views::{
        LayoutContext, PostFormContext, PostFormTemplate, post_href, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{HttpState, session::RequireUser};

const SOURCE_BASE: &str = "infra::http::posts";

pub(super) async fn create_form(State(state): State<HttpState>, user: RequireUser) -> Response {
    let groups = match load_groups(&state).await {
        Ok(groups) => groups,
        Err(err) => return err.into_response(),
    };

    render_form(&state, &user, "New post", PostFormContext::create(&groups), StatusCode::OK)
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    user: RequireUser,
    mut multipart: Multipart,
) -> Response {
    let draft = match read_post_form(&mut multipart).await {
        Ok(draft) => draft,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (draft.text.clone(), draft.group.clone());

    match state.posts.create_post(user.id(), draft).await {
        Ok(_) => Redirect::to(&profile_href(&user.user().username)).into_response(),
        Err(PostCommandError::Invalid(errors)) => {
            let groups = match load_groups(&state).await {
                Ok(groups) => groups,
                Err(err) => return err.into_response(),
            };
            let form = PostFormContext::resubmit(
                "/create/".to_string(),
                false,
                &text,
                &group,
                &groups,
                None,
                errors,
            );
            render_form(&state, &user, "New post", form, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(id): Path<i64>,
) -> Response {
    let post = match state.posts.load_for_edit(user.id(), id).await {
        Ok(post) => post,
        Err(err) => return command_error_response(&state, &user, id, err),
    };
    let groups = match load_groups(&state).await {
        Ok(groups) => groups,
        Err(err) => return err.into_response(),
    };

    render_form(
        &state,
        &user,
        "Edit post",
        PostFormContext::edit(&post, &groups),
        StatusCode::OK,
    )
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Response {
    let draft = match read_post_form(&mut multipart).await {
        Ok(draft) => draft,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (draft.text.clone(), draft.group.clone());

    match state.posts.edit_post(user.id(), id, draft).await {
        Ok(post) => Redirect::to(&post_href(post.id)).into_response(),
        Err(PostCommandError::Invalid(errors)) => {
            let existing = match state.posts.load_for_edit(user.id(), id).await {
                Ok(post) => post,
                Err(err) => return command_error_response(&state, &user, id, err),
            };
            resubmit_edit(&state, &user, &existing, &text, &group, errors).await
        }
        Err(err) => command_error_response(&state, &user, id, err),
    }
}

pub(super) async fn delete_post(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(id): Path<i64>,
) -> Response {
    match state.posts.delete_post(user.id(), id).await {
        Ok(()) => Redirect::to(&profile_href(&user.user().username)).into_response(),
        Err(err) => command_error_response(&state, &user, id, err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Response {
    match state.posts.add_comment(user.id(), id, &form.text).await {
        // An empty comment is dropped without a message.
        Ok(_) | Err(PostCommandError::Invalid(_)) => Redirect::to(&post_href(id)).into_response(),
        Err(err) => command_error_response(&state, &user, id, err),
    }
}

/// Missing posts render the 404 page and foreign posts bounce back to the detail page.
fn command_error_response(
    state: &HttpState,
    user: &RequireUser,
    post_id: i64,
    err: PostCommandError,
) -> Response {
    match err {
        PostCommandError::NotFound => render_not_found_response(state.chrome(&user.viewer())),
        PostCommandError::NotAuthor { post_id, user_id } => {
            warn!(
                target = SOURCE_BASE,
                post_id, user_id, "rejected change to another user's post"
            );
            Redirect::to(&post_href(post_id)).into_response()
        }
        err => {
            error!(
                target = SOURCE_BASE,
                post_id,
                error = %err,
                "post command failed"
            );
            HttpError::from(err).into_response()
        }
    }
}

async fn resubmit_edit(
    state: &HttpState,
    user: &RequireUser,
    existing: &PostRecord,
    text: &str,
    group: &str,
    errors: PostFormErrors,
) -> Response {
    let groups = match load_groups(state).await {
        Ok(groups) => groups,
        Err(err) => return err.into_response(),
    };
    let form = PostFormContext::resubmit(
        format!("{}edit/", post_href(existing.id)),
        true,
        text,
        group,
        &groups,
        existing.image.as_deref(),
        errors,
    );
    render_form(state, user, "Edit post", form, StatusCode::UNPROCESSABLE_ENTITY)
}

fn render_form(
    state: &HttpState,
    user: &RequireUser,
    title: &str,
    form: PostFormContext,
    status: StatusCode,
) -> Response {
    let chrome = state.chrome(&user.viewer()).with_title(title);
    let view = LayoutContext::new(chrome, form);
    render_template_response(PostFormTemplate { view }, status)
}

async fn load_groups(state: &HttpState) -> Result<Vec<GroupRecord>, HttpError> {
    state.groups.list().await.map_err(|err| {
        HttpError::from_error(
            "infra::http::posts::load_groups",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load groups",
            &err,
        )
    })
}

async fn read_post_form(multipart: &mut Multipart) -> Result<PostDraft, HttpError> {
    let mut draft = PostDraft::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                error!(
                    target = SOURCE_BASE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                let message = match status {
                    StatusCode::PAYLOAD_TOO_LARGE => "Uploaded file is too large",
                    _ => "Invalid form data",
                };
                return Err(HttpError::new(SOURCE_BASE, status, message, err.to_string()));
            }
        };

        match field.name() {
            Some("text") => draft.text = read_text(field).await?,
            Some("group") => draft.group = read_text(field).await?,
            Some("image") => {
                let file_name = field
                    .file_name()
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                let content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    HttpError::new(
                        SOURCE_BASE,
                        err.status(),
                        "Failed to read uploaded file",
                        err.to_string(),
                    )
                })?;
                // Browsers send an empty part when no file was chosen.
                if !file_name.trim().is_empty() || !data.is_empty() {
                    draft.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        data,
                    });
                }
            }
            _ => continue,
        }
    }

    Ok(draft)
}

async fn read_text(field: axum_extra::extract::multipart::Field) -> Result<String, HttpError> {
    field.text().await.map_err(|err| {
        HttpError::new(
            SOURCE_BASE,
            StatusCode::BAD_REQUEST,
            "Invalid form data",
            err.to_string(),
        )
    })
}
