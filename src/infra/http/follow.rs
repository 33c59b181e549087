use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::{
    application::{error::HttpError, follow::FollowError},
    presentation::views::{profile_href, render_not_found_response},
};

use super::{HttpState, session::RequireUser};

pub(super) async fn follow_author(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.follow(user.id(), &username).await;
    follow_response(&state, &user, result.map(|(author, _)| author.username))
}

pub(super) async fn unfollow_author(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.unfollow(user.id(), &username).await;
    follow_response(&state, &user, result.map(|(author, _)| author.username))
}

/// Both outcomes land on the author's profile, including a refused self-follow.
fn follow_response(
    state: &HttpState,
    user: &RequireUser,
    result: Result<String, FollowError>,
) -> Response {
    match result {
        Ok(author) => Redirect::to(&profile_href(&author)).into_response(),
        Err(FollowError::SelfFollow { author }) => {
            info!(
                target = "yatube::http::follow",
                user_id = user.id(),
                "ignored self-follow"
            );
            Redirect::to(&profile_href(&author.username)).into_response()
        }
        Err(FollowError::UnknownAuthor) => render_not_found_response(state.chrome(&user.viewer())),
        Err(err) => HttpError::from(err).into_response(),
    }
}
