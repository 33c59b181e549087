//! Write side for posts and comments.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::posts::PostText;
use crate::infra::uploads::{UploadStorage, UploadStorageError};

const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
const EMPTY_TEXT_MESSAGE: &str = "This field is required.";
const UNKNOWN_GROUP_MESSAGE: &str = "Select a valid choice.";

/// A file submitted with a post form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Raw values of a submitted post form.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub text: String,
    /// Group id as submitted. Blank means no group.
    pub group: String,
    pub image: Option<ImageUpload>,
}

/// Per-field validation messages for the post form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostFormErrors {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<String>,
}

impl PostFormErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Error)]
pub enum PostCommandError {
    #[error("post form is invalid")]
    Invalid(PostFormErrors),
    #[error("post not found")]
    NotFound,
    #[error("user {user_id} is not the author of post {post_id}")]
    NotAuthor { post_id: i64, user_id: i64 },
    #[error("failed to store image")]
    Upload(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

struct ValidDraft {
    text: PostText,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct PostCommandService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostCommandService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            reader,
            writer,
            groups,
            comments,
            uploads,
        }
    }

    pub async fn create_post(
        &self,
        author_id: i64,
        draft: PostDraft,
    ) -> Result<PostRecord, PostCommandError> {
        let valid = self.validate(draft).await?;
        let image = self.store_image(valid.image.as_ref()).await?;

        let params = CreatePostParams {
            author_id,
            text: valid.text.into_inner(),
            group_id: valid.group_id,
            image: image.clone(),
        };

        let post = match self.writer.create_post(params).await {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err.into());
            }
        };

        info!(
            target = "yatube::application::posts",
            post_id = post.id,
            author_id,
            group_id = ?post.group_id,
            has_image = post.image.is_some(),
            "post created"
        );
        Ok(post)
    }

    /// Fetch a post the editor is allowed to change.
    pub async fn load_for_edit(
        &self,
        editor_id: i64,
        post_id: i64,
    ) -> Result<PostRecord, PostCommandError> {
        let post = self
            .reader
            .find_post_by_id(post_id)
            .await?
            .ok_or(PostCommandError::NotFound)?;

        if !post.is_authored_by(editor_id) {
            return Err(PostCommandError::NotAuthor {
                post_id,
                user_id: editor_id,
            });
        }
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        editor_id: i64,
        post_id: i64,
        draft: PostDraft,
    ) -> Result<PostRecord, PostCommandError> {
        let existing = self.load_for_edit(editor_id, post_id).await?;
        let valid = self.validate(draft).await?;
        let image = self.store_image(valid.image.as_ref()).await?;

        let params = UpdatePostParams {
            id: post_id,
            text: valid.text.into_inner(),
            group_id: valid.group_id,
            image: image.clone(),
        };

        let post = match self.writer.update_post(params).await {
            Ok(post) => post,
            Err(RepoError::NotFound) => {
                self.discard_image(image.as_deref()).await;
                return Err(PostCommandError::NotFound);
            }
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err.into());
            }
        };

        if image.is_some() && existing.image != post.image {
            self.discard_image(existing.image.as_deref()).await;
        }

        info!(
            target = "yatube::application::posts",
            post_id,
            editor_id,
            image_replaced = image.is_some(),
            "post updated"
        );
        Ok(post)
    }

    /// Remove a post, its comments and its image.
    pub async fn delete_post(&self, actor_id: i64, post_id: i64) -> Result<(), PostCommandError> {
        self.load_for_edit(actor_id, post_id).await?;

        let removed = match self.writer.delete_post(post_id).await {
            Ok(post) => post,
            Err(RepoError::NotFound) => return Err(PostCommandError::NotFound),
            Err(err) => return Err(err.into()),
        };
        self.discard_image(removed.image.as_deref()).await;

        info!(
            target = "yatube::application::posts",
            post_id, actor_id, "post deleted"
        );
        Ok(())
    }

    pub async fn add_comment(
        &self,
        author_id: i64,
        post_id: i64,
        text: &str,
    ) -> Result<CommentRecord, PostCommandError> {
        let text = PostText::parse(text).map_err(|_| {
            PostCommandError::Invalid(PostFormErrors {
                text: Some(EMPTY_TEXT_MESSAGE.to_string()),
                ..PostFormErrors::default()
            })
        })?;

        if self.reader.find_post_by_id(post_id).await?.is_none() {
            return Err(PostCommandError::NotFound);
        }

        let params = CreateCommentParams {
            post_id,
            author_id,
            text: text.into_inner(),
        };
        let comment = match self.comments.create_comment(params).await {
            Ok(comment) => comment,
            // The post vanished between the lookup and the insert.
            Err(RepoError::InvalidInput { .. }) => return Err(PostCommandError::NotFound),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "yatube::application::posts",
            post_id,
            comment_id = comment.id,
            author_id,
            "comment added"
        );
        Ok(comment)
    }

    async fn validate(&self, draft: PostDraft) -> Result<ValidDraft, PostCommandError> {
        let mut errors = PostFormErrors::default();

        let text = match PostText::parse(&draft.text) {
            Ok(text) => Some(text),
            Err(_) => {
                errors.text = Some(EMPTY_TEXT_MESSAGE.to_string());
                None
            }
        };

        let group_id = match draft.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if self.groups.find_group_by_id(id).await?.is_some() => Some(id),
                _ => {
                    errors.group = Some(UNKNOWN_GROUP_MESSAGE.to_string());
                    None
                }
            },
        };

        // An empty file input means "no new image".
        let image = draft.image.filter(|upload| !upload.data.is_empty());
        if image.as_ref().is_some_and(|upload| !is_valid_image(upload)) {
            errors.image = Some(INVALID_IMAGE_MESSAGE.to_string());
        }

        match text {
            Some(text) if errors.is_empty() => Ok(ValidDraft {
                text,
                group_id,
                image,
            }),
            _ => Err(PostCommandError::Invalid(errors)),
        }
    }

    async fn store_image(
        &self,
        image: Option<&ImageUpload>,
    ) -> Result<Option<String>, PostCommandError> {
        let Some(upload) = image else {
            return Ok(None);
        };
        let stored = self
            .uploads
            .store(&upload.file_name, upload.data.clone())
            .await?;
        Ok(Some(stored.stored_path))
    }

    async fn discard_image(&self, stored_path: Option<&str>) {
        let Some(path) = stored_path else {
            return;
        };
        if let Err(err) = self.uploads.delete(path).await {
            warn!(
                target = "yatube::application::posts",
                path,
                error = %err,
                "failed to remove stored image"
            );
        }
    }
}

/// The payload must decode as an image and must not be declared as anything else.
fn is_valid_image(upload: &ImageUpload) -> bool {
    let declared = upload
        .content_type
        .as_deref()
        .and_then(|value| value.parse::<mime_guess::Mime>().ok())
        .filter(|mime| *mime != mime_guess::mime::APPLICATION_OCTET_STREAM)
        .or_else(|| mime_guess::from_path(&upload.file_name).first());

    if declared.is_some_and(|mime| mime.type_() != mime_guess::mime::IMAGE) {
        return false;
    }

    imagesize::blob_size(&upload.data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    fn upload(name: &str, content_type: Option<&str>, data: &'static [u8]) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            content_type: content_type.map(str::to_string),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn gif_payload_is_accepted() {
        assert!(is_valid_image(&upload("small.gif", Some("image/gif"), SMALL_GIF)));
        assert!(is_valid_image(&upload("small.gif", None, SMALL_GIF)));
        assert!(is_valid_image(&upload(
            "blob",
            Some("application/octet-stream"),
            SMALL_GIF
        )));
    }

    #[test]
    fn non_image_payload_is_rejected() {
        assert!(!is_valid_image(&upload(
            "notes.txt",
            Some("text/plain"),
            b"hello world"
        )));
        assert!(!is_valid_image(&upload("fake.png", None, b"not really a png")));
    }

    #[test]
    fn image_bytes_declared_as_text_are_rejected() {
        assert!(!is_valid_image(&upload(
            "small.gif",
            Some("text/plain"),
            SMALL_GIF
        )));
    }

    #[test]
    fn form_errors_emptiness() {
        assert!(PostFormErrors::default().is_empty());
        let errors = PostFormErrors {
            group: Some(UNKNOWN_GROUP_MESSAGE.to_string()),
            ..PostFormErrors::default()
        };
        assert!(!errors.is_empty());
    }
}
