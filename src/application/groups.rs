//! Group administration. Groups are created from the command line only.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, validate_slug};

pub const GROUP_TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group title must be 1 to {GROUP_TITLE_MAX_CHARS} characters")]
    InvalidTitle,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.reader.list_groups().await?)
    }

    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = command.title.trim().to_string();
        if title.is_empty() || title.chars().count() > GROUP_TITLE_MAX_CHARS {
            return Err(GroupError::InvalidTitle);
        }

        let slug = match command.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => {
                validate_slug(explicit)?;
                explicit.to_string()
            }
            _ => {
                let reader = self.reader.clone();
                match generate_unique_slug_async(&title, move |candidate| {
                    let reader = reader.clone();
                    let candidate = candidate.to_string();
                    async move {
                        reader
                            .find_group_by_slug(&candidate)
                            .await
                            .map(|existing| existing.is_none())
                    }
                })
                .await
                {
                    Ok(slug) => slug,
                    Err(SlugAsyncError::Slug(err)) => return Err(err.into()),
                    Err(SlugAsyncError::Predicate(err)) => return Err(err.into()),
                }
            }
        };

        let params = CreateGroupParams {
            title,
            slug: slug.clone(),
            description: command.description.trim().to_string(),
        };

        let group = match self.writer.create_group(params).await {
            Ok(group) => group,
            Err(RepoError::Duplicate { .. }) => return Err(GroupError::SlugTaken(slug)),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "yatube::application::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }
}
