//! Request and response bodies of the hub endpoints.

use feedline_types::PostId;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Body of `follow-user`, `unfollow-user` and `get-follow-status`.
#[derive(Debug, Clone, Deserialize)]
pub struct HandleRequest {
    /// Target user's handle.
    pub handle: String,
}

/// Body of `get-my-home-timeline`. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineRequest {
    /// Key returned by the previous page.
    #[serde(default)]
    pub pagination_key: Option<String>,
    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Body of `add-post`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddPostRequest {
    /// Post body.
    #[validate(length(min = 1, max = 4096))]
    pub content: String,
    /// Free-form tags.
    #[serde(default)]
    #[validate(length(max = 3), custom(function = "non_empty_tags"))]
    pub tags: Vec<String>,
}

fn non_empty_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.iter().any(|tag| tag.trim().is_empty()) {
        return Err(ValidationError::new("empty_tag"));
    }
    Ok(())
}

/// Response of `add-post`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPostResponse {
    /// Id of the new post.
    pub post_id: PostId,
}

#[cfg(test)]
mod tests {
    use feedline_core::posts::MAX_CONTENT_CHARS;

    use super::*;

    fn request(content: &str, tags: &[&str]) -> AddPostRequest {
        AddPostRequest {
            content: content.to_owned(),
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
        }
    }

    #[test]
    fn add_post_rules() {
        assert!(request("hello", &["a", "b", "c"]).validate().is_ok());
        assert!(request("", &[]).validate().is_err());
        assert!(request("hello", &["a", "b", "c", "d"]).validate().is_err());
        assert!(request("hello", &[" "]).validate().is_err());
        assert!(request(&"é".repeat(MAX_CONTENT_CHARS), &[]).validate().is_ok());
    }
}
