use serde::{Deserialize, Serialize};

/// A user story, reduced to the fields the tools use.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserStory {
    /// Numeric identifier.
    pub id: u64,
    /// Title of the story.
    #[serde(default)]
    pub name: String,
    /// Rich text (HTML) description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A bug, reduced to the fields the tools use.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bug {
    /// Numeric identifier.
    pub id: u64,
    /// Title of the bug.
    #[serde(default)]
    pub name: String,
    /// Rich text (HTML) description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A comment attached to a tracker entity.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Comment {
    /// Numeric identifier.
    pub id: u64,
    /// Comment body as stored by the tracker.
    #[serde(default)]
    pub description: Option<String>,
}

/// A reference to another entity by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityRef {
    /// Numeric identifier.
    pub id: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct NewComment<'a> {
    pub description: &'a str,
    pub owner: EntityRef,
    pub general: EntityRef,
}

/// Fields of a bug to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewBug {
    /// Title of the bug.
    pub name: String,
    /// Description, HTML is accepted.
    pub description: String,
    /// The project the bug belongs to.
    pub project: EntityRef,
    /// The user story the bug was found in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_story: Option<EntityRef>,
}
