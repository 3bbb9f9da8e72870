use serde::{Deserialize, Serialize};

use super::Signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Annotated,
    Lightweight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    /// Id the tag ref points at: the tag object for annotated tags,
    /// the commit itself for lightweight ones.
    pub id: String,
    pub kind: TagKind,
    /// Object the tag ultimately refers to, normally a commit.
    pub target: String,
    pub tagger: Option<Signature>,
    pub message: Option<String>,
}
