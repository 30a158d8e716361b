// Follow edge pairing - every follow is stored twice, once under each user,
// and each side has a denormalized counter on the owning user document.

use crate::infrastructure::document_store::{CollectionPath, DocumentPath};
use crate::models::{paths, UserId};

/// Which side of a follow relationship a sub-collection holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// `Users/{followed}/followers/{follower}`
    Followers,
    /// `Users/{follower}/following/{followed}`
    Following,
}

impl EdgeKind {
    pub fn collection_name(self) -> &'static str {
        match self {
            EdgeKind::Followers => "followers",
            EdgeKind::Following => "following",
        }
    }

    /// Counter field on the owning user document
    pub fn counter_field(self) -> &'static str {
        match self {
            EdgeKind::Followers => "followCount",
            EdgeKind::Following => "followingCount",
        }
    }

    /// Edge collection owned by `owner`
    pub fn collection(self, owner: &UserId) -> CollectionPath {
        paths::user(owner).sub_collection(self.collection_name())
    }

    /// Edge document owned by `owner` pointing at `other`
    pub fn edge(self, owner: &UserId, other: &UserId) -> DocumentPath {
        self.collection(owner).doc(other.as_str())
    }
}
