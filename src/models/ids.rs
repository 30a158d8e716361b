// Strong Types - newtypes for the document ids handed around the services

use serde::{Deserialize, Serialize};
use std::fmt;

fn validate_document_id(raw: &str) -> Result<(), &'static str> {
    if raw.is_empty() {
        return Err("Document id cannot be empty");
    }
    if raw.contains('/') {
        return Err("Document id cannot contain '/'");
    }
    if raw == "." || raw == ".." {
        return Err("Document id cannot be '.' or '..'");
    }
    Ok(())
}

/// Authenticated user id as issued by the auth provider; also the `Users` document id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: &str) -> Result<Self, &'static str> {
        validate_document_id(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `listings` document id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(raw: &str) -> Result<Self, &'static str> {
        validate_document_id(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
