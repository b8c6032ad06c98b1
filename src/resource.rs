use serde::{Deserialize, Serialize};

use crate::availability::Availability;

/// A lendable item tracked by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resource {
    /// Unique, immutable identifier
    pub id: String,
    /// Display title used in notifications
    pub title: String,
    /// Author or maker, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// ISBN or other catalogue number, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    /// Current availability status
    #[serde(default)]
    pub availability: Availability,
}

impl Resource {
    /// Create an available resource with only an id and a title
    #[must_use]
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            author: None,
            isbn: None,
            availability: Availability::Available,
        }
    }

    /// Attach an author
    #[must_use]
    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Attach an ISBN
    #[must_use]
    pub fn with_isbn(mut self, isbn: &str) -> Self {
        self.isbn = Some(isbn.to_string());
        self
    }
}

/// Identity of someone who can hold a reservation.
///
/// The engine never stores holders; callers pass the id and contact
/// on each call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Holder {
    /// Opaque holder id recorded on reservations
    pub id: String,
    /// Address handed to the notifier
    pub contact: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Membership tier, e.g. "regular"
    #[serde(default)]
    pub membership: String,
}

impl Holder {
    /// Create a holder with an id and a contact address
    #[must_use]
    pub fn new(id: &str, contact: &str) -> Self {
        Self {
            id: id.to_string(),
            contact: contact.to_string(),
            name: String::new(),
            membership: String::new(),
        }
    }

    /// Attach a display name
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Attach a membership tier
    #[must_use]
    pub fn with_membership(mut self, membership: &str) -> Self {
        self.membership = membership.to_string();
        self
    }
}
