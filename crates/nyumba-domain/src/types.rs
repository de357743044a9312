use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// ── Identifiers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn new(s: impl Into<String>) -> Self {
        ListingId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        UserId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Enums ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    House,
    Bnb,
}

impl ListingKind {
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "house" => Ok(ListingKind::House),
            "bnb" => Ok(ListingKind::Bnb),
            other => Err(DomainError::UnknownListingKind(other.to_string())),
        }
    }

    /// Name of the backend collection this kind of listing lives in.
    pub fn collection(&self) -> &'static str {
        match self {
            ListingKind::House => "houses",
            ListingKind::Bnb => "bnbs",
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingKind::House => write!(f, "house"),
            ListingKind::Bnb => write!(f, "bnb"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Host,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "user" => Ok(Role::User),
            "host" => Ok(Role::Host),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Host => write!(f, "host"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

// ── Core structs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub location: String,
    /// Price in whole currency units per night (bnb) or sale price (house).
    pub price: u64,
    pub kind: ListingKind,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
}

/// Declarative filter over the listings collection.
///
/// Every field is independently optional; its empty/default value means
/// "unconstrained". A listing is included only when all four predicates hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Case-insensitive substring of the listing location. Empty matches all.
    #[serde(default)]
    pub location: String,
    /// Exact listing kind. None matches all.
    #[serde(default)]
    pub kind: Option<ListingKind>,
    /// Inclusive lower price bound.
    #[serde(default)]
    pub price_min: u64,
    /// Inclusive upper price bound. None means unbounded.
    #[serde(default)]
    pub price_max: Option<u64>,
    /// Every requested amenity must appear in the listing. Empty matches all.
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            location: String::new(),
            kind: None,
            price_min: 0,
            price_max: None,
            amenities: Vec::new(),
        }
    }
}

impl FilterSpec {
    pub fn is_unconstrained(&self) -> bool {
        self.location.is_empty()
            && self.kind.is_none()
            && self.price_min == 0
            && self.price_max.is_none()
            && self.amenities.is_empty()
    }

    /// All four predicates ANDed, cheapest first.
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(kind) = self.kind {
            if listing.kind != kind {
                return false;
            }
        }

        if listing.price < self.price_min {
            return false;
        }
        if let Some(max) = self.price_max {
            if listing.price > max {
                return false;
            }
        }

        if !self.location.is_empty() {
            let needle = self.location.to_lowercase();
            if !listing.location.to_lowercase().contains(&needle) {
                return false;
            }
        }

        self.amenities
            .iter()
            .all(|wanted| listing.amenities.iter().any(|have| have == wanted))
    }
}
