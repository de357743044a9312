use serde::{Deserialize, Serialize};

use crate::types::{FilterSpec, Listing, ListingId, Role, UserIdentity};

/// The single shared application state record.
///
/// Owned exclusively by the state store; consumers read cloned snapshots or
/// react to change notifications. `listings` and `error` are transient and
/// refetched every refresh cycle; the durable subset is [`DurableSession`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub current_user: Option<UserIdentity>,
    pub role: Option<Role>,
    pub listings: Vec<Listing>,
    pub filters: FilterSpec,
    /// Favorited listing ids. Unique, insertion order preserved for display.
    pub favorites: Vec<ListingId>,
    /// Last error message, overwritten not accumulated.
    pub error: Option<String>,
}

/// Partial update merged into [`AppState`] by per-field overwrite.
///
/// An absent field keeps the current value. Fields that are themselves
/// optional in the state use a double option so a patch can distinguish
/// "leave untouched" (`None`) from "clear" (`Some(None)`). Nested values
/// such as `filters` are supplied whole, never deep-merged.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub current_user: Option<Option<UserIdentity>>,
    pub role: Option<Option<Role>>,
    pub listings: Option<Vec<Listing>>,
    pub filters: Option<FilterSpec>,
    pub favorites: Option<Vec<ListingId>>,
    pub error: Option<Option<String>>,
}

impl StatePatch {
    pub fn filters(spec: FilterSpec) -> Self {
        Self {
            filters: Some(spec),
            ..Self::default()
        }
    }

    pub fn listings(listings: Vec<Listing>) -> Self {
        Self {
            listings: Some(listings),
            ..Self::default()
        }
    }

    pub fn favorites(favorites: Vec<ListingId>) -> Self {
        Self {
            favorites: Some(favorites),
            ..Self::default()
        }
    }

    pub fn signed_in(user: UserIdentity, role: Role) -> Self {
        Self {
            current_user: Some(Some(user)),
            role: Some(Some(role)),
            ..Self::default()
        }
    }

    /// Clears the principal and everything scoped to it.
    pub fn signed_out() -> Self {
        Self {
            current_user: Some(None),
            role: Some(None),
            favorites: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(Some(message.into())),
            ..Self::default()
        }
    }

    pub fn clear_error() -> Self {
        Self {
            error: Some(None),
            ..Self::default()
        }
    }
}

impl AppState {
    /// Shallow merge: each present patch field overwrites its state field.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(user) = patch.current_user {
            self.current_user = user;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(listings) = patch.listings {
            self.listings = listings;
        }
        if let Some(filters) = patch.filters {
            self.filters = filters;
        }
        if let Some(favorites) = patch.favorites {
            self.favorites = favorites;
        }
        if let Some(error) = patch.error {
            self.error = error;
        }
    }

    /// Project out the durable subset persisted across restarts.
    pub fn session(&self) -> DurableSession {
        DurableSession {
            current_user: self.current_user.clone(),
            role: self.role,
            favorites: self.favorites.clone(),
        }
    }

    /// Rehydrate the durable subset. Transient fields are untouched.
    pub fn restore(&mut self, session: DurableSession) {
        self.current_user = session.current_user;
        self.role = session.role;
        self.favorites = session.favorites;
    }
}

/// The fields of application state persisted across process restarts, as
/// distinct from transient fields (listings, error). Listings are always
/// refetched: staleness risk outweighs load-time savings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurableSession {
    pub current_user: Option<UserIdentity>,
    pub role: Option<Role>,
    #[serde(default)]
    pub favorites: Vec<ListingId>,
}
