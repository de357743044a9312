#[cfg(test)]
mod tests {
    use crate::state::*;
    use crate::types::*;

    fn house(id: &str, price: u64, location: &str, amenities: &[&str]) -> Listing {
        Listing {
            id: ListingId::new(id),
            title: id.to_string(),
            location: location.to_string(),
            price,
            kind: ListingKind::House,
            images: vec![],
            amenities: amenities.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn bnb(id: &str, price: u64, location: &str, amenities: &[&str]) -> Listing {
        Listing {
            kind: ListingKind::Bnb,
            ..house(id, price, location, amenities)
        }
    }

    fn sample() -> Vec<Listing> {
        vec![
            house("h1", 500, "Nairobi", &[]),
            bnb("b1", 80, "Mombasa", &["wifi"]),
        ]
    }

    #[test]
    fn default_filter_matches_everything() {
        let spec = FilterSpec::default();
        assert!(spec.is_unconstrained());
        assert!(sample().iter().all(|l| spec.matches(l)));
    }

    #[test]
    fn kind_filter_is_exact() {
        let spec = FilterSpec {
            kind: Some(ListingKind::Bnb),
            ..FilterSpec::default()
        };
        let matched: Vec<_> = sample().into_iter().filter(|l| spec.matches(l)).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "b1");
    }

    #[test]
    fn price_range_is_inclusive() {
        let spec = FilterSpec {
            price_min: 0,
            price_max: Some(100),
            ..FilterSpec::default()
        };
        let matched: Vec<_> = sample().into_iter().filter(|l| spec.matches(l)).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "b1");

        let exact = FilterSpec {
            price_min: 80,
            price_max: Some(80),
            ..FilterSpec::default()
        };
        assert!(exact.matches(&bnb("b1", 80, "Mombasa", &["wifi"])));
    }

    #[test]
    fn amenities_filter_is_subset_test() {
        let spec = FilterSpec {
            amenities: vec!["wifi".to_string()],
            ..FilterSpec::default()
        };
        let matched: Vec<_> = sample().into_iter().filter(|l| spec.matches(l)).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "b1");

        let two = FilterSpec {
            amenities: vec!["wifi".to_string(), "pool".to_string()],
            ..FilterSpec::default()
        };
        assert!(!two.matches(&bnb("b1", 80, "Mombasa", &["wifi"])));
    }

    #[test]
    fn location_filter_is_case_insensitive_substring() {
        let spec = FilterSpec {
            location: "nairobi".to_string(),
            ..FilterSpec::default()
        };
        let matched: Vec<_> = sample().into_iter().filter(|l| spec.matches(l)).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "h1");

        let partial = FilterSpec {
            location: "mOmB".to_string(),
            ..FilterSpec::default()
        };
        assert!(partial.matches(&bnb("b1", 80, "Mombasa", &["wifi"])));
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut state = AppState {
            listings: sample(),
            ..AppState::default()
        };
        state.apply(StatePatch::filters(FilterSpec {
            location: "Nairobi".to_string(),
            ..FilterSpec::default()
        }));
        assert_eq!(state.filters.location, "Nairobi");
        assert_eq!(state.listings.len(), 2, "absent fields stay untouched");
    }

    #[test]
    fn patch_double_option_distinguishes_clear_from_keep() {
        let mut state = AppState {
            error: Some("boom".to_string()),
            ..AppState::default()
        };
        state.apply(StatePatch::listings(sample()));
        assert_eq!(state.error.as_deref(), Some("boom"));

        state.apply(StatePatch::clear_error());
        assert!(state.error.is_none());
    }

    #[test]
    fn signed_out_patch_clears_principal_and_favorites() {
        let mut state = AppState::default();
        state.apply(StatePatch::signed_in(
            UserIdentity {
                id: UserId::new("u1"),
                email: "a@b.co".to_string(),
                display_name: None,
            },
            Role::Host,
        ));
        state.apply(StatePatch::favorites(vec![ListingId::new("h1")]));
        state.apply(StatePatch::signed_out());
        assert!(state.current_user.is_none());
        assert!(state.role.is_none());
        assert!(state.favorites.is_empty());
    }

    #[test]
    fn session_round_trip_carries_durable_subset_only() {
        let state = AppState {
            current_user: Some(UserIdentity {
                id: UserId::new("u1"),
                email: "a@b.co".to_string(),
                display_name: Some("A".to_string()),
            }),
            role: Some(Role::Admin),
            listings: sample(),
            favorites: vec![ListingId::new("b1")],
            error: Some("stale".to_string()),
            ..AppState::default()
        };

        let mut fresh = AppState::default();
        fresh.restore(state.session());
        assert_eq!(fresh.current_user, state.current_user);
        assert_eq!(fresh.role, Some(Role::Admin));
        assert_eq!(fresh.favorites, state.favorites);
        assert!(fresh.listings.is_empty(), "listings are never persisted");
        assert!(fresh.error.is_none());
    }

    #[test]
    fn kind_and_role_parse() {
        assert_eq!(ListingKind::parse("house").unwrap(), ListingKind::House);
        assert_eq!(ListingKind::parse("bnb").unwrap(), ListingKind::Bnb);
        assert!(ListingKind::parse("hotel").is_err());
        assert_eq!(ListingKind::House.collection(), "houses");
        assert_eq!(ListingKind::Bnb.collection(), "bnbs");

        assert_eq!(Role::parse("admin").unwrap(), Role::Admin);
        assert!(Role::parse("owner").is_err());
    }
}
