use nyumba_domain::{AppState, Listing};
use nyumba_ready::StatusReport;

/// Render the readiness report as human-readable text.
pub fn render_status(report: &StatusReport) -> String {
    let mut out = String::new();
    for service in &report.services {
        let mark = if service.ready {
            "ready"
        } else if service.registered {
            "waiting"
        } else {
            "absent"
        };
        out.push_str(&format!("{:<8} {}\n", service.name.to_string(), mark));
    }
    out.push_str(&format!(
        "all      {}",
        if report.all_ready { "ready" } else { "not ready" }
    ));
    out
}

/// Render filtered listings as rows.
pub fn render_listings(listings: &[Listing]) -> String {
    if listings.is_empty() {
        return "No listings match.".to_string();
    }
    let mut out = String::new();
    for listing in listings {
        out.push_str(&format!(
            "{:<14} {:<5} {:>6}  {:<10} {}\n",
            listing.id,
            listing.kind.to_string(),
            listing.price,
            listing.location,
            listing.title
        ));
    }
    out.pop();
    out
}

/// One-line summary of the current application state.
pub fn render_state_summary(state: &AppState) -> String {
    let who = match &state.current_user {
        Some(user) => user.email.clone(),
        None => "guest".to_string(),
    };
    let mut line = format!(
        "{} listings, {} favorites, signed in as {}",
        state.listings.len(),
        state.favorites.len(),
        who
    );
    if let Some(role) = state.role {
        line.push_str(&format!(" ({role})"));
    }
    if let Some(error) = &state.error {
        line.push_str(&format!("; last error: {error}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyumba_domain::{ListingId, ListingKind};
    use nyumba_ready::{ServiceName, ServiceStatus};

    #[test]
    fn status_rows_cover_every_service() {
        let report = StatusReport {
            services: vec![
                ServiceStatus {
                    name: ServiceName::Backend,
                    registered: true,
                    ready: true,
                },
                ServiceStatus {
                    name: ServiceName::State,
                    registered: true,
                    ready: false,
                },
                ServiceStatus {
                    name: ServiceName::Auth,
                    registered: false,
                    ready: false,
                },
            ],
            all_ready: false,
        };
        let text = render_status(&report);
        assert!(text.contains("backend  ready"));
        assert!(text.contains("state    waiting"));
        assert!(text.contains("auth     absent"));
        assert!(text.ends_with("all      not ready"));
    }

    #[test]
    fn empty_listing_set_says_so() {
        assert_eq!(render_listings(&[]), "No listings match.");
    }

    #[test]
    fn state_summary_names_the_guest() {
        let state = AppState {
            listings: vec![Listing {
                id: ListingId::new("h1"),
                title: "H".to_string(),
                location: "Nairobi".to_string(),
                price: 1,
                kind: ListingKind::House,
                images: vec![],
                amenities: vec![],
            }],
            ..AppState::default()
        };
        assert_eq!(
            render_state_summary(&state),
            "1 listings, 0 favorites, signed in as guest"
        );
    }
}
