//! Testing utilities and a scriptable provider.
//!
//! Lets scans be exercised end to end without any real content source.
//!
//! # Example
//!
//! ```rust,ignore
//! use aspiratv_core::testing::{fixtures, MockProvider};
//!
//! let provider = MockProvider::new("x")
//!     .with_shows(vec![fixtures::episode("x", "1", "Les Lapins Crétins", 1, 1)]);
//! provider.set_item_delay(Duration::from_millis(10)).await;
//!
//! // Register it and run a scan...
//! ```

mod mock_provider;

pub use mock_provider::MockProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};

    use crate::provider::{Destinations, MatchRequest, Show};

    /// A numbered episode whose title only repeats the numbering.
    pub fn episode(provider: &str, id: &str, series: &str, season: u32, episode: u32) -> Show {
        Show::new(
            provider,
            id,
            series,
            format!("S{:02}E{:02}", season, episode),
        )
        .with_episode(Some(season), episode)
    }

    /// An episode with a real title and no numbering.
    pub fn titled(provider: &str, id: &str, series: &str, title: &str) -> Show {
        Show::new(provider, id, series, title)
    }

    /// A daily show only identified by its air date.
    pub fn daily(provider: &str, id: &str, series: &str, year: i32, month: u32, day: u32) -> Show {
        let aired = Utc
            .with_ymd_and_hms(year, month, day, 20, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Show::new(provider, id, series, series).with_aired_at(aired)
    }

    /// Destination table used across tests.
    pub fn destinations() -> Destinations {
        HashMap::from([
            ("Jeunesse".to_string(), PathBuf::from("/videos/kids")),
            ("Docs".to_string(), PathBuf::from("/videos/docs")),
        ])
    }

    /// Watch-list entry for `provider` restricted to one show.
    pub fn request(provider: &str, show: &str, destination: &str) -> MatchRequest {
        MatchRequest::new(provider, destination)
            .with_show(show)
            .normalized()
    }
}
