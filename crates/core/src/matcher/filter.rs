//! Watch-list matching and routing.

use crate::provider::{MatchRequest, Show};

use super::match_key::fold;

/// Case-insensitive substring test used by every watch-list filter.
///
/// `filter` is expected to be lower-cased already. An empty filter matches
/// anything. The comparison is retried on accent-folded text, so
/// `"lapins crétins"` also matches `"Les Lapins Cretins"`.
pub fn text_matches(filter: &str, field: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    if field.to_lowercase().contains(filter) {
        return true;
    }
    let folded_filter = fold(filter);
    !folded_filter.is_empty() && fold(field).contains(&folded_filter)
}

/// First watch-list entry (in configuration order) matching `show`.
pub fn route<'a>(watch_list: &'a [MatchRequest], show: &Show) -> Option<&'a MatchRequest> {
    watch_list.iter().find(|request| request.matches(show))
}

/// Watch-list entries addressed to one provider, in configuration order.
pub fn requests_for(watch_list: &[MatchRequest], provider: &str) -> Vec<MatchRequest> {
    watch_list
        .iter()
        .filter(|request| request.provider == provider)
        .cloned()
        .collect()
}
