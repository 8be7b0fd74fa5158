//! Recency-ranked suggestions for when personalization is not possible.

use crate::{
    backend::{BackendError, ContentIndex},
    content::{ContentCandidate, ContentStatus, ExclusionSet},
};

/// Most recently created processed content the user has not bookmarked,
/// newest first.
///
/// Status, exclusion and ordering are enforced here regardless of what the
/// index returns.
pub fn recent_suggestions(
    index: &dyn ContentIndex,
    count: usize,
    exclusions: &ExclusionSet,
) -> Result<Vec<ContentCandidate>, BackendError> {
    let exclude_urls = exclusions.url_list();
    let mut rows = index.recent_processed(count, &exclude_urls)?;

    rows.retain(|candidate| {
        candidate.status == ContentStatus::Processed && !exclusions.contains_url(&candidate.url)
    });
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(count);

    Ok(rows)
}
