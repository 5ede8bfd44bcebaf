use crate::{JobStatus, ProjectRecord};

/// Status dropdown selection for the gallery view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(JobStatus),
}

impl StatusFilter {
    /// Parses the UI form: `"all"` or a status string.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(JobStatus::parse(raw))
        }
    }
}

/// Filters `records` down to those matching both the search term and the
/// status filter.
///
/// Search is a case-insensitive substring match against title, description
/// or website type; an empty term matches everything. Repository order is
/// preserved and no sort is imposed.
pub fn project<'a>(
    records: &'a [ProjectRecord],
    search_term: &str,
    filter: StatusFilter,
) -> Vec<&'a ProjectRecord> {
    let needle = search_term.trim().to_lowercase();
    records
        .iter()
        .filter(|record| matches_search(record, &needle) && matches_status(record, filter))
        .collect()
}

fn matches_search(record: &ProjectRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record.title.to_lowercase().contains(needle)
        || record.description.to_lowercase().contains(needle)
        || record.metadata.website_type.to_lowercase().contains(needle)
}

fn matches_status(record: &ProjectRecord, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Only(status) => record.status == status,
    }
}
