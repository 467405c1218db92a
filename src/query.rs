use crate::models::{Application, Filter};

/// Applications shown per page in the list view.
pub const PAGE_SIZE: usize = 10;

/// One rendered slice of the filtered collection.
#[derive(Debug)]
pub struct PageView {
    pub items: Vec<Application>,
    pub page: usize,
    pub total_pages: usize,
    pub total_count: usize,
}

/// All filter predicates are conjunctive.
pub fn matches(app: &Application, filter: &Filter) -> bool {
    let search = filter.search.to_lowercase();
    let matches_search = search.is_empty()
        || app.company.to_lowercase().contains(&search)
        || app.position.to_lowercase().contains(&search)
        || app
            .notes
            .as_ref()
            .is_some_and(|n| n.to_lowercase().contains(&search));

    let matches_status = filter.status.is_none_or(|s| s == app.status);

    // Date-only comparison makes both bounds inclusive whole days.
    let matches_date = filter.start_date.is_none_or(|d| app.applied_date >= d)
        && filter.end_date.is_none_or(|d| app.applied_date <= d);

    matches_search && matches_status && matches_date
}

/// Filtered view, most recent application first. The sort is stable, so
/// records applied on the same day keep their stored relative order.
pub fn filter_and_sort(apps: &[Application], filter: &Filter) -> Vec<Application> {
    let mut out: Vec<Application> = apps
        .iter()
        .filter(|app| matches(app, filter))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.applied_date.cmp(&a.applied_date));
    out
}

/// Slice a filtered collection into a 1-indexed page. `total_pages` is at
/// least 1 even for an empty collection. Out-of-range pages are the
/// caller's job to prevent (the CLI validates before calling); a page past
/// the end simply comes back empty.
pub fn paginate(filtered: Vec<Application>, page: usize, page_size: usize) -> PageView {
    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(page_size).max(1);
    let items = filtered
        .into_iter()
        .skip(page.saturating_sub(1) * page_size)
        .take(page_size)
        .collect();
    PageView {
        items,
        page,
        total_pages,
        total_count,
    }
}
