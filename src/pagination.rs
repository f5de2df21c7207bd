use serde::Serialize;

/// One slot in a compact pager: a page number or an ellipsis.
///
/// Serialises as a bare number or `null`, which is what the pager component renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageMarker {
    Page(u32),
    Gap,
}

// how many pages either side of the current one stay visible
const WINDOW_RADIUS: i64 = 2;

/// Builds the pager for `current` out of `total` pages.
///
/// Page `1` and `total` are always shown, plus a window around `current`. Skipped runs collapse
/// into a single `Gap`. An out-of-range `current` is clipped rather than rejected.
pub fn build_page_range(current: u32, total: u32) -> Vec<PageMarker> {
    if total <= 1 {
        return Vec::new();
    }

    let current = i64::from(current);
    let total = i64::from(total);

    let interior: Vec<i64> = if total <= 2 {
        Vec::new()
    } else {
        let window_min = 2.max(current - WINDOW_RADIUS);
        let window_max = (total - 1).min(current + WINDOW_RADIUS);
        if window_min <= window_max {
            (window_min..=window_max).collect()
        } else {
            // the window fell entirely outside the document; keep page 2 reachable
            vec![2]
        }
    };

    let mut markers = Vec::with_capacity(interior.len() + 4);
    markers.push(PageMarker::Page(1));

    if let (Some(&first), Some(&last)) = (interior.first(), interior.last()) {
        if first > 2 {
            markers.push(PageMarker::Gap);
        }
        markers.extend(interior.iter().map(|&p| PageMarker::Page(p as u32)));
        if total - last >= 2 {
            markers.push(PageMarker::Gap);
        }
    }

    markers.push(PageMarker::Page(total as u32));
    markers
}

pub fn total_pages(total_items: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    total_items.div_ceil(per_page).min(u64::from(u32::MAX)) as u32
}

pub fn page_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(per_page)
}

/// Slices an already ordered listing down to one page.
pub fn paginate<T: Clone>(items: &[T], page: u32, per_page: u32) -> Vec<T> {
    let start = page_offset(page, per_page.max(1));
    let start = usize::try_from(start).unwrap_or(usize::MAX).min(items.len());
    let end = start.saturating_add(per_page.max(1) as usize).min(items.len());
    items[start..end].to_vec()
}
