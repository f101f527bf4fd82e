use std::collections::BTreeSet;

/// Number of slots the page bar always occupies once there are more pages than fit.
pub const PAGE_SLOTS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(usize),
    Ellipsis,
}

pub fn total_pages(count: usize, per_page: usize) -> usize {
    count.div_ceil(per_page.max(1))
}

/// Keeps a 1-based page inside `[1, max(1, total)]`.
pub fn clamp_page(page: usize, total: usize) -> usize {
    page.clamp(1, total.max(1))
}

/// Half-open index range of `page` within a list of `count` items.
pub fn page_bounds(page: usize, per_page: usize, count: usize) -> (usize, usize) {
    let per_page = per_page.max(1);
    let begin = std::cmp::min(page.saturating_sub(1) * per_page, count);
    let end = std::cmp::min(begin + per_page, count);
    (begin, end)
}

/// Page buttons for the pagination bar.
///
/// With up to [`PAGE_SLOTS`] pages every page gets a button. Beyond that the bar shows the
/// first page, a window around the current page and the last page, with ellipses where
/// pages are skipped, always in exactly [`PAGE_SLOTS`] slots.
pub fn page_slots(current: usize, total: usize) -> Vec<PageSlot> {
    if total <= PAGE_SLOTS {
        return (1..=total).map(PageSlot::Page).collect();
    }
    let current = clamp_page(current, total);

    let mut pages = BTreeSet::new();
    if current > 3 {
        pages.insert(1);
    }
    let window = if current <= 4 {
        1..=5
    } else if current >= total - 2 {
        total - 4..=total
    } else {
        current - 1..=current + 1
    };
    pages.extend(window);
    if current < total - 2 {
        pages.insert(total);
    }

    let mut slots = Vec::with_capacity(PAGE_SLOTS);
    let mut previous: Option<usize> = None;
    for page in pages {
        if let Some(prev) = previous
            && page > prev + 1
        {
            slots.push(PageSlot::Ellipsis);
        }
        slots.push(PageSlot::Page(page));
        previous = Some(page);
    }
    normalize(slots)
}

fn normalize(mut slots: Vec<PageSlot>) -> Vec<PageSlot> {
    while slots.len() > PAGE_SLOTS {
        // Drop the page next to the last page before touching the bounds.
        let idx = slots.len() - 2;
        slots.remove(idx);
    }
    while slots.len() < PAGE_SLOTS {
        let idx = slots.len() - 1;
        slots.insert(idx, PageSlot::Ellipsis);
    }
    slots
}
