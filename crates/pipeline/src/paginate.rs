//! Pagination slicing over an already filtered and sorted collection.

use padron_core::query::{clamp_page, total_pages, ResultPage};

/// Slice one page out of the filtered collection.
///
/// `total_count` is the size of the whole filtered collection, never the
/// slice length. The requested page is clamped into `[1, total_pages]`.
pub fn paginate<R>(filtered: Vec<R>, page: u32, page_size: u32) -> ResultPage<R> {
    let total_count = filtered.len() as u64;
    let pages = total_pages(total_count, page_size);
    let current_page = clamp_page(page, pages);

    let start = (current_page as usize - 1) * page_size as usize;
    let items: Vec<R> = filtered
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    ResultPage {
        items,
        total_count,
        total_pages: pages,
        current_page,
    }
}
