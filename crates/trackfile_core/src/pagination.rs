//! Page selection over ordered sequences.

/// Returns page `page` (1-based) of `page_size` items.
///
/// A `page_size` of 0 returns every item. Pages below 1 are treated as 1.
///
/// ```
/// use trackfile_core::paginate;
///
/// let page = paginate(vec![1, 2, 3, 4, 5], 2, 2);
/// assert_eq!(page, vec![3, 4]);
/// ```
pub fn paginate<T>(items: impl IntoIterator<Item = T>, page: i64, page_size: usize) -> Vec<T> {
    if page_size == 0 {
        return items.into_iter().collect();
    }

    let page = usize::try_from(page.max(1)).unwrap_or(usize::MAX);
    let skip = (page - 1).saturating_mul(page_size);
    items.into_iter().skip(skip).take(page_size).collect()
}
