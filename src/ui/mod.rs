pub mod embeds;
pub mod menus;

/// Entries listed per page in paginated embeds.
pub const PAGE_LEN: usize = 10;

/// A window onto a list; `index` is zero-based and `total` is at least 1.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub index: usize,
    pub total: usize,
}

/// Out-of-range pages clamp to the last one.
pub fn paginate<T>(entries: &[T], per_page: usize, page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total = entries.len().div_ceil(per_page).max(1);
    let index = page.min(total - 1);
    let start = (index * per_page).min(entries.len());
    let end = (start + per_page).min(entries.len());
    Page { items: &entries[start..end], index, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_split_and_clamp() {
        let entries: Vec<u32> = (1..=23).collect();

        let first = paginate(&entries, 10, 0);
        assert_eq!((first.items.len(), first.index, first.total), (10, 0, 3));

        let last = paginate(&entries, 10, 2);
        assert_eq!(last.items, &[21, 22, 23]);

        let past_end = paginate(&entries, 10, 99);
        assert_eq!(past_end.index, 2);
        assert_eq!(past_end.items, last.items);
    }

    #[test]
    fn empty_list_is_one_empty_page() {
        let entries: Vec<String> = Vec::new();
        let page = paginate(&entries, 10, 3);
        assert!(page.items.is_empty());
        assert_eq!((page.index, page.total), (0, 1));
    }
}
