use std::ops::Range;

/// Resolved page of a listing. Always refers to an existing page: an empty listing still has
/// one empty page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub range: Range<usize>,
}

impl PageWindow {
    /// Clamp the raw `page` query value onto the listing. Missing or non-integer values fall
    /// back to the first page; integers outside the listing fall back to the last page.
    pub fn resolve(raw: Option<&str>, total: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(per_page).max(1);

        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(requested)) => usize::try_from(requested)
                .ok()
                .filter(|page| (1..=num_pages).contains(page))
                .unwrap_or(num_pages),
        };

        let start = (number - 1) * per_page;
        let end = (start + per_page).min(total);

        Self {
            number,
            num_pages,
            range: start.min(total)..end,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}
