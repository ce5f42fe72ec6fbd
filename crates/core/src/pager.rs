//! Pager model
//!
//! Pure function from (total count, page size, current page) to the cells a
//! list page renders. Page indices are 0-based; labels are 1-based.
//!
//! Layout:
//!
//! ```text
//! Previous  1  [...]  (current+1)  [...]  last  Next
//! ```
//!
//! - No cells at all when everything fits on one page
//! - The middle cell appears only when the current page is neither the first
//!   nor the last page
//! - An ellipsis separates two numeric cells when more than one page lies
//!   between them
//! - A current page past the end (rows deleted since render) is clamped to
//!   the last page instead of failing

use serde::{Deserialize, Serialize};

/// Label of the previous-page endpoint cell
pub const PREVIOUS_LABEL: &str = "Previous";
/// Label of the next-page endpoint cell
pub const NEXT_LABEL: &str = "Next";
/// Label of the non-clickable gap cell
pub const ELLIPSIS_LABEL: &str = "...";

/// What a pager cell represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Previous-page endpoint
    Previous,
    /// A numbered page
    Page,
    /// Non-clickable gap marker
    Ellipsis,
    /// Next-page endpoint
    Next,
}

/// One renderable pager cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerCell {
    /// What the cell represents
    pub kind: CellKind,
    /// Text to render
    pub label: String,
    /// Whether the cell is clickable
    pub enabled: bool,
    /// Whether the cell is the current page
    pub is_current: bool,
    /// 0-based page the cell navigates to, if clickable
    pub target_page_index: Option<u64>,
}

impl PagerCell {
    fn previous(current: u64) -> Self {
        let enabled = current > 0;
        Self {
            kind: CellKind::Previous,
            label: PREVIOUS_LABEL.to_string(),
            enabled,
            is_current: false,
            target_page_index: enabled.then(|| current - 1),
        }
    }

    fn next(current: u64, last: u64) -> Self {
        let enabled = current < last;
        Self {
            kind: CellKind::Next,
            label: NEXT_LABEL.to_string(),
            enabled,
            is_current: false,
            target_page_index: enabled.then(|| current + 1),
        }
    }

    fn page(index: u64, current: u64) -> Self {
        Self {
            kind: CellKind::Page,
            label: (index + 1).to_string(),
            enabled: true,
            is_current: index == current,
            target_page_index: Some(index),
        }
    }

    fn ellipsis() -> Self {
        Self {
            kind: CellKind::Ellipsis,
            label: ELLIPSIS_LABEL.to_string(),
            enabled: false,
            is_current: false,
            target_page_index: None,
        }
    }
}

/// Index of the last page, floored at 0
///
/// Returns 0 for a page size of 0.
pub fn last_page(total_count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_count / page_size + u64::from(total_count % page_size != 0);
    pages.saturating_sub(1)
}

/// Row offset of the first row on `page_index`
pub fn page_offset(page_index: u64, page_size: u64) -> u64 {
    page_index.saturating_mul(page_size)
}

/// Build the pager cells for a list page
pub fn build_cells(total_count: u64, page_size: u64, current_page_index: u64) -> Vec<PagerCell> {
    if page_size == 0 || total_count <= page_size {
        return Vec::new();
    }

    let last = last_page(total_count, page_size);
    let current = current_page_index.min(last);

    let mut pages = vec![0];
    if current != 0 && current != last {
        pages.push(current);
    }
    pages.push(last);

    let mut cells = Vec::with_capacity(pages.len() * 2 + 2);
    cells.push(PagerCell::previous(current));
    for (i, &index) in pages.iter().enumerate() {
        if i > 0 && index - pages[i - 1] - 1 > 1 {
            cells.push(PagerCell::ellipsis());
        }
        cells.push(PagerCell::page(index, current));
    }
    cells.push(PagerCell::next(current, last));
    cells
}
