//! Vertical layout cursor for the paginated document
//!
//! PDF coordinates grow upwards: a fresh page starts at `top` and content
//! moves the cursor down until it would cross `threshold`, at which point
//! the next block goes to a new page.

/// Cursor state: position on the current page and how many pages exist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    position: f32,
    page_index: usize,
    top: f32,
    threshold: f32,
}

impl PageCursor {
    /// Cursor at the top of the first page
    pub fn new(top: f32, threshold: f32) -> Self {
        Self {
            position: top,
            page_index: 0,
            top,
            threshold,
        }
    }

    /// Cursor for a page of `height` with equal top and bottom margins
    pub fn for_page(height: f32, margin: f32) -> Self {
        Self::new(height - margin, margin)
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Move down by `height`
    pub fn advance(&mut self, height: f32) {
        self.position -= height;
    }

    /// Start a new page with the cursor back at the top
    pub fn break_page(&mut self) {
        self.page_index += 1;
        self.position = self.top;
    }

    /// Whether a block of `height` fits above the threshold
    pub fn fits(&self, height: f32) -> bool {
        self.position - height >= self.threshold
    }

    /// Break the page when a block of `height` does not fit; returns whether
    /// a break happened. A block taller than a whole page is placed at the top
    /// of a fresh page rather than breaking forever.
    pub fn reserve(&mut self, height: f32) -> bool {
        if self.fits(height) || self.position == self.top {
            false
        } else {
            self.break_page();
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_and_break() {
        let mut cursor = PageCursor::for_page(297.0, 20.0);
        assert_eq!(cursor.position(), 277.0);
        cursor.advance(100.0);
        assert_eq!(cursor.position(), 177.0);
        assert_eq!(cursor.page_index(), 0);

        cursor.break_page();
        assert_eq!(cursor.position(), 277.0);
        assert_eq!(cursor.page_index(), 1);
    }

    #[test]
    fn test_reserve_at_exact_boundary() {
        let mut cursor = PageCursor::new(100.0, 20.0);
        cursor.advance(70.0);
        // 30 - 10 lands exactly on the threshold and still fits
        assert!(!cursor.reserve(10.0));
        assert_eq!(cursor.page_index(), 0);
        // one more millimetre does not
        assert!(cursor.reserve(10.5));
        assert_eq!(cursor.page_index(), 1);
        assert_eq!(cursor.position(), 100.0);
    }

    #[test]
    fn test_block_filling_page_exactly_fits() {
        let mut cursor = PageCursor::new(100.0, 20.0);
        assert!(!cursor.reserve(80.0));
        cursor.advance(80.0);
        assert_eq!(cursor.position(), 20.0);
        assert!(cursor.reserve(0.5));
        assert_eq!(cursor.page_index(), 1);
    }

    #[test]
    fn test_oversized_block_on_fresh_page() {
        let mut cursor = PageCursor::new(100.0, 20.0);
        assert!(!cursor.reserve(500.0));
        cursor.advance(1.0);
        assert!(cursor.reserve(500.0));
        assert!(!cursor.reserve(500.0));
        assert_eq!(cursor.page_index(), 1);
    }
}
