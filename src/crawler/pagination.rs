//! Pagination URL generation
//!
//! Expands a URL template and an inclusive page range into a lazy,
//! restartable sequence of concrete page URLs. No I/O happens here.

use std::ops::RangeInclusive;
use url::Url;

/// Token replaced by the page number in a pagination template
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// One generated page: its number and concrete URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrl {
    pub page: i64,
    pub url: String,
}

/// Lazy sequence of page URLs, ascending by page number
///
/// Cloning yields an independent iterator starting from the same position,
/// so a fresh clone of a new sequence restarts it.
#[derive(Debug, Clone)]
pub struct PageUrls {
    template: String,
    pages: RangeInclusive<i64>,
}

impl PageUrls {
    /// Number of URLs not yet yielded
    pub fn len(&self) -> usize {
        self.pages.size_hint().0
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// The URLs alone, in order
    pub fn urls(self) -> impl Iterator<Item = String> {
        self.map(|page| page.url)
    }
}

impl Iterator for PageUrls {
    type Item = PageUrl;

    fn next(&mut self) -> Option<PageUrl> {
        let page = self.pages.next()?;
        Some(PageUrl {
            page,
            url: self.template.replace(PAGE_PLACEHOLDER, &page.to_string()),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pages.size_hint()
    }
}

/// Generates `end - start + 1` URLs by substituting each page in `start..=end`
///
/// `start > end` yields an empty sequence.
///
/// # Example
///
/// ```
/// use sumi_sift::crawler::generate;
///
/// let urls: Vec<String> = generate("site/p={page}", 1, 3).urls().collect();
/// assert_eq!(urls, vec!["site/p=1", "site/p=2", "site/p=3"]);
/// ```
pub fn generate(template: &str, start: i64, end: i64) -> PageUrls {
    PageUrls {
        template: template.to_string(),
        pages: start..=end,
    }
}

/// Resolves a generated URL, falling back to joining it onto `base` when it is relative
pub fn resolve_page_url(base: &Url, raw: &str) -> Result<Url, url::ParseError> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw),
        Err(e) => Err(e),
    }
}
