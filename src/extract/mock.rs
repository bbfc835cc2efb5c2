//! Scripted page source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::extract::{ControlProbe, PageSource, PageSourceError};

/// A page source that renders a synthetic feed of `rg_meta` results.
///
/// Each `request_more` renders one more page. Once `total` items have been
/// rendered, further pages are empty (or, in repeating mode, re-render the
/// same items), which lets tests exercise the stall detection.
#[derive(Debug, Clone)]
pub struct ScriptedPageSource {
    total: usize,
    page_size: usize,
    repeat: bool,
    show_more: bool,
    fail_after: Option<usize>,
    pages_rendered: usize,
    requests: usize,
    disposed: Arc<AtomicBool>,
}

impl ScriptedPageSource {
    /// Feed holding `total` distinct items, `page_size` rendered per page
    pub fn with_total(total: usize, page_size: usize) -> Self {
        Self {
            total,
            page_size: page_size.max(1),
            repeat: false,
            show_more: false,
            fail_after: None,
            pages_rendered: 1,
            requests: 0,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Feed whose every page re-renders the same `count` items
    pub fn repeating(count: usize) -> Self {
        Self {
            repeat: true,
            ..Self::with_total(count, count)
        }
    }

    /// Report a "show more" control on every probe
    pub fn with_show_more(mut self, present: bool) -> Self {
        self.show_more = present;
        self
    }

    /// Become unavailable after `requests` successful `request_more` calls
    pub fn fail_after_requests(mut self, requests: usize) -> Self {
        self.fail_after = Some(requests);
        self
    }

    /// Locator of the `index`-th synthetic item
    pub fn locator(index: usize) -> String {
        format!("https://images.example/{}.jpg", index)
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Shared disposal flag, still readable after the source has been moved
    pub fn disposed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.disposed)
    }

    fn page_items(&self, page: usize) -> std::ops::Range<usize> {
        if self.repeat {
            return 0..self.total;
        }
        let start = (page * self.page_size).min(self.total);
        let end = ((page + 1) * self.page_size).min(self.total);
        start..end
    }
}

#[async_trait]
impl PageSource for ScriptedPageSource {
    async fn current_markup(&mut self) -> Result<String, PageSourceError> {
        if self.is_disposed() {
            return Err(PageSourceError::Unavailable("disposed".to_string()));
        }

        let mut markup = String::from("<html><body>");
        for page in 0..self.pages_rendered {
            for index in self.page_items(page) {
                markup.push_str(&format!(
                    r#"<div class="rg_meta">{{"ou":"{}","ity":"jpg"}}</div>"#,
                    Self::locator(index)
                ));
            }
        }
        markup.push_str("</body></html>");
        Ok(markup)
    }

    async fn request_more(&mut self) -> Result<(), PageSourceError> {
        if let Some(limit) = self.fail_after {
            if self.requests >= limit {
                return Err(PageSourceError::Unavailable(
                    "renderer crashed".to_string(),
                ));
            }
        }
        self.requests += 1;
        self.pages_rendered += 1;
        Ok(())
    }

    async fn advance_control(&mut self) -> Result<ControlProbe, PageSourceError> {
        Ok(if self.show_more {
            ControlProbe::Activated
        } else {
            ControlProbe::Absent
        })
    }

    async fn dispose(&mut self) -> Result<(), PageSourceError> {
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
