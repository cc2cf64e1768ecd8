// ============================================================================
// Pager
// ============================================================================
//
// Slices an adapter's results into fixed-size pages. Pages are 1-based and
// there is always at least one page, even over an empty result set.
//
// ============================================================================

pub mod adapter;

pub use adapter::{PagerAdapter, QueryAdapter, VecAdapter};

use crate::core::{ManagerError, Result};
use crate::record::Record;

pub const DEFAULT_MAX_PER_PAGE: usize = 10;

pub struct Pager {
    adapter: Box<dyn PagerAdapter>,
    max_per_page: usize,
    current_page: usize,
    nb_results: Option<usize>,
    current_page_results: Option<Vec<Record>>,
}

impl Pager {
    pub fn new(adapter: impl PagerAdapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
            max_per_page: DEFAULT_MAX_PER_PAGE,
            current_page: 1,
            nb_results: None,
            current_page_results: None,
        }
    }

    pub fn max_per_page(&self) -> usize {
        self.max_per_page
    }

    pub fn set_max_per_page(&mut self, max_per_page: usize) -> Result<&mut Self> {
        if max_per_page == 0 {
            return Err(ManagerError::Pagination(
                "Max per page must be greater than 0".to_string(),
            ));
        }
        self.max_per_page = max_per_page;
        self.current_page_results = None;
        Ok(self)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Moves to `page`, which must lie within `1..=nb_pages`.
    pub async fn set_current_page(&mut self, page: usize) -> Result<&mut Self> {
        if page < 1 {
            return Err(ManagerError::Pagination(format!(
                "Current page {} is less than 1",
                page
            )));
        }
        let nb_pages = self.nb_pages().await?;
        if page > nb_pages {
            return Err(ManagerError::Pagination(format!(
                "Page {} is out of range, last page is {}",
                page, nb_pages
            )));
        }
        self.current_page = page;
        self.current_page_results = None;
        Ok(self)
    }

    pub async fn nb_results(&mut self) -> Result<usize> {
        if let Some(count) = self.nb_results {
            return Ok(count);
        }
        let count = self.adapter.nb_results().await?;
        self.nb_results = Some(count);
        Ok(count)
    }

    pub async fn nb_pages(&mut self) -> Result<usize> {
        let results = self.nb_results().await?;
        Ok(results.div_ceil(self.max_per_page).max(1))
    }

    pub async fn have_to_paginate(&mut self) -> Result<bool> {
        Ok(self.nb_results().await? > self.max_per_page)
    }

    pub async fn current_page_results(&mut self) -> Result<&[Record]> {
        if self.current_page_results.is_none() {
            let offset = (self.current_page - 1) * self.max_per_page;
            let records = self.adapter.slice(offset, self.max_per_page).await?;
            self.current_page_results = Some(records);
        }
        Ok(self.current_page_results.as_deref().unwrap_or_default())
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    pub fn previous_page(&self) -> Result<usize> {
        if !self.has_previous_page() {
            return Err(ManagerError::Pagination(
                "There is no previous page".to_string(),
            ));
        }
        Ok(self.current_page - 1)
    }

    pub async fn has_next_page(&mut self) -> Result<bool> {
        Ok(self.current_page < self.nb_pages().await?)
    }

    pub async fn next_page(&mut self) -> Result<usize> {
        if !self.has_next_page().await? {
            return Err(ManagerError::Pagination("There is no next page".to_string()));
        }
        Ok(self.current_page + 1)
    }

    /// 1-based position of the first record on the current page, 0 when empty.
    pub async fn current_page_offset_start(&mut self) -> Result<usize> {
        if self.nb_results().await? == 0 {
            return Ok(0);
        }
        Ok((self.current_page - 1) * self.max_per_page + 1)
    }

    pub async fn current_page_offset_end(&mut self) -> Result<usize> {
        let total = self.nb_results().await?;
        if total == 0 {
            return Ok(0);
        }
        Ok((self.current_page * self.max_per_page).min(total))
    }
}

impl std::fmt::Debug for Pager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("max_per_page", &self.max_per_page)
            .field("current_page", &self.current_page)
            .field("nb_results", &self.nb_results)
            .finish()
    }
}
