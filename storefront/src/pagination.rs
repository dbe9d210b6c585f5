// storefront/src/pagination.rs

//! 1-based page requests and result pages.

use serde::Serialize;

use crate::errors::{AppError, Result};

pub const PRODUCTS_PER_PAGE: i64 = 12;
pub const ORDERS_PER_PAGE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page: i64,
  per_page: i64,
}

impl PageRequest {
  /// A missing page means the first one. Pages below 1, or so far out that
  /// their offset does not fit an `i64`, do not exist.
  pub fn new(page: Option<i64>, per_page: i64) -> Result<Self> {
    let page = page.unwrap_or(1);
    let per_page = per_page.max(1);
    if page < 1 || (page - 1).checked_mul(per_page).is_none() {
      return Err(AppError::NotFound(format!("Page {} does not exist.", page)));
    }
    Ok(Self { page, per_page })
  }

  pub fn page(&self) -> i64 {
    self.page
  }

  pub fn limit(&self) -> i64 {
    self.per_page
  }

  pub fn offset(&self) -> i64 {
    (self.page - 1) * self.per_page
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page: i64,
  pub per_page: i64,
  pub total: i64,
  pub pages: i64,
}

impl<T> Page<T> {
  /// An empty page is only valid as the first page.
  pub fn new(items: Vec<T>, req: PageRequest, total: i64) -> Result<Self> {
    if items.is_empty() && req.page != 1 {
      return Err(AppError::NotFound(format!("Page {} does not exist.", req.page)));
    }
    let pages = if total == 0 { 0 } else { (total + req.per_page - 1) / req.per_page };
    Ok(Self {
      items,
      page: req.page,
      per_page: req.per_page,
      total,
      pages,
    })
  }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items: self.items.into_iter().map(f).collect(),
      page: self.page,
      per_page: self.per_page,
      total: self.total,
      pages: self.pages,
    }
  }

  pub fn has_next(&self) -> bool {
    self.page < self.pages
  }
}
