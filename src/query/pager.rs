//! Bookmark-based pagination over ledger range scans.

use crate::error::{ContractError, Result};
use crate::ledger::{KeyValue, TxStub};
use crate::types::Bookmark;
use serde::{Deserialize, Serialize};

/// Default upper bound on a requested page size.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// One page of a range query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<T> {
    pub records: Vec<T>,
    /// Records kept after filtering.
    pub records_count: u32,
    /// Resume cursor; empty once the range is exhausted.
    pub bookmark: Bookmark,
    /// Keys scanned to build this page.
    pub fetched_records_count: u32,
}

impl<T> QueryResponse<T> {
    pub fn is_last(&self) -> bool {
        self.bookmark.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResponse<U> {
        QueryResponse {
            records: self.records.into_iter().map(f).collect(),
            records_count: self.records_count,
            bookmark: self.bookmark,
            fetched_records_count: self.fetched_records_count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page_size: u32,
    #[serde(default)]
    pub bookmark: Bookmark,
}

impl PageRequest {
    /// First page of a range.
    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            bookmark: Bookmark::start(),
        }
    }

    /// Page resuming at `bookmark`.
    pub fn after(page_size: u32, bookmark: Bookmark) -> Self {
        Self { page_size, bookmark }
    }
}

/// Runs paged range scans inside a transaction.
#[derive(Clone, Copy, Debug)]
pub struct QueryPager {
    max_page_size: u32,
}

impl QueryPager {
    pub fn new(max_page_size: u32) -> Self {
        Self {
            max_page_size: max_page_size.max(1),
        }
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Reject a zero page size, clamp anything above the maximum.
    pub fn effective_page_size(&self, requested: u32) -> Result<u32> {
        if requested == 0 {
            return Err(ContractError::InvalidArgument("pageSize must be at least 1".into()));
        }
        Ok(requested.min(self.max_page_size))
    }

    /// Scan the whole key space. `select` maps each scanned entry to a record,
    /// or `None` to leave it out of the page.
    pub fn page<T, F>(&self, stub: &TxStub<'_>, request: &PageRequest, select: F) -> Result<QueryResponse<T>>
    where
        F: FnMut(KeyValue) -> Result<Option<T>>,
    {
        self.page_range(stub, "", "", request, select)
    }

    /// Scan `[start, end)`; an empty `end` is unbounded.
    pub fn page_range<T, F>(
        &self,
        stub: &TxStub<'_>,
        start: &str,
        end: &str,
        request: &PageRequest,
        mut select: F,
    ) -> Result<QueryResponse<T>>
    where
        F: FnMut(KeyValue) -> Result<Option<T>>,
    {
        let page_size = self.effective_page_size(request.page_size)?;
        let page = stub.get_state_by_range_with_pagination(start, end, page_size, &request.bookmark)?;

        let mut records = Vec::with_capacity(page.entries.len());
        for entry in page.entries {
            if let Some(record) = select(entry)? {
                records.push(record);
            }
        }

        Ok(QueryResponse {
            records_count: records.len() as u32,
            records,
            bookmark: page.bookmark,
            fetched_records_count: page.fetched_records_count,
        })
    }
}

impl Default for QueryPager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGE_SIZE)
    }
}

/// Walks a paged query from the start of its range until the ledger
/// returns an empty bookmark. Stops after the first error.
pub struct Pages<T, F>
where
    F: FnMut(&PageRequest) -> Result<QueryResponse<T>>,
{
    fetch: F,
    next: Option<PageRequest>,
}

impl<T, F> Pages<T, F>
where
    F: FnMut(&PageRequest) -> Result<QueryResponse<T>>,
{
    pub fn new(page_size: u32, fetch: F) -> Self {
        Self {
            fetch,
            next: Some(PageRequest::first(page_size)),
        }
    }
}

impl<T, F> Iterator for Pages<T, F>
where
    F: FnMut(&PageRequest) -> Result<QueryResponse<T>>,
{
    type Item = Result<QueryResponse<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let request = self.next.take()?;
        match (self.fetch)(&request) {
            Ok(page) => {
                if !page.is_last() {
                    self.next = Some(PageRequest::after(request.page_size, page.bookmark.clone()));
                }
                Some(Ok(page))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
