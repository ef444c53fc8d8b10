//! Full-table export in uid order.
//!
//! Pages are read straight from the store with keyset pagination; the cache
//! is never consulted or populated. A stream can be stopped at any point and
//! resumed later from [`ExportStream::cursor`].

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::Stream;
use futures_util::stream;

use crate::Error;
use crate::record::{CompanyRecord, RecordPage};
use crate::store::RecordStore;

/// Lazy, restartable scan over every stored record.
pub struct ExportStream {
    store: Arc<dyn RecordStore>,
    page_size: usize,
    cursor: Option<String>,
    exhausted: bool,
}

impl ExportStream {
    pub fn new(store: Arc<dyn RecordStore>, page_size: usize) -> Self {
        Self { store, page_size: page_size.max(1), cursor: None, exhausted: false }
    }

    /// Continue an earlier export from the cursor it reported.
    pub fn resume(store: Arc<dyn RecordStore>, page_size: usize, cursor: impl Into<String>) -> Self {
        Self { cursor: Some(cursor.into()), ..Self::new(store, page_size) }
    }

    /// Position after the last delivered page; `None` before the first page.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next page, or `None` once every record has been delivered.
    ///
    /// A failed read leaves the position unchanged, so the call can be
    /// retried.
    pub async fn next_page(&mut self) -> Result<Option<RecordPage>, Error> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self.store.scan(self.cursor.as_deref(), self.page_size).await?;
        match &page.next_cursor {
            Some(next) => self.cursor = Some(next.clone()),
            None => self.exhausted = true,
        }
        tracing::debug!(records = page.records.len(), exhausted = self.exhausted, "export page");

        if page.is_empty() { Ok(None) } else { Ok(Some(page)) }
    }

    /// Flatten the remaining pages into a stream of records.
    pub fn into_records(self) -> impl Stream<Item = Result<CompanyRecord, Error>> + Send {
        stream::try_unfold((self, VecDeque::new()), |(mut export, mut buffered)| async move {
            loop {
                if let Some(record) = buffered.pop_front() {
                    return Ok(Some((record, (export, buffered))));
                }
                match export.next_page().await {
                    Ok(Some(page)) => buffered.extend(page.records),
                    Ok(None) => return Ok(None),
                    Err(e) => return Err(e),
                }
            }
        })
    }
}
