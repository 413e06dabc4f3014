use super::{VectorRecord, VectorStore};
use crate::error::BackendError;
use log::debug;

/// Page-at-a-time walk over every vector in a store.
///
/// The walk ends when the store reports no further cursor, or repeats the
/// cursor it was just given.
pub struct VectorScan<'a> {
    store: &'a dyn VectorStore,
    page_size: usize,
    cursor: String,
    finished: bool,
    pages: usize,
}

impl<'a> VectorScan<'a> {
    pub fn new(store: &'a dyn VectorStore, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            cursor: String::new(),
            finished: false,
            pages: 0,
        }
    }

    /// Fetch the next page, or `None` once the walk is complete.
    pub async fn next_page(&mut self) -> Result<Option<Vec<VectorRecord>>, BackendError> {
        if self.finished {
            return Ok(None);
        }
        let page = self.store.range(&self.cursor, self.page_size).await?;
        self.pages += 1;
        debug!(
            "scanned vector page (page={}, records={})",
            self.pages,
            page.records.len()
        );
        match page.next_cursor {
            Some(next) if !next.is_empty() && next != self.cursor => self.cursor = next,
            _ => self.finished = true,
        }
        if page.records.is_empty() && self.finished {
            return Ok(None);
        }
        Ok(Some(page.records))
    }

    /// Pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::VectorScan;
    use crate::error::BackendError;
    use crate::vector::{
        VectorMatch, VectorPage, VectorQuery, VectorRecord, VectorStats, VectorStore,
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Store whose `range` hands out fixed pages keyed by cursor.
    struct PagedStore {
        pages: Vec<(&'static str, Vec<&'static str>, Option<&'static str>)>,
    }

    fn record(id: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector: Vec::new(),
            metadata: Default::default(),
        }
    }

    #[async_trait]
    impl VectorStore for PagedStore {
        async fn upsert(&self, _record: VectorRecord) -> Result<(), BackendError> {
            Ok(())
        }

        async fn query(&self, _query: &VectorQuery) -> Result<Vec<VectorMatch>, BackendError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _id: &str) -> Result<bool, BackendError> {
            Ok(false)
        }

        async fn fetch(&self, _id: &str) -> Result<Option<VectorRecord>, BackendError> {
            Ok(None)
        }

        async fn range(&self, cursor: &str, _limit: usize) -> Result<VectorPage, BackendError> {
            let (_, ids, next) = self
                .pages
                .iter()
                .find(|(at, _, _)| *at == cursor)
                .ok_or_else(|| BackendError::InvalidInput(format!("unknown cursor {cursor}")))?;
            Ok(VectorPage {
                records: ids.iter().map(|id| record(id)).collect(),
                next_cursor: next.map(str::to_string),
            })
        }

        async fn stats(&self) -> Result<VectorStats, BackendError> {
            Err(BackendError::Remote("unused".to_string()))
        }
    }

    async fn collect(scan: &mut VectorScan<'_>) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(page) = scan.next_page().await.expect("page") {
            ids.extend(page.into_iter().map(|record| record.id));
        }
        ids
    }

    #[tokio::test]
    async fn walks_pages_until_cursor_is_exhausted() {
        let store = PagedStore {
            pages: vec![
                ("", vec!["a", "b"], Some("2")),
                ("2", vec!["c"], Some("")),
            ],
        };
        let mut scan = VectorScan::new(&store, 2);
        assert_eq!(collect(&mut scan).await, vec!["a", "b", "c"]);
        assert_eq!(scan.pages(), 2);
    }

    #[tokio::test]
    async fn repeated_cursor_ends_the_walk() {
        let store = PagedStore {
            pages: vec![("", vec!["a"], Some("1")), ("1", vec!["b"], Some("1"))],
        };
        let mut scan = VectorScan::new(&store, 1);
        assert_eq!(collect(&mut scan).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_store_yields_no_pages() {
        let store = PagedStore {
            pages: vec![("", Vec::new(), None)],
        };
        let mut scan = VectorScan::new(&store, 10);
        assert!(scan.next_page().await.expect("page").is_none());
    }
}
