//! Background search worker for interactive front ends.
//!
//! One thread owns the catalog and the query parser. The caller submits
//! query strings and polls for results; only the newest result is ever
//! applied, so a burst of keystrokes never shows stale hits.
//!
//! The catalog travels with the first request after it is set and is kept by
//! the worker from then on.

use crate::catalog::Catalog;
use crate::error::{CadenzaError, Result};
use crate::expr::DEFAULT_RECENT_MONTHS;
use crate::search::{Dialect, QueryParser, SearchOptions};
use crate::types::SearchHits;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

struct SearchRequest {
    id: u64,
    query: String,
    dialect: Dialect,
    catalog: Option<Arc<Catalog>>,
}

/// A finished search.
#[derive(Debug, Clone)]
pub struct SearchDone {
    pub id: u64,
    pub hits: SearchHits,
    pub took: Duration,
}

/// Settings fixed for the life of a worker.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub dialect: Dialect,
    pub recent_months: u32,
    pub options: SearchOptions,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            dialect: Dialect::Auto,
            recent_months: DEFAULT_RECENT_MONTHS,
            options: SearchOptions::default(),
        }
    }
}

pub struct SearchWorker {
    dialect: Dialect,
    req_tx: Option<Sender<SearchRequest>>,
    done_rx: Receiver<SearchDone>,
    handle: Option<JoinHandle<()>>,
    pending_catalog: Option<Arc<Catalog>>,
    last_request_id: u64,
    latest_applied_id: u64,
}

impl SearchWorker {
    /// Spawn the worker thread with a catalog to search.
    pub fn spawn(catalog: Arc<Catalog>, settings: WorkerSettings) -> Result<Self> {
        let mut worker = SearchWorker::new(settings)?;
        worker.set_catalog(catalog);
        Ok(worker)
    }

    /// Spawn the worker thread without a catalog. Searches come back empty
    /// until [`set_catalog`](Self::set_catalog) is called.
    pub fn new(settings: WorkerSettings) -> Result<Self> {
        let (req_tx, req_rx) = unbounded::<SearchRequest>();
        let (done_tx, done_rx) = unbounded::<SearchDone>();

        let handle = thread::Builder::new()
            .name("cadenza-search".to_string())
            .spawn(move || run(req_rx, done_tx, settings))?;

        Ok(SearchWorker {
            dialect: settings.dialect,
            req_tx: Some(req_tx),
            done_rx,
            handle: Some(handle),
            pending_catalog: None,
            last_request_id: 0,
            latest_applied_id: 0,
        })
    }

    /// Replace the catalog; it is handed over with the next request.
    pub fn set_catalog(&mut self, catalog: Arc<Catalog>) {
        self.pending_catalog = Some(catalog);
    }

    /// Queue a search in the worker's default dialect.
    pub fn submit(&mut self, query: &str) -> Result<u64> {
        self.submit_as(query, self.dialect)
    }

    /// Queue a search in an explicit dialect, returning its request id.
    pub fn submit_as(&mut self, query: &str, dialect: Dialect) -> Result<u64> {
        let tx = self.req_tx.as_ref().ok_or(CadenzaError::WorkerDisconnected)?;

        let id = self.last_request_id.wrapping_add(1);
        let request = SearchRequest {
            id,
            query: query.to_string(),
            dialect,
            catalog: self.pending_catalog.take(),
        };

        if let Err(failed) = tx.send(request) {
            self.pending_catalog = failed.0.catalog;
            return Err(CadenzaError::WorkerDisconnected);
        }

        self.last_request_id = id;
        trace!(id, query, "Submitted search");
        Ok(id)
    }

    /// Drain finished searches and return the one answering the most recent
    /// request, if it has arrived. Results for superseded requests are dropped.
    pub fn poll(&mut self) -> Option<SearchDone> {
        let mut latest: Option<SearchDone> = None;
        while let Ok(done) = self.done_rx.try_recv() {
            if done.id == self.last_request_id {
                self.latest_applied_id = done.id;
                latest = Some(done);
            } else {
                trace!(id = done.id, "Discarding stale search result");
            }
        }
        latest
    }

    /// Block until the result for the most recent request arrives.
    ///
    /// Returns `Ok(None)` on timeout. Older results are discarded.
    pub fn wait_latest(&mut self, timeout: Duration) -> Result<Option<SearchDone>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(remaining) {
                Ok(done) if done.id == self.last_request_id => {
                    self.latest_applied_id = done.id;
                    return Ok(Some(done));
                }
                Ok(done) => {
                    trace!(id = done.id, "Discarding stale search result");
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CadenzaError::WorkerDisconnected)
                }
            }
        }
    }

    /// Id of the most recently submitted request.
    pub fn last_request_id(&self) -> u64 {
        self.last_request_id
    }

    /// Whether a submitted request has not been answered yet.
    pub fn in_flight(&self) -> bool {
        self.latest_applied_id < self.last_request_id
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(requests: Receiver<SearchRequest>, done_tx: Sender<SearchDone>, settings: WorkerSettings) {
    let parser = QueryParser::new(settings.dialect).with_recent_months(settings.recent_months);
    let mut catalog: Option<Arc<Catalog>> = None;

    while let Ok(request) = requests.recv() {
        if let Some(fresh) = request.catalog {
            debug!(records = fresh.len(), "Search worker received catalog");
            catalog = Some(fresh);
        }

        let start = Instant::now();
        let hits = match catalog.as_deref() {
            Some(catalog) => {
                let query = parser.parse_as(&request.query, request.dialect);
                catalog.search(&query, settings.options)
            }
            None => SearchHits::new(),
        };
        let took = start.elapsed();
        debug!(id = request.id, hits = hits.len(), ?took, "Search finished");

        if done_tx
            .send(SearchDone {
                id: request.id,
                hits,
                took,
            })
            .is_err()
        {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CatalogRecord, Field};

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::from_records(vec![
            CatalogRecord::new("Prince/Purple Rain/1-01 Let's Go Crazy.flac")
                .with(Field::Artist, "Prince"),
            CatalogRecord::new("Björk/Homogenic/1-01 Hunter.mp3").with(Field::Artist, "Björk"),
        ]))
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_submit_and_wait() {
        let mut worker = SearchWorker::spawn(catalog(), WorkerSettings::default()).unwrap();
        let id = worker.submit("artist:bjork").unwrap();
        let done = worker.wait_latest(WAIT).unwrap().unwrap();
        assert_eq!(done.id, id);
        assert_eq!(done.hits, vec![1]);
        assert!(!worker.in_flight());
    }

    #[test]
    fn test_last_request_wins() {
        let mut worker = SearchWorker::spawn(catalog(), WorkerSettings::default()).unwrap();
        worker.submit("p").unwrap();
        worker.submit("pr").unwrap();
        let last = worker.submit("(artist ^bj)").unwrap();
        let done = worker.wait_latest(WAIT).unwrap().unwrap();
        assert_eq!(done.id, last);
        assert_eq!(done.hits, vec![1]);
        assert!(worker.poll().is_none());
    }

    #[test]
    fn test_poll_returns_newest() {
        let mut worker = SearchWorker::spawn(catalog(), WorkerSettings::default()).unwrap();
        worker.submit("prince").unwrap();
        let last = worker.submit("").unwrap();

        let deadline = Instant::now() + WAIT;
        let mut applied = None;
        while Instant::now() < deadline {
            if let Some(done) = worker.poll() {
                applied = Some(done.id);
                if done.id == last {
                    assert_eq!(done.hits, vec![0, 1]);
                    break;
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(applied, Some(last));
    }

    #[test]
    fn test_set_catalog() {
        let mut worker = SearchWorker::spawn(catalog(), WorkerSettings::default()).unwrap();
        worker.submit("").unwrap();
        assert_eq!(worker.wait_latest(WAIT).unwrap().unwrap().hits.len(), 2);

        worker.set_catalog(Arc::new(Catalog::new()));
        worker.submit("").unwrap();
        assert!(worker.wait_latest(WAIT).unwrap().unwrap().hits.is_empty());
    }

    #[test]
    fn test_no_catalog_yields_nothing() {
        let mut worker = SearchWorker::new(WorkerSettings::default()).unwrap();
        worker.submit("").unwrap();
        assert!(worker.wait_latest(WAIT).unwrap().unwrap().hits.is_empty());

        worker.set_catalog(catalog());
        worker.submit("").unwrap();
        assert_eq!(worker.wait_latest(WAIT).unwrap().unwrap().hits, vec![0, 1]);
    }

    #[test]
    fn test_poll_drops_superseded_result() {
        let mut worker = SearchWorker::spawn(catalog(), WorkerSettings::default()).unwrap();
        let first = worker.submit("").unwrap();

        let deadline = Instant::now() + WAIT;
        while worker.done_rx.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!worker.done_rx.is_empty(), "first search never finished");

        let second = worker.submit("artist:bjork").unwrap();
        assert!(second > first);
        if let Some(done) = worker.poll() {
            assert_eq!(done.id, second);
        }

        let done = match worker.poll() {
            Some(done) => done,
            None => worker.wait_latest(WAIT).unwrap().unwrap(),
        };
        assert_eq!(done.id, second);
        assert_eq!(done.hits, vec![1]);
    }

    #[test]
    fn test_parallel_scan_keeps_order() {
        let records = (0..64)
            .map(|i| CatalogRecord::new(format!("Artist/Album/1-{:02} Song.mp3", i)))
            .collect();
        let settings = WorkerSettings {
            options: SearchOptions {
                parallel: true,
                parallel_threshold: 8,
            },
            ..WorkerSettings::default()
        };
        let mut worker = SearchWorker::spawn(Arc::new(Catalog::from_records(records)), settings).unwrap();
        worker.submit("song").unwrap();
        let hits = worker.wait_latest(WAIT).unwrap().unwrap().hits;
        assert_eq!(hits, (0..64).collect::<Vec<_>>());
    }
}
