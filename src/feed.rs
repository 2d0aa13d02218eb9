use crate::defs::{FEED_TICK_PERIOD_MSEC, VOLATILITY};
use crate::errors::FeedError;
use crate::quote_generator::QuoteGenerator;
use crate::sim::SimulatedProvider;
use crate::stock_quote::StockQuote;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

/// Background writer that plays the trading platform for a [`SimulatedProvider`].
///
/// Every tick it moves all quotes with the [`QuoteGenerator`] and publishes
/// each subscribed (item, topic) into the engine, independently of any
/// reader.
#[derive(Debug)]
pub struct QuoteFeed {
    engine: Arc<SimulatedProvider>,
    quotes: Mutex<HashMap<String, StockQuote>>,
    generator: QuoteGenerator,
    tick: Duration,

    /// Background thread
    bg_thread: Mutex<Option<JoinHandle<()>>>,
    /// Graceful shutdown flag
    shutdown_flag: Arc<AtomicBool>,
}

impl QuoteFeed {
    /// Creates a feed for `tickers` writing into `engine`.
    pub fn new(engine: Arc<SimulatedProvider>, tickers: &[String]) -> Result<Self, FeedError> {
        let quotes = tickers
            .iter()
            .map(|t| (t.clone(), StockQuote::new(t)))
            .collect::<HashMap<_, _>>();

        let generator = QuoteGenerator::new(VOLATILITY).map_err(|e| {
            FeedError::InitializationError(format!("Failed to create Quote Generator: {}", e))
        })?;

        log::info!(
            "QuoteFeed initialized with {} tickers, volatility: {}",
            quotes.len(),
            VOLATILITY
        );

        Ok(Self {
            engine,
            quotes: Mutex::new(quotes),
            generator,
            tick: Duration::from_millis(FEED_TICK_PERIOD_MSEC),
            bg_thread: Mutex::new(None),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Overrides the tick period.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Runs the update loop on a background thread.
    ///
    /// The thread only holds a weak handle, so dropping the last `Arc`
    /// stops it as well as [`shutdown`](Self::shutdown) does.
    pub fn start(self: &Arc<Self>) -> Result<(), FeedError> {
        let mut guard = self
            .bg_thread
            .lock()
            .map_err(|_| FeedError::InitializationError("Failed to lock feed thread".into()))?;

        if guard.is_some() {
            log::warn!("QuoteFeed background thread already running");
            return Ok(());
        }

        let feed: Weak<Self> = Arc::downgrade(self);
        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        let tick = self.tick;

        log::info!(
            "Starting QuoteFeed background thread with tick period: {:?}",
            self.tick
        );

        let handle = std::thread::spawn(move || {
            log::info!("QuoteFeed background thread started");
            while !shutdown_flag.load(Ordering::SeqCst) {
                std::thread::sleep(tick);

                let Some(feed) = feed.upgrade() else {
                    break;
                };
                if shutdown_flag.load(Ordering::SeqCst) {
                    break;
                }
                match feed.tick_once() {
                    Ok(n) => log::trace!("Published {} stream updates", n),
                    Err(e) => log::error!("Failed to update quotes: {}", e),
                }
            }
            log::info!("QuoteFeed background thread stopped");
        });

        *guard = Some(handle);

        Ok(())
    }

    /// Signals the feed to stop and joins the thread.
    pub fn shutdown(&self) {
        log::info!("Initiating QuoteFeed shutdown");
        self.shutdown_flag.store(true, Ordering::SeqCst);

        let handle = match self.bg_thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            // The thread may drop the last handle itself and land here.
            if handle.thread().id() == std::thread::current().id() {
                log::debug!("QuoteFeed dropped on its own thread, not joining");
                return;
            }
            log::debug!("Waiting for QuoteFeed background thread to finish");
            handle.join().ok();
            log::info!("QuoteFeed background thread joined successfully");
        } else {
            log::debug!("No QuoteFeed background thread to shut down");
        }
    }

    /// Moves every quote once and publishes all subscribed topics.
    ///
    /// Returns the number of stream writes.
    pub fn tick_once(&self) -> Result<usize, FeedError> {
        let mut quotes = self
            .quotes
            .lock()
            .map_err(|_| FeedError::UpdateQuoteError("Failed to lock quotes".into()))?;

        self.generator
            .update_quotes(quotes.values_mut())
            .map_err(|e| FeedError::UpdateQuoteError(e.to_string()))?;

        let mut written = 0;
        for (item, topic) in self.engine.subscriptions() {
            let Some(value) = quotes.get(&item).and_then(|q| q.topic_value(&topic)) else {
                continue;
            };
            let ts = quotes[&item].timestamp;
            written += self.engine.publish_at(&item, &topic, value, ts);
        }
        Ok(written)
    }
}

impl Drop for QuoteFeed {
    fn drop(&mut self) {
        log::debug!("QuoteFeed drop called, initiating shutdown");
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{RemoteProvider, StreamRef};
    use std::thread;

    fn engine_with_stream() -> (Arc<SimulatedProvider>, String) {
        let engine = Arc::new(SimulatedProvider::new());
        let block = engine.create_block(50, true, 100).unwrap();
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        engine.add_topic(&block, "VOLUME").unwrap();
        (engine, block)
    }

    #[test]
    fn test_tick_publishes_subscribed_topics() {
        let (engine, block) = engine_with_stream();
        let feed = QuoteFeed::new(engine.clone(), &["SPY".into(), "QQQ".into()]).unwrap();

        assert_eq!(feed.tick_once().unwrap(), 2);
        assert_eq!(feed.tick_once().unwrap(), 2);

        let stream = StreamRef::new(&block, "SPY", "VOLUME");
        assert_eq!(engine.stream_occupancy(stream).unwrap(), 2);
    }

    #[test]
    fn test_unwatched_items_are_skipped() {
        let (engine, _block) = engine_with_stream();
        let feed = QuoteFeed::new(engine, &["QQQ".into()]).unwrap();
        assert_eq!(feed.tick_once().unwrap(), 0);
    }

    #[test]
    fn test_background_thread_writes_and_stops() {
        let (engine, block) = engine_with_stream();
        let feed = Arc::new(
            QuoteFeed::new(engine.clone(), &["SPY".into()])
                .unwrap()
                .with_tick(Duration::from_millis(5)),
        );

        feed.start().unwrap();
        feed.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        feed.shutdown();

        let stream = StreamRef::new(&block, "SPY", "LAST");
        let occupancy = engine.stream_occupancy(stream).unwrap();
        assert!(occupancy > 0);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.stream_occupancy(stream).unwrap(), occupancy);
    }

    #[test]
    fn test_dropping_last_handle_stops_thread() {
        let (engine, block) = engine_with_stream();
        let feed = Arc::new(
            QuoteFeed::new(engine.clone(), &["SPY".into()])
                .unwrap()
                .with_tick(Duration::from_millis(5)),
        );

        feed.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        drop(feed);
        thread::sleep(Duration::from_millis(20));

        let stream = StreamRef::new(&block, "SPY", "LAST");
        let occupancy = engine.stream_occupancy(stream).unwrap();
        assert!(occupancy > 0);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.stream_occupancy(stream).unwrap(), occupancy);
    }
}
