use crate::config::BlockConfig;
use crate::errors::{ErrorCode, StreamError};
use crate::index::{self, Resolved};
use crate::membership::{Member, Membership};
use crate::provider::{RemoteProvider, StreamRef};
use crate::value::{DataPoint, DataType, Sample, StreamValue};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// What a marker read does when data behind the marker was overwritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossPolicy {
    /// Return [`StreamError::DirtyMarker`].
    Fail,
    /// Return whatever is still available; gaps are accepted.
    Ignore,
}

/// Mutable part of a block, guarded by one lock.
#[derive(Debug)]
struct BlockState {
    size: usize,
    members: Membership,
}

/// Client-side accessor for one engine block.
///
/// A block holds one circular stream per (item, topic) pair. The accessor
/// validates names against cached membership, normalizes indices against
/// the cached capacity and delegates the data transfer to the injected
/// [`RemoteProvider`].
///
/// All operations are blocking. After [`close`](Self::close) (or drop)
/// every operation returns [`StreamError::Closed`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use quote_streams::block::Block;
/// use quote_streams::config::BlockConfig;
/// use quote_streams::sim::SimulatedProvider;
/// use quote_streams::value::Value;
///
/// let engine = Arc::new(SimulatedProvider::new());
/// let block = Block::create(engine.clone(), BlockConfig::with_size(100)).unwrap();
/// block.add_topic("LAST").unwrap();
/// block.add_item("SPY").unwrap();
///
/// engine.publish("SPY", "LAST", Value::Double(501.25));
/// let last = block.get::<f64>("SPY", "LAST", 0).unwrap();
/// assert_eq!(last.value, 501.25);
/// ```
pub struct Block<P: RemoteProvider + ?Sized = dyn RemoteProvider> {
    provider: Arc<P>,
    name: String,
    uses_timestamp: bool,
    timeout_ms: u64,
    marker_margin: usize,
    state: Mutex<BlockState>,
    closed: AtomicBool,
}

impl<P: RemoteProvider + ?Sized> Block<P> {
    /// Creates a block on the engine.
    ///
    /// # Errors
    /// * [`StreamError::InvalidConfig`] for a zero size (no engine call made).
    /// * [`StreamError::NotConnected`] if the engine is unavailable.
    /// * [`StreamError::RemoteCallFailed`] if the engine refuses the block.
    pub fn create(provider: Arc<P>, config: BlockConfig) -> Result<Self, StreamError> {
        config.validate()?;
        if !provider.is_connected() {
            return Err(StreamError::NotConnected);
        }

        let name =
            provider.create_block(config.size, config.uses_timestamp, config.timeout_ms)?;
        log::info!(
            "Created block {} (size: {}, timestamps: {}, timeout: {}ms)",
            name,
            config.size,
            config.uses_timestamp,
            config.timeout_ms
        );

        Ok(Self {
            provider,
            name,
            uses_timestamp: config.uses_timestamp,
            timeout_ms: config.timeout_ms,
            marker_margin: config.marker_margin,
            state: Mutex::new(BlockState {
                size: config.size,
                members: Membership::new(),
            }),
            closed: AtomicBool::new(false),
        })
    }

    /// Engine-assigned block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether streams carry timestamps.
    pub fn uses_timestamp(&self) -> bool {
        self.uses_timestamp
    }

    /// Engine timeout the block was created with.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Whether [`close`](Self::close) already ran.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Per-stream capacity as reported by the engine.
    pub fn size(&self) -> Result<usize, StreamError> {
        self.ensure_open()?;
        let size = self.provider.block_size(&self.name)?;
        let mut state = self.lock()?;
        if state.size != size {
            log::debug!(
                "Block {} size changed outside accessor: {} -> {}",
                self.name,
                state.size,
                size
            );
            state.size = size;
        }
        Ok(size)
    }

    /// Resizes every stream of the block.
    ///
    /// The cached capacity used for index normalization follows the engine's
    /// reported size; a mismatch after the resize is an
    /// [`StreamError::InternalInconsistency`].
    pub fn set_size(&self, size: usize) -> Result<(), StreamError> {
        self.ensure_open()?;
        if size == 0 {
            return Err(StreamError::InvalidConfig("size must be positive".into()));
        }
        let mut state = self.lock()?;
        self.provider.set_block_size(&self.name, size)?;
        let reported = self.provider.block_size(&self.name)?;
        state.size = reported;
        if reported != size {
            return Err(StreamError::InternalInconsistency(format!(
                "block {} resized to {} but engine reports {}",
                self.name, size, reported
            )));
        }
        log::info!("Resized block {} to {}", self.name, size);
        Ok(())
    }

    /// Items with live streams (refreshes the cache).
    pub fn items(&self) -> Result<BTreeSet<String>, StreamError> {
        self.members(Member::Item)
    }

    /// Topics with live streams (refreshes the cache).
    pub fn topics(&self) -> Result<BTreeSet<String>, StreamError> {
        self.members(Member::Topic)
    }

    /// Items waiting in the engine's pre-cache for a first topic.
    pub fn pre_cached_items(&self) -> Result<BTreeSet<String>, StreamError> {
        self.ensure_open()?;
        Ok(self.provider.pre_cached_items(&self.name)?)
    }

    /// Topics waiting in the engine's pre-cache for a first item.
    pub fn pre_cached_topics(&self) -> Result<BTreeSet<String>, StreamError> {
        self.ensure_open()?;
        Ok(self.provider.pre_cached_topics(&self.name)?)
    }

    /// Adds an item.
    pub fn add_item(&self, item: &str) -> Result<(), StreamError> {
        self.mutate(Member::Item, item, true)
    }

    /// Removes an item.
    pub fn remove_item(&self, item: &str) -> Result<(), StreamError> {
        self.mutate(Member::Item, item, false)
    }

    /// Adds a topic.
    pub fn add_topic(&self, topic: &str) -> Result<(), StreamError> {
        self.mutate(Member::Topic, topic, true)
    }

    /// Removes a topic.
    pub fn remove_topic(&self, topic: &str) -> Result<(), StreamError> {
        self.mutate(Member::Topic, topic, false)
    }

    /// Native storage type of a topic.
    pub fn topic_type(&self, topic: &str) -> Result<DataType, StreamError> {
        self.ensure_open()?;
        Ok(self.provider.topic_type(topic)?)
    }

    /// Data points currently held by a stream.
    pub fn stream_occupancy(&self, item: &str, topic: &str) -> Result<usize, StreamError> {
        self.validate(item, topic)?;
        Ok(self.provider.stream_occupancy(self.stream(item, topic))?)
    }

    /// Whether unread data behind the stream's marker was overwritten.
    pub fn is_marker_dirty(&self, item: &str, topic: &str) -> Result<bool, StreamError> {
        self.validate(item, topic)?;
        Ok(self.provider.is_marker_dirty(self.stream(item, topic))?)
    }

    /// Current marker position of a stream.
    pub fn marker_position(&self, item: &str, topic: &str) -> Result<i64, StreamError> {
        self.validate(item, topic)?;
        Ok(self.provider.marker_position(self.stream(item, topic))?)
    }

    /// Reads one slot. `0` is the most recent, negative indices count from
    /// the oldest end.
    pub fn get<T: StreamValue>(
        &self,
        item: &str,
        topic: &str,
        index: i64,
    ) -> Result<DataPoint<T>, StreamError> {
        let size = self.validate(item, topic)?;
        let slot = index::normalize(index, size)?;
        log::trace!("get {}[{}, {}][{}]", self.name, item, topic, slot);
        let sample = self.provider.get_value(
            self.stream(item, topic),
            slot,
            T::DATA_TYPE,
            self.uses_timestamp,
        )?;
        convert(sample)
    }

    /// Most recent value of a stream.
    pub fn latest<T: StreamValue>(
        &self,
        item: &str,
        topic: &str,
    ) -> Result<DataPoint<T>, StreamError> {
        self.get(item, topic, 0)
    }

    /// Reads slots `beg..=end`, most recent first.
    ///
    /// With `smart_size` the range is clamped to the stream's occupancy and a
    /// stream shorter than `beg` yields an empty result; without it the
    /// normalized range is requested as-is.
    pub fn snapshot<T: StreamValue>(
        &self,
        item: &str,
        topic: &str,
        beg: i64,
        end: i64,
        smart_size: bool,
    ) -> Result<Vec<DataPoint<T>>, StreamError> {
        let size = self.validate(item, topic)?;
        let mut range = index::normalize_range(beg, end, size)?;
        let stream = self.stream(item, topic);

        if smart_size {
            let occupancy = self.provider.stream_occupancy(stream)?;
            match index::resolve_range(range.beg, range.end, occupancy) {
                Resolved::Empty => {
                    log::trace!(
                        "snapshot {}[{}, {}]: occupancy {} below {}",
                        self.name,
                        item,
                        topic,
                        occupancy,
                        range.beg
                    );
                    return Ok(Vec::new());
                }
                Resolved::Range(clamped) => range = clamped,
            }
        }

        let samples = self.provider.get_snapshot(
            stream,
            range.beg,
            range.end,
            T::DATA_TYPE,
            self.uses_timestamp,
        )?;
        samples.into_iter().map(convert::<T>).collect()
    }

    /// Reads everything written since the last marker read, down to `beg`.
    ///
    /// Records come back ascending by position (most recent last). Under
    /// [`LossPolicy::Fail`] a dirty marker, or loss reported by the fetch
    /// itself, is a [`StreamError::DirtyMarker`]; the dirty check runs before
    /// any position query or data transfer.
    pub fn snapshot_from_marker<T: StreamValue>(
        &self,
        item: &str,
        topic: &str,
        beg: i64,
        policy: LossPolicy,
    ) -> Result<Vec<DataPoint<T>>, StreamError> {
        let size = self.validate(item, topic)?;
        let beg = index::normalize(beg, size)?;
        let stream = self.stream(item, topic);

        if self.provider.is_marker_dirty(stream)? {
            match policy {
                LossPolicy::Fail => return Err(self.dirty(item, topic)),
                LossPolicy::Ignore => log::warn!(
                    "Marker of {}[{}, {}] is dirty, reading anyway",
                    self.name,
                    item,
                    topic
                ),
            }
        }

        let position = self.provider.marker_position(stream)?;
        let cur_size = position - beg as i64 + 1;
        if cur_size < 0 {
            return Ok(Vec::new());
        }

        let buffer_len = cur_size as usize + self.marker_margin;
        let fetch = self.provider.get_snapshot_from_marker(
            stream,
            beg,
            buffer_len,
            T::DATA_TYPE,
            self.uses_timestamp,
        )?;

        if fetch.size_got < 0 {
            match policy {
                LossPolicy::Fail => return Err(self.dirty(item, topic)),
                LossPolicy::Ignore => log::warn!(
                    "Data lost during marker read of {}[{}, {}]",
                    self.name,
                    item,
                    topic
                ),
            }
        }

        let got = fetch.size_got.unsigned_abs() as usize;
        log::trace!(
            "marker read {}[{}, {}]: requested {}, got {}",
            self.name,
            item,
            topic,
            buffer_len,
            got
        );
        fetch
            .samples
            .into_iter()
            .take(got)
            .map(convert::<T>)
            .collect()
    }

    /// [`snapshot_from_marker`](Self::snapshot_from_marker) that accepts data loss.
    pub fn snapshot_from_marker_ignore_dirty<T: StreamValue>(
        &self,
        item: &str,
        topic: &str,
        beg: i64,
    ) -> Result<Vec<DataPoint<T>>, StreamError> {
        self.snapshot_from_marker(item, topic, beg, LossPolicy::Ignore)
    }

    /// Most recent value of `topic` for every item.
    pub fn item_frame<T: StreamValue>(
        &self,
        topic: &str,
    ) -> Result<BTreeMap<String, DataPoint<T>>, StreamError> {
        self.ensure_open()?;
        self.lock()?
            .members
            .validate(&*self.provider, &self.name, Member::Topic, topic)?;
        let frame =
            self.provider
                .item_frame(&self.name, topic, T::DATA_TYPE, self.uses_timestamp)?;
        frame
            .into_iter()
            .map(|(item, sample)| convert::<T>(sample).map(|point| (item, point)))
            .collect()
    }

    /// Most recent value of every topic for `item`, as text.
    pub fn topic_frame(
        &self,
        item: &str,
    ) -> Result<BTreeMap<String, DataPoint<String>>, StreamError> {
        self.ensure_open()?;
        self.lock()?
            .members
            .validate(&*self.provider, &self.name, Member::Item, item)?;
        let frame = self
            .provider
            .topic_frame(&self.name, item, self.uses_timestamp)?;
        frame
            .into_iter()
            .map(|(topic, sample)| convert::<String>(sample).map(|point| (topic, point)))
            .collect()
    }

    /// Topic frames of every item.
    pub fn total_frame(
        &self,
    ) -> Result<BTreeMap<String, BTreeMap<String, DataPoint<String>>>, StreamError> {
        self.items()?
            .into_iter()
            .map(|item| {
                let frame = self.topic_frame(&item)?;
                Ok((item, frame))
            })
            .collect()
    }

    /// Releases the block on the engine.
    ///
    /// Terminal once it succeeds: later operations return
    /// [`StreamError::Closed`] and calling it again is a no-op. If the engine
    /// refuses, the block stays open so the close can be retried. A block the
    /// engine no longer knows counts as closed.
    pub fn close(&self) -> Result<(), StreamError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            log::debug!("Block {} already closed", self.name);
            return Ok(());
        }
        match self.provider.close_block(&self.name) {
            Ok(()) => log::info!("Closed block {}", self.name),
            Err(code) if code == ErrorCode::BLOCK_DOESNT_EXIST => {
                log::warn!("Block {} was already gone on the engine", self.name)
            }
            Err(code) => {
                self.closed.store(false, Ordering::SeqCst);
                return Err(code.into());
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StreamError> {
        if self.is_closed() {
            return Err(StreamError::Closed(self.name.clone()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BlockState>, StreamError> {
        self.state
            .lock()
            .map_err(|_| StreamError::InternalInconsistency("block state lock poisoned".into()))
    }

    fn stream<'a>(&'a self, item: &'a str, topic: &'a str) -> StreamRef<'a> {
        StreamRef::new(&self.name, item, topic)
    }

    fn dirty(&self, item: &str, topic: &str) -> StreamError {
        StreamError::DirtyMarker {
            item: item.to_string(),
            topic: topic.to_string(),
        }
    }

    /// Checks the pair against cached membership and returns the capacity.
    fn validate(&self, item: &str, topic: &str) -> Result<usize, StreamError> {
        self.ensure_open()?;
        let mut state = self.lock()?;
        state
            .members
            .validate(&*self.provider, &self.name, Member::Item, item)?;
        state
            .members
            .validate(&*self.provider, &self.name, Member::Topic, topic)?;
        Ok(state.size)
    }

    fn members(&self, member: Member) -> Result<BTreeSet<String>, StreamError> {
        self.ensure_open()?;
        let mut state = self.lock()?;
        state.members.refresh(&*self.provider, &self.name, member)?;
        Ok(state.members.get(member).clone())
    }

    fn mutate(&self, member: Member, value: &str, add: bool) -> Result<(), StreamError> {
        self.ensure_open()?;
        let mut state = self.lock()?;
        state.members.verify(&*self.provider, &self.name, member)?;
        let either_was_empty = state.members.either_empty();

        log::debug!(
            "{} {} {:?} on block {}",
            if add { "Adding" } else { "Removing" },
            member,
            value,
            self.name
        );
        let provider = &*self.provider;
        match (member, add) {
            (Member::Item, true) => provider.add_item(&self.name, value)?,
            (Member::Item, false) => provider.remove_item(&self.name, value)?,
            (Member::Topic, true) => provider.add_topic(&self.name, value)?,
            (Member::Topic, false) => provider.remove_topic(&self.name, value)?,
        }

        state
            .members
            .after_mutation(provider, &self.name, member, either_was_empty)
    }
}

fn convert<T: StreamValue>(sample: Sample) -> Result<DataPoint<T>, StreamError> {
    let found = sample.value.data_type();
    sample.typed::<T>().ok_or(StreamError::TypeMismatch {
        expected: T::DATA_TYPE,
        found,
    })
}

impl<P: RemoteProvider + ?Sized> Drop for Block<P> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close block {} on drop: {}", self.name, e);
        }
    }
}

impl<P: RemoteProvider + ?Sized> fmt::Debug for Block<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name)
            .field("uses_timestamp", &self.uses_timestamp)
            .field("timeout_ms", &self.timeout_ms)
            .field("marker_margin", &self.marker_margin)
            .field("state", &self.state)
            .field("closed", &self.closed)
            // exclude provider
            .finish()
    }
}
