//! In-process quote engine.
//!
//! [`SimulatedProvider`] keeps real circular streams with markers, dirty
//! detection, pre-cache semantics and the engine's error codes, so a
//! [`Block`](crate::block::Block) can be driven without the native library.
//! Data enters through [`SimulatedProvider::publish`], which plays the part
//! of the platform pushing an update for one (item, topic).

use crate::defs::{DEFAULT_BLOCK_LIMIT, MAX_BLOCK_SIZE, MAX_STR_SZ};
use crate::errors::ErrorCode;
use crate::provider::{MarkerFetch, ProviderResult, RemoteProvider, StreamRef};
use crate::value::{DataPoint, DataType, DateTimeStamp, Sample, Value};

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Storage type of every topic the engine knows.
pub fn known_topic_type(topic: &str) -> Option<DataType> {
    match topic {
        "LAST" | "BID" | "ASK" | "OPEN" | "HIGH" | "LOW" | "CLOSE" | "MARK" | "NETCHANGE" => {
            Some(DataType::Double)
        }
        "VOLUME" | "LAST_SIZE" | "BID_SIZE" | "ASK_SIZE" => Some(DataType::Long),
        "DESCRIPTION" | "EXCHANGE" => Some(DataType::String),
        _ => None,
    }
}

/// One circular stream. Slot `0` (front) is the most recent value.
#[derive(Debug, Default)]
struct SimStream {
    data: VecDeque<(Value, DateTimeStamp)>,
    /// Values written since the last marker read, at most `data.len()`.
    unread: usize,
    /// Unread values were overwritten before a marker read reached them.
    lost: bool,
}

impl SimStream {
    fn push(&mut self, value: Value, ts: DateTimeStamp, capacity: usize) {
        self.data.push_front((value, ts));
        self.unread += 1;
        self.truncate(capacity);
    }

    fn truncate(&mut self, capacity: usize) {
        self.data.truncate(capacity);
        if self.unread > self.data.len() {
            self.unread = self.data.len();
            self.lost = true;
        }
    }

    fn is_dirty(&self) -> bool {
        self.lost
    }

    fn marker_position(&self) -> i64 {
        self.unread as i64 - 1
    }
}

#[derive(Debug)]
struct SimBlock {
    size: usize,
    uses_timestamp: bool,
    timeout_ms: u64,
    items: BTreeSet<String>,
    topics: BTreeSet<String>,
    streams: HashMap<(String, String), SimStream>,
}

impl SimBlock {
    fn new(size: usize, uses_timestamp: bool, timeout_ms: u64) -> Self {
        Self {
            size,
            uses_timestamp,
            timeout_ms,
            items: BTreeSet::new(),
            topics: BTreeSet::new(),
            streams: HashMap::new(),
        }
    }

    fn is_live(&self) -> bool {
        !self.items.is_empty() && !self.topics.is_empty()
    }

    fn stream(&self, item: &str, topic: &str) -> ProviderResult<&SimStream> {
        self.check_pair(item, topic)?;
        self.streams
            .get(&(item.to_string(), topic.to_string()))
            .ok_or(ErrorCode::GET_DATA)
    }

    fn stream_mut(&mut self, item: &str, topic: &str) -> ProviderResult<&mut SimStream> {
        self.check_pair(item, topic)?;
        self.streams
            .get_mut(&(item.to_string(), topic.to_string()))
            .ok_or(ErrorCode::GET_DATA)
    }

    fn check_pair(&self, item: &str, topic: &str) -> ProviderResult<()> {
        if !self.is_live() || !self.items.contains(item) {
            return Err(ErrorCode::ITEM_DOESNT_EXIST);
        }
        if !self.topics.contains(topic) {
            return Err(ErrorCode::TOPIC_DOESNT_EXIST);
        }
        Ok(())
    }

    fn sample(
        &self,
        value: &Value,
        ts: DateTimeStamp,
        ty: DataType,
        stamped: bool,
    ) -> ProviderResult<Sample> {
        let value = convert(value, ty)?;
        if stamped && self.uses_timestamp {
            Ok(DataPoint::stamped(value, ts))
        } else {
            Ok(DataPoint::bare(value))
        }
    }
}

/// Reads a stored value as `ty`: text always works, longs widen to doubles.
fn convert(value: &Value, ty: DataType) -> ProviderResult<Value> {
    match (value, ty) {
        (v, DataType::String) => Ok(Value::Text(v.to_string())),
        (Value::Long(v), DataType::Long) => Ok(Value::Long(*v)),
        (Value::Double(v), DataType::Double) => Ok(Value::Double(*v)),
        (Value::Long(v), DataType::Double) => Ok(Value::Double(*v as f64)),
        _ => Err(ErrorCode::DATA_TYPE),
    }
}

fn check_name(name: &str) -> ProviderResult<()> {
    if name.is_empty() || name.len() >= MAX_STR_SZ {
        return Err(ErrorCode::BAD_INPUT);
    }
    Ok(())
}

fn check_size(size: usize) -> ProviderResult<()> {
    if size == 0 || size > MAX_BLOCK_SIZE {
        return Err(ErrorCode::BLOCK_SIZE);
    }
    Ok(())
}

/// In-process engine implementing [`RemoteProvider`].
#[derive(Debug)]
pub struct SimulatedProvider {
    blocks: RwLock<HashMap<String, SimBlock>>,
    block_limit: AtomicUsize,
    connected: AtomicBool,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedProvider {
    /// Connected engine with no blocks.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            block_limit: AtomicUsize::new(DEFAULT_BLOCK_LIMIT),
            connected: AtomicBool::new(true),
        }
    }

    /// Simulates losing (or regaining) the platform connection.
    pub fn set_connected(&self, connected: bool) {
        log::info!("Simulated engine connected: {}", connected);
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Writes `value` stamped with the current time into every block that
    /// streams (item, topic). Returns how many streams received it.
    pub fn publish(&self, item: &str, topic: &str, value: Value) -> usize {
        self.publish_at(item, topic, value, DateTimeStamp::now())
    }

    /// [`publish`](Self::publish) with an explicit timestamp.
    pub fn publish_at(&self, item: &str, topic: &str, value: Value, ts: DateTimeStamp) -> usize {
        let Ok(mut blocks) = self.blocks.write() else {
            log::error!("Engine lock poisoned, dropping {}/{} update", item, topic);
            return 0;
        };
        let key = (item.to_string(), topic.to_string());
        let mut written = 0;
        for block in blocks.values_mut() {
            let size = block.size;
            if let Some(stream) = block.streams.get_mut(&key) {
                stream.push(value.clone(), ts, size);
                written += 1;
            }
        }
        log::trace!("Published {}/{} = {} to {} streams", item, topic, value, written);
        written
    }

    /// Every (item, topic) pair with a live stream in any block.
    pub fn subscriptions(&self) -> BTreeSet<(String, String)> {
        match self.blocks.read() {
            Ok(blocks) => blocks
                .values()
                .flat_map(|b| b.streams.keys().cloned())
                .collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    /// Timeout a block was created with.
    pub fn block_timeout(&self, block: &str) -> ProviderResult<u64> {
        self.with_block(block, |b| Ok(b.timeout_ms))
    }

    fn read(&self) -> ProviderResult<RwLockReadGuard<'_, HashMap<String, SimBlock>>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ErrorCode::NOT_CONNECTED);
        }
        self.blocks.read().map_err(|_| ErrorCode::CONCURRENCY)
    }

    fn write(&self) -> ProviderResult<RwLockWriteGuard<'_, HashMap<String, SimBlock>>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ErrorCode::NOT_CONNECTED);
        }
        self.blocks.write().map_err(|_| ErrorCode::CONCURRENCY)
    }

    fn with_block<T>(
        &self,
        block: &str,
        f: impl FnOnce(&SimBlock) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        let blocks = self.read()?;
        let b = blocks.get(block).ok_or(ErrorCode::BLOCK_DOESNT_EXIST)?;
        f(b)
    }

    fn with_block_mut<T>(
        &self,
        block: &str,
        f: impl FnOnce(&mut SimBlock) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        let mut blocks = self.write()?;
        let b = blocks.get_mut(block).ok_or(ErrorCode::BLOCK_DOESNT_EXIST)?;
        f(b)
    }
}

impl RemoteProvider for SimulatedProvider {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn create_block(
        &self,
        size: usize,
        uses_timestamp: bool,
        timeout_ms: u64,
    ) -> ProviderResult<String> {
        check_size(size)?;
        let mut blocks = self.write()?;
        if blocks.len() >= self.block_limit.load(Ordering::SeqCst) {
            return Err(ErrorCode::BLOCK_LIMIT);
        }
        let name = Uuid::new_v4().simple().to_string().to_uppercase();
        if blocks.contains_key(&name) {
            return Err(ErrorCode::BLOCK_ALREADY_EXISTS);
        }
        blocks.insert(name.clone(), SimBlock::new(size, uses_timestamp, timeout_ms));
        log::debug!("Engine created block {}", name);
        Ok(name)
    }

    fn close_block(&self, block: &str) -> ProviderResult<()> {
        let mut blocks = self.write()?;
        blocks.remove(block).ok_or(ErrorCode::BLOCK_DOESNT_EXIST)?;
        log::debug!("Engine closed block {}", block);
        Ok(())
    }

    fn block_size(&self, block: &str) -> ProviderResult<usize> {
        self.with_block(block, |b| Ok(b.size))
    }

    fn set_block_size(&self, block: &str, size: usize) -> ProviderResult<()> {
        check_size(size)?;
        self.with_block_mut(block, |b| {
            b.size = size;
            for stream in b.streams.values_mut() {
                stream.truncate(size);
            }
            Ok(())
        })
    }

    fn stream_occupancy(&self, stream: StreamRef<'_>) -> ProviderResult<usize> {
        self.with_block(stream.block, |b| Ok(b.stream(stream.item, stream.topic)?.data.len()))
    }

    fn items(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.with_block(block, |b| {
            Ok(if b.topics.is_empty() {
                BTreeSet::new()
            } else {
                b.items.clone()
            })
        })
    }

    fn topics(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.with_block(block, |b| {
            Ok(if b.items.is_empty() {
                BTreeSet::new()
            } else {
                b.topics.clone()
            })
        })
    }

    fn pre_cached_items(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.with_block(block, |b| {
            Ok(if b.topics.is_empty() {
                b.items.clone()
            } else {
                BTreeSet::new()
            })
        })
    }

    fn pre_cached_topics(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.with_block(block, |b| {
            Ok(if b.items.is_empty() {
                b.topics.clone()
            } else {
                BTreeSet::new()
            })
        })
    }

    fn add_item(&self, block: &str, item: &str) -> ProviderResult<()> {
        check_name(item)?;
        self.with_block_mut(block, |b| {
            if b.items.insert(item.to_string()) {
                for topic in &b.topics {
                    b.streams
                        .insert((item.to_string(), topic.clone()), SimStream::default());
                }
            }
            Ok(())
        })
    }

    fn add_topic(&self, block: &str, topic: &str) -> ProviderResult<()> {
        check_name(topic)?;
        if known_topic_type(topic).is_none() {
            return Err(ErrorCode::ENGINE_NO_TOPIC);
        }
        self.with_block_mut(block, |b| {
            if b.topics.insert(topic.to_string()) {
                for item in &b.items {
                    b.streams
                        .insert((item.clone(), topic.to_string()), SimStream::default());
                }
            }
            Ok(())
        })
    }

    fn remove_item(&self, block: &str, item: &str) -> ProviderResult<()> {
        self.with_block_mut(block, |b| {
            if !b.items.remove(item) {
                return Err(ErrorCode::ITEM_DOESNT_EXIST);
            }
            b.streams.retain(|(i, _), _| i != item);
            Ok(())
        })
    }

    fn remove_topic(&self, block: &str, topic: &str) -> ProviderResult<()> {
        self.with_block_mut(block, |b| {
            if !b.topics.remove(topic) {
                return Err(ErrorCode::TOPIC_DOESNT_EXIST);
            }
            b.streams.retain(|(_, t), _| t != topic);
            Ok(())
        })
    }

    fn topic_type(&self, topic: &str) -> ProviderResult<DataType> {
        known_topic_type(topic).ok_or(ErrorCode::ENGINE_NO_TOPIC)
    }

    fn get_value(
        &self,
        stream: StreamRef<'_>,
        index: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Sample> {
        self.with_block(stream.block, |b| {
            if index >= b.size {
                return Err(ErrorCode::STREAM_SIZE);
            }
            let s = b.stream(stream.item, stream.topic)?;
            let (value, ts) = s.data.get(index).ok_or(ErrorCode::GET_DATA)?;
            b.sample(value, *ts, ty, with_timestamp)
        })
    }

    fn get_snapshot(
        &self,
        stream: StreamRef<'_>,
        beg: usize,
        end: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<Sample>> {
        self.with_block(stream.block, |b| {
            if end >= b.size {
                return Err(ErrorCode::STREAM_SIZE);
            }
            if beg > end {
                return Err(ErrorCode::BAD_INPUT);
            }
            let s = b.stream(stream.item, stream.topic)?;
            // Unwritten slots are left out rather than padded.
            s.data
                .iter()
                .skip(beg)
                .take(end - beg + 1)
                .map(|(value, ts)| b.sample(value, *ts, ty, with_timestamp))
                .collect()
        })
    }

    fn is_marker_dirty(&self, stream: StreamRef<'_>) -> ProviderResult<bool> {
        self.with_block(stream.block, |b| Ok(b.stream(stream.item, stream.topic)?.is_dirty()))
    }

    fn marker_position(&self, stream: StreamRef<'_>) -> ProviderResult<i64> {
        self.with_block(stream.block, |b| {
            Ok(b.stream(stream.item, stream.topic)?.marker_position())
        })
    }

    fn get_snapshot_from_marker(
        &self,
        stream: StreamRef<'_>,
        beg: usize,
        buffer_len: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<MarkerFetch> {
        self.with_block_mut(stream.block, |b| {
            if beg >= b.size {
                return Err(ErrorCode::STREAM_SIZE);
            }
            let uses_timestamp = b.uses_timestamp;
            let s = b.stream_mut(stream.item, stream.topic)?;

            let pending = s.unread.saturating_sub(beg);
            let taken = pending.min(buffer_len);
            let lost = s.lost || pending > buffer_len;

            // Oldest first: walk slots beg+taken-1 down to beg.
            let samples = s
                .data
                .iter()
                .skip(beg)
                .take(taken)
                .rev()
                .map(|(value, ts)| {
                    let value = convert(value, ty)?;
                    Ok(if with_timestamp && uses_timestamp {
                        DataPoint::stamped(value, *ts)
                    } else {
                        DataPoint::bare(value)
                    })
                })
                .collect::<ProviderResult<Vec<_>>>()?;

            // Slots newer than `beg` stay pending for the next read.
            s.unread = s.unread.min(beg);
            s.lost = false;

            let size_got = if lost { -(taken as i64) } else { taken as i64 };
            Ok(MarkerFetch { samples, size_got })
        })
    }

    fn item_frame(
        &self,
        block: &str,
        topic: &str,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>> {
        self.with_block(block, |b| {
            if !b.is_live() || !b.topics.contains(topic) {
                return Err(ErrorCode::TOPIC_DOESNT_EXIST);
            }
            let mut frame = Vec::new();
            for item in &b.items {
                if let Some((value, ts)) = b.stream(item, topic)?.data.front() {
                    frame.push((item.clone(), b.sample(value, *ts, ty, with_timestamp)?));
                }
            }
            Ok(frame)
        })
    }

    fn topic_frame(
        &self,
        block: &str,
        item: &str,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>> {
        self.with_block(block, |b| {
            if !b.is_live() || !b.items.contains(item) {
                return Err(ErrorCode::ITEM_DOESNT_EXIST);
            }
            let mut frame = Vec::new();
            for topic in &b.topics {
                if let Some((value, ts)) = b.stream(item, topic)?.data.front() {
                    let sample = b.sample(value, *ts, DataType::String, with_timestamp)?;
                    frame.push((topic.clone(), sample));
                }
            }
            Ok(frame)
        })
    }

    fn block_limit(&self) -> usize {
        self.block_limit.load(Ordering::SeqCst)
    }

    fn set_block_limit(&self, limit: usize) -> usize {
        let limit = limit.max(self.block_count());
        self.block_limit.store(limit, Ordering::SeqCst);
        limit
    }

    fn block_count(&self) -> usize {
        self.blocks.read().map(|b| b.len()).unwrap_or(0)
    }

    fn block_names(&self) -> ProviderResult<Vec<String>> {
        let blocks = self.read()?;
        let mut names: Vec<String> = blocks.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_block(size: usize, uses_timestamp: bool) -> (SimulatedProvider, String) {
        let engine = SimulatedProvider::new();
        let name = engine.create_block(size, uses_timestamp, 1000).unwrap();
        (engine, name)
    }

    fn push_many(engine: &SimulatedProvider, n: i64) {
        for v in 0..n {
            engine.publish("SPY", "LAST", Value::Double(v as f64));
        }
    }

    #[test]
    fn test_pre_cache_until_both_sets_exist() {
        let (engine, block) = engine_with_block(5, false);

        engine.add_topic(&block, "LAST").unwrap();
        assert!(engine.topics(&block).unwrap().is_empty());
        assert!(engine.pre_cached_topics(&block).unwrap().contains("LAST"));

        engine.add_item(&block, "SPY").unwrap();
        assert!(engine.items(&block).unwrap().contains("SPY"));
        assert!(engine.topics(&block).unwrap().contains("LAST"));
        assert!(engine.pre_cached_topics(&block).unwrap().is_empty());

        engine.remove_topic(&block, "LAST").unwrap();
        assert!(engine.items(&block).unwrap().is_empty());
        assert!(engine.pre_cached_items(&block).unwrap().contains("SPY"));
    }

    #[test]
    fn test_unknown_topic_rejected() {
        let (engine, block) = engine_with_block(5, false);
        assert_eq!(engine.add_topic(&block, "NOPE"), Err(ErrorCode::ENGINE_NO_TOPIC));
        assert_eq!(engine.add_item(&block, ""), Err(ErrorCode::BAD_INPUT));
    }

    #[test]
    fn test_circular_overwrite() {
        let (engine, block) = engine_with_block(3, false);
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        push_many(&engine, 5);

        let stream = StreamRef::new(&block, "SPY", "LAST");
        assert_eq!(engine.stream_occupancy(stream).unwrap(), 3);

        let snap = engine.get_snapshot(stream, 0, 2, DataType::Double, false).unwrap();
        let values: Vec<Value> = snap.into_iter().map(|s| s.value).collect();
        assert_eq!(
            values,
            vec![Value::Double(4.0), Value::Double(3.0), Value::Double(2.0)]
        );
        assert_eq!(
            engine.get_value(stream, 3, DataType::Double, false),
            Err(ErrorCode::STREAM_SIZE)
        );
    }

    #[test]
    fn test_marker_read_returns_pending_oldest_first() {
        let (engine, block) = engine_with_block(10, false);
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        push_many(&engine, 4);

        let stream = StreamRef::new(&block, "SPY", "LAST");
        assert_eq!(engine.marker_position(stream).unwrap(), 3);
        assert!(!engine.is_marker_dirty(stream).unwrap());

        let fetch = engine
            .get_snapshot_from_marker(stream, 0, 100, DataType::Double, false)
            .unwrap();
        assert_eq!(fetch.size_got, 4);
        assert_eq!(fetch.samples[0].value, Value::Double(0.0));
        assert_eq!(fetch.samples[3].value, Value::Double(3.0));
        assert_eq!(engine.marker_position(stream).unwrap(), -1);
    }

    #[test]
    fn test_marker_dirty_after_overwrite() {
        let (engine, block) = engine_with_block(3, false);
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        push_many(&engine, 5);

        let stream = StreamRef::new(&block, "SPY", "LAST");
        assert!(engine.is_marker_dirty(stream).unwrap());

        let fetch = engine
            .get_snapshot_from_marker(stream, 0, 100, DataType::Double, false)
            .unwrap();
        assert_eq!(fetch.size_got, -3);
        assert!(!engine.is_marker_dirty(stream).unwrap());
    }

    #[test]
    fn test_marker_position_bounded_by_capacity() {
        let (engine, block) = engine_with_block(10, false);
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        push_many(&engine, 10_000);

        let stream = StreamRef::new(&block, "SPY", "LAST");
        assert_eq!(engine.marker_position(stream).unwrap(), 9);
        assert!(engine.is_marker_dirty(stream).unwrap());

        let fetch = engine
            .get_snapshot_from_marker(stream, 0, 110, DataType::Double, false)
            .unwrap();
        assert_eq!(fetch.size_got, -10);
        assert_eq!(fetch.samples[0].value, Value::Double(9990.0));
        assert_eq!(fetch.samples[9].value, Value::Double(9999.0));
        assert_eq!(engine.marker_position(stream).unwrap(), -1);
        assert!(!engine.is_marker_dirty(stream).unwrap());
    }

    #[test]
    fn test_resize_below_unread_marks_loss() {
        let (engine, block) = engine_with_block(10, false);
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        push_many(&engine, 6);

        engine.set_block_size(&block, 4).unwrap();
        let stream = StreamRef::new(&block, "SPY", "LAST");
        assert_eq!(engine.marker_position(stream).unwrap(), 3);
        assert!(engine.is_marker_dirty(stream).unwrap());
    }

    #[test]
    fn test_marker_read_keeps_newer_than_beg_pending() {
        let (engine, block) = engine_with_block(10, false);
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        push_many(&engine, 5);

        let stream = StreamRef::new(&block, "SPY", "LAST");
        let fetch = engine
            .get_snapshot_from_marker(stream, 2, 100, DataType::Double, false)
            .unwrap();
        assert_eq!(fetch.size_got, 3);
        assert_eq!(engine.marker_position(stream).unwrap(), 1);
    }

    #[test]
    fn test_type_conversion_rules() {
        assert_eq!(convert(&Value::Long(3), DataType::Double), Ok(Value::Double(3.0)));
        assert_eq!(
            convert(&Value::Double(1.5), DataType::String),
            Ok(Value::Text("1.5".into()))
        );
        assert_eq!(convert(&Value::Double(1.5), DataType::Long), Err(ErrorCode::DATA_TYPE));
    }

    #[test]
    fn test_block_limit_and_names() {
        let engine = SimulatedProvider::new();
        engine.set_block_limit(1);
        let name = engine.create_block(5, false, 100).unwrap();
        assert_eq!(engine.create_block(5, false, 100), Err(ErrorCode::BLOCK_LIMIT));
        assert_eq!(engine.block_names().unwrap(), vec![name.clone()]);
        assert_eq!(engine.block_timeout(&name).unwrap(), 100);

        engine.close_block(&name).unwrap();
        assert_eq!(engine.block_count(), 0);
        assert_eq!(engine.close_block(&name), Err(ErrorCode::BLOCK_DOESNT_EXIST));
    }

    #[test]
    fn test_topic_types() {
        let engine = SimulatedProvider::new();
        assert_eq!(engine.topic_type("LAST"), Ok(DataType::Double));
        assert_eq!(engine.topic_type("VOLUME"), Ok(DataType::Long));
        assert_eq!(engine.topic_type("DESCRIPTION"), Ok(DataType::String));
        assert_eq!(engine.topic_type("NOPE"), Err(ErrorCode::ENGINE_NO_TOPIC));
    }

    #[test]
    fn test_disconnected_engine() {
        let engine = SimulatedProvider::new();
        engine.set_connected(false);
        assert!(!engine.is_connected());
        assert_eq!(engine.create_block(5, false, 100), Err(ErrorCode::NOT_CONNECTED));
    }

    #[test]
    fn test_resize_truncates_streams() {
        let (engine, block) = engine_with_block(5, true);
        engine.add_item(&block, "SPY").unwrap();
        engine.add_topic(&block, "LAST").unwrap();
        push_many(&engine, 5);

        engine.set_block_size(&block, 2).unwrap();
        let stream = StreamRef::new(&block, "SPY", "LAST");
        assert_eq!(engine.stream_occupancy(stream).unwrap(), 2);
        assert_eq!(engine.set_block_size(&block, 0), Err(ErrorCode::BLOCK_SIZE));

        let sample = engine.get_value(stream, 0, DataType::Double, true).unwrap();
        assert!(sample.timestamp.is_some());
    }
}
