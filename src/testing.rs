//! Scripted, call-counting provider for unit tests.

use crate::errors::ErrorCode;
use crate::provider::{MarkerFetch, ProviderResult, RemoteProvider, StreamRef};
use crate::value::{DataPoint, DataType, DateTimeStamp, Sample, Value};

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

/// State the tests script before (and inspect after) a call.
#[derive(Debug)]
pub(crate) struct MockState {
    pub(crate) connected: bool,
    pub(crate) size: usize,
    pub(crate) items: BTreeSet<String>,
    pub(crate) topics: BTreeSet<String>,
    pub(crate) occupancy: usize,
    pub(crate) dirty: bool,
    pub(crate) marker_position: i64,
    /// Overrides the `size_got` of marker reads; defaults to the buffer length.
    pub(crate) size_got: Option<i64>,
    pub(crate) last_buffer_len: Option<usize>,
    pub(crate) last_snapshot: Option<(usize, usize)>,
    pub(crate) last_index: Option<usize>,
    /// Type the mock answers with; defaults to the requested one.
    pub(crate) answer_type: Option<DataType>,
    pub(crate) closed: Vec<String>,
}

pub(crate) struct MockProvider {
    calls: Mutex<HashMap<&'static str, usize>>,
    state: Mutex<MockState>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            state: Mutex::new(MockState {
                connected: true,
                size: 10,
                items: BTreeSet::new(),
                topics: BTreeSet::new(),
                occupancy: 10,
                dirty: false,
                marker_position: -1,
                size_got: None,
                last_buffer_len: None,
                last_snapshot: None,
                last_index: None,
                answer_type: None,
                closed: Vec::new(),
            }),
        }
    }

    pub(crate) fn with_members(items: &[&str], topics: &[&str]) -> Self {
        let mock = Self::new();
        {
            let mut state = mock.state();
            state.items = items.iter().map(|s| s.to_string()).collect();
            state.topics = topics.iter().map(|s| s.to_string()).collect();
        }
        mock
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub(crate) fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn hit(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
    }

    fn sample(&self, n: usize, ty: DataType, with_timestamp: bool) -> Sample {
        let ty = self.state().answer_type.unwrap_or(ty);
        let value = match ty {
            DataType::Long => Value::Long(n as i64),
            DataType::Double => Value::Double(n as f64),
            DataType::String => Value::Text(n.to_string()),
        };
        if with_timestamp {
            DataPoint::stamped(
                value,
                DateTimeStamp {
                    seconds: n as i64,
                    micros: 0,
                },
            )
        } else {
            DataPoint::bare(value)
        }
    }
}

impl RemoteProvider for MockProvider {
    fn is_connected(&self) -> bool {
        self.hit("is_connected");
        self.state().connected
    }

    fn create_block(&self, size: usize, _: bool, _: u64) -> ProviderResult<String> {
        self.hit("create_block");
        self.state().size = size;
        Ok("MOCK_BLOCK".to_string())
    }

    fn close_block(&self, block: &str) -> ProviderResult<()> {
        self.hit("close_block");
        self.state().closed.push(block.to_string());
        Ok(())
    }

    fn block_size(&self, _: &str) -> ProviderResult<usize> {
        self.hit("block_size");
        Ok(self.state().size)
    }

    fn set_block_size(&self, _: &str, size: usize) -> ProviderResult<()> {
        self.hit("set_block_size");
        self.state().size = size;
        Ok(())
    }

    fn stream_occupancy(&self, _: StreamRef<'_>) -> ProviderResult<usize> {
        self.hit("stream_occupancy");
        Ok(self.state().occupancy)
    }

    fn items(&self, _: &str) -> ProviderResult<BTreeSet<String>> {
        self.hit("items");
        Ok(self.state().items.clone())
    }

    fn topics(&self, _: &str) -> ProviderResult<BTreeSet<String>> {
        self.hit("topics");
        Ok(self.state().topics.clone())
    }

    fn pre_cached_items(&self, _: &str) -> ProviderResult<BTreeSet<String>> {
        self.hit("pre_cached_items");
        Ok(BTreeSet::new())
    }

    fn pre_cached_topics(&self, _: &str) -> ProviderResult<BTreeSet<String>> {
        self.hit("pre_cached_topics");
        Ok(BTreeSet::new())
    }

    fn add_item(&self, _: &str, item: &str) -> ProviderResult<()> {
        self.hit("add_item");
        self.state().items.insert(item.to_string());
        Ok(())
    }

    fn add_topic(&self, _: &str, topic: &str) -> ProviderResult<()> {
        self.hit("add_topic");
        self.state().topics.insert(topic.to_string());
        Ok(())
    }

    fn remove_item(&self, _: &str, item: &str) -> ProviderResult<()> {
        self.hit("remove_item");
        self.state().items.remove(item);
        Ok(())
    }

    fn remove_topic(&self, _: &str, topic: &str) -> ProviderResult<()> {
        self.hit("remove_topic");
        self.state().topics.remove(topic);
        Ok(())
    }

    fn topic_type(&self, _: &str) -> ProviderResult<DataType> {
        self.hit("topic_type");
        Ok(DataType::Double)
    }

    fn get_value(
        &self,
        _: StreamRef<'_>,
        index: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Sample> {
        self.hit("get_value");
        self.state().last_index = Some(index);
        Ok(self.sample(index, ty, with_timestamp))
    }

    fn get_snapshot(
        &self,
        _: StreamRef<'_>,
        beg: usize,
        end: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<Sample>> {
        self.hit("get_snapshot");
        self.state().last_snapshot = Some((beg, end));
        Ok((beg..=end)
            .map(|i| self.sample(i, ty, with_timestamp))
            .collect())
    }

    fn is_marker_dirty(&self, _: StreamRef<'_>) -> ProviderResult<bool> {
        self.hit("is_marker_dirty");
        Ok(self.state().dirty)
    }

    fn marker_position(&self, _: StreamRef<'_>) -> ProviderResult<i64> {
        self.hit("marker_position");
        Ok(self.state().marker_position)
    }

    fn get_snapshot_from_marker(
        &self,
        _: StreamRef<'_>,
        _: usize,
        buffer_len: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<MarkerFetch> {
        self.hit("get_snapshot_from_marker");
        let size_got = {
            let mut state = self.state();
            state.last_buffer_len = Some(buffer_len);
            state.size_got.unwrap_or(buffer_len as i64)
        };
        // The whole buffer comes back; only `size_got` records are meaningful.
        let samples = (0..buffer_len)
            .map(|i| self.sample(i, ty, with_timestamp))
            .collect();
        Ok(MarkerFetch { samples, size_got })
    }

    fn item_frame(
        &self,
        _: &str,
        _: &str,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>> {
        self.hit("item_frame");
        let items: Vec<String> = self.state().items.iter().cloned().collect();
        Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (item, self.sample(i, ty, with_timestamp)))
            .collect())
    }

    fn topic_frame(
        &self,
        _: &str,
        _: &str,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>> {
        self.hit("topic_frame");
        let topics: Vec<String> = self.state().topics.iter().cloned().collect();
        Ok(topics
            .into_iter()
            .enumerate()
            .map(|(i, topic)| (topic, self.sample(i, DataType::String, with_timestamp)))
            .collect())
    }

    fn block_limit(&self) -> usize {
        1
    }

    fn set_block_limit(&self, limit: usize) -> usize {
        limit
    }

    fn block_count(&self) -> usize {
        1
    }

    fn block_names(&self) -> ProviderResult<Vec<String>> {
        if self.state().connected {
            Ok(vec!["MOCK_BLOCK".to_string()])
        } else {
            Err(ErrorCode::NOT_CONNECTED)
        }
    }
}
