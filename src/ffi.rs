//! [`RemoteProvider`] backed by the native engine library.
//!
//! Linked as `quote-bridge` (enable the `native` feature). Everything
//! specific to the C ABI lives here: the `tm`-based timestamp struct,
//! pre-allocated fixed-size string buffers and NUL-terminated encoding.
//! Unix only (`timegm`).

use crate::defs::MAX_STR_SZ;
use crate::errors::ErrorCode;
use crate::provider::{MarkerFetch, ProviderResult, RemoteProvider, StreamRef};
use crate::value::{DataPoint, DataType, DateTimeStamp, Sample, Value};

use libc::{c_char, c_int, c_long, c_uint, size_t};
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::ptr;
use uuid::Uuid;

/// C layout of an engine timestamp: broken-down UTC time plus microseconds.
#[repr(C)]
#[derive(Clone, Copy)]
struct RawDateTimeStamp {
    ctime_struct: libc::tm,
    micro_second: c_long,
}

impl RawDateTimeStamp {
    fn zeroed() -> Self {
        // SAFETY: `tm` and `c_long` are plain C data; all-zero is a valid value.
        unsafe { std::mem::zeroed() }
    }

    fn to_stamp(mut self) -> DateTimeStamp {
        // SAFETY: `timegm` only reads/normalizes the struct we own.
        let seconds = unsafe { libc::timegm(&mut self.ctime_struct) };
        DateTimeStamp {
            seconds: seconds as i64,
            micros: self.micro_second.clamp(0, 999_999) as u32,
        }
    }
}

const TYPE_LONG: c_int = 0;
const TYPE_DOUBLE: c_int = 1;
const TYPE_STRING: c_int = 2;

#[link(name = "quote-bridge")]
unsafe extern "C" {
    fn QB_IsConnected() -> c_uint;
    fn QB_CreateBlock(
        id: *const c_char,
        size: size_t,
        is_datetime: c_int,
        timeout: size_t,
    ) -> c_int;
    fn QB_CloseBlock(id: *const c_char) -> c_int;
    fn QB_GetBlockSize(id: *const c_char, size: *mut size_t) -> c_int;
    fn QB_SetBlockSize(id: *const c_char, size: size_t) -> c_int;
    fn QB_GetBlockLimit() -> size_t;
    fn QB_SetBlockLimit(limit: size_t) -> size_t;
    fn QB_GetBlockCount() -> size_t;
    fn QB_GetBlockIDs(dest: *mut *mut c_char, array_len: size_t, str_len: size_t) -> c_int;
    fn QB_GetStreamOccupancy(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        occupancy: *mut size_t,
    ) -> c_int;

    fn QB_GetItemCount(id: *const c_char, count: *mut size_t) -> c_int;
    fn QB_GetTopicCount(id: *const c_char, count: *mut size_t) -> c_int;
    fn QB_GetPreCachedItemCount(id: *const c_char, count: *mut size_t) -> c_int;
    fn QB_GetPreCachedTopicCount(id: *const c_char, count: *mut size_t) -> c_int;
    fn QB_GetItemNames(
        id: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
    ) -> c_int;
    fn QB_GetTopicNames(
        id: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
    ) -> c_int;
    fn QB_GetPreCachedItemNames(
        id: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
    ) -> c_int;
    fn QB_GetPreCachedTopicNames(
        id: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
    ) -> c_int;
    fn QB_AddItem(id: *const c_char, item: *const c_char) -> c_int;
    fn QB_AddTopic(id: *const c_char, topic: *const c_char) -> c_int;
    fn QB_RemoveItem(id: *const c_char, item: *const c_char) -> c_int;
    fn QB_RemoveTopic(id: *const c_char, topic: *const c_char) -> c_int;
    fn QB_GetTopicType(topic: *const c_char, data_type: *mut c_int) -> c_int;

    fn QB_GetLongLong(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        indx: c_long,
        dest: *mut i64,
        datetime: *mut RawDateTimeStamp,
    ) -> c_int;
    fn QB_GetDouble(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        indx: c_long,
        dest: *mut f64,
        datetime: *mut RawDateTimeStamp,
    ) -> c_int;
    fn QB_GetString(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        indx: c_long,
        dest: *mut c_char,
        str_len: size_t,
        datetime: *mut RawDateTimeStamp,
    ) -> c_int;

    fn QB_GetStreamSnapshotLongLongs(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        dest: *mut i64,
        array_len: size_t,
        datetime: *mut RawDateTimeStamp,
        end: c_long,
        beg: c_long,
    ) -> c_int;
    fn QB_GetStreamSnapshotDoubles(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        dest: *mut f64,
        array_len: size_t,
        datetime: *mut RawDateTimeStamp,
        end: c_long,
        beg: c_long,
    ) -> c_int;
    fn QB_GetStreamSnapshotStrings(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
        datetime: *mut RawDateTimeStamp,
        end: c_long,
        beg: c_long,
    ) -> c_int;

    fn QB_IsMarkerDirty(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        is_dirty: *mut c_uint,
    ) -> c_int;
    fn QB_GetMarkerPosition(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        position: *mut i64,
    ) -> c_int;
    fn QB_GetStreamSnapshotLongLongsFromMarker(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        dest: *mut i64,
        array_len: size_t,
        datetime: *mut RawDateTimeStamp,
        beg: c_long,
        get_size: *mut c_long,
    ) -> c_int;
    fn QB_GetStreamSnapshotDoublesFromMarker(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        dest: *mut f64,
        array_len: size_t,
        datetime: *mut RawDateTimeStamp,
        beg: c_long,
        get_size: *mut c_long,
    ) -> c_int;
    fn QB_GetStreamSnapshotStringsFromMarker(
        id: *const c_char,
        item: *const c_char,
        topic: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
        datetime: *mut RawDateTimeStamp,
        beg: c_long,
        get_size: *mut c_long,
    ) -> c_int;

    fn QB_GetItemFrameLongLongs(
        id: *const c_char,
        topic: *const c_char,
        dest: *mut i64,
        array_len: size_t,
        label_dest: *mut *mut c_char,
        label_str_len: size_t,
        datetime: *mut RawDateTimeStamp,
    ) -> c_int;
    fn QB_GetItemFrameDoubles(
        id: *const c_char,
        topic: *const c_char,
        dest: *mut f64,
        array_len: size_t,
        label_dest: *mut *mut c_char,
        label_str_len: size_t,
        datetime: *mut RawDateTimeStamp,
    ) -> c_int;
    fn QB_GetItemFrameStrings(
        id: *const c_char,
        topic: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
        label_dest: *mut *mut c_char,
        label_str_len: size_t,
        datetime: *mut RawDateTimeStamp,
    ) -> c_int;
    fn QB_GetTopicFrameStrings(
        id: *const c_char,
        item: *const c_char,
        dest: *mut *mut c_char,
        array_len: size_t,
        str_len: size_t,
        label_dest: *mut *mut c_char,
        label_str_len: size_t,
        datetime: *mut RawDateTimeStamp,
    ) -> c_int;
}

/// Encodes a name for the C side; rejects interior NULs and oversize names.
fn c_str(s: &str) -> ProviderResult<CString> {
    if s.len() >= MAX_STR_SZ {
        return Err(ErrorCode::BAD_INPUT);
    }
    CString::new(s).map_err(|_| ErrorCode::BAD_INPUT)
}

/// `n` pre-allocated, NUL-filled C string slots of `MAX_STR_SZ` bytes.
struct StringBuffers {
    storage: Vec<Vec<c_char>>,
    ptrs: Vec<*mut c_char>,
}

impl StringBuffers {
    fn new(n: usize) -> Self {
        let mut storage: Vec<Vec<c_char>> = (0..n).map(|_| vec![0; MAX_STR_SZ]).collect();
        let ptrs = storage.iter_mut().map(|s| s.as_mut_ptr()).collect();
        Self { storage, ptrs }
    }

    fn as_mut_ptr(&mut self) -> *mut *mut c_char {
        self.ptrs.as_mut_ptr()
    }

    fn into_strings(self, n: usize) -> Vec<String> {
        self.storage
            .iter()
            .take(n)
            .map(|s| {
                // Force termination in case the engine filled the whole slot.
                let mut bytes: Vec<u8> = s.iter().map(|&c| c as u8).collect();
                if let Some(last) = bytes.last_mut() {
                    *last = 0;
                }
                CStr::from_bytes_until_nul(&bytes)
                    .map(|c| c.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Timestamp destination: a buffer when requested, NULL otherwise.
struct Stamps {
    raw: Vec<RawDateTimeStamp>,
}

impl Stamps {
    fn new(n: usize, wanted: bool) -> Self {
        let raw = if wanted {
            vec![RawDateTimeStamp::zeroed(); n]
        } else {
            Vec::new()
        };
        Self { raw }
    }

    fn as_mut_ptr(&mut self) -> *mut RawDateTimeStamp {
        if self.raw.is_empty() {
            ptr::null_mut()
        } else {
            self.raw.as_mut_ptr()
        }
    }

    fn attach(&self, values: Vec<Value>) -> Vec<Sample> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| match self.raw.get(i) {
                Some(raw) => DataPoint::stamped(value, raw.to_stamp()),
                None => DataPoint::bare(value),
            })
            .collect()
    }
}

fn check(raw: c_int) -> ProviderResult<()> {
    ErrorCode::check(raw)
}

/// Engine reached through the native library.
#[derive(Debug, Default)]
pub struct NativeProvider;

impl NativeProvider {
    /// Handle to the linked library.
    pub fn new() -> Self {
        Self
    }

    fn names(
        &self,
        block: &str,
        count: unsafe extern "C" fn(*const c_char, *mut size_t) -> c_int,
        names: unsafe extern "C" fn(*const c_char, *mut *mut c_char, size_t, size_t) -> c_int,
    ) -> ProviderResult<BTreeSet<String>> {
        let id = c_str(block)?;
        let mut n: size_t = 0;
        // SAFETY: valid C string and out-pointer.
        check(unsafe { count(id.as_ptr(), &mut n) })?;
        if n == 0 {
            return Ok(BTreeSet::new());
        }
        let mut buf = StringBuffers::new(n);
        // SAFETY: `buf` holds `n` slots of `MAX_STR_SZ` bytes each.
        check(unsafe { names(id.as_ptr(), buf.as_mut_ptr(), n, MAX_STR_SZ) })?;
        Ok(buf.into_strings(n).into_iter().collect())
    }

    fn membership(
        &self,
        block: &str,
        value: &str,
        f: unsafe extern "C" fn(*const c_char, *const c_char) -> c_int,
    ) -> ProviderResult<()> {
        let id = c_str(block)?;
        let v = c_str(value)?;
        // SAFETY: both arguments are valid NUL-terminated strings.
        check(unsafe { f(id.as_ptr(), v.as_ptr()) })
    }
}

/// Owned C strings for one stream address.
struct CStream {
    block: CString,
    item: CString,
    topic: CString,
}

impl CStream {
    fn new(stream: StreamRef<'_>) -> ProviderResult<Self> {
        Ok(Self {
            block: c_str(stream.block)?,
            item: c_str(stream.item)?,
            topic: c_str(stream.topic)?,
        })
    }
}

impl RemoteProvider for NativeProvider {
    fn is_connected(&self) -> bool {
        // SAFETY: no arguments.
        unsafe { QB_IsConnected() != 0 }
    }

    fn create_block(
        &self,
        size: usize,
        uses_timestamp: bool,
        timeout_ms: u64,
    ) -> ProviderResult<String> {
        let name = Uuid::new_v4().simple().to_string().to_uppercase();
        let id = c_str(&name)?;
        // SAFETY: valid C string; scalars by value.
        check(unsafe {
            QB_CreateBlock(id.as_ptr(), size, uses_timestamp as c_int, timeout_ms as size_t)
        })?;
        Ok(name)
    }

    fn close_block(&self, block: &str) -> ProviderResult<()> {
        let id = c_str(block)?;
        // SAFETY: valid C string.
        check(unsafe { QB_CloseBlock(id.as_ptr()) })
    }

    fn block_size(&self, block: &str) -> ProviderResult<usize> {
        let id = c_str(block)?;
        let mut size: size_t = 0;
        // SAFETY: valid C string and out-pointer.
        check(unsafe { QB_GetBlockSize(id.as_ptr(), &mut size) })?;
        Ok(size)
    }

    fn set_block_size(&self, block: &str, size: usize) -> ProviderResult<()> {
        let id = c_str(block)?;
        // SAFETY: valid C string.
        check(unsafe { QB_SetBlockSize(id.as_ptr(), size) })
    }

    fn stream_occupancy(&self, stream: StreamRef<'_>) -> ProviderResult<usize> {
        let s = CStream::new(stream)?;
        let mut occupancy: size_t = 0;
        // SAFETY: valid C strings and out-pointer.
        check(unsafe {
            QB_GetStreamOccupancy(
                s.block.as_ptr(),
                s.item.as_ptr(),
                s.topic.as_ptr(),
                &mut occupancy,
            )
        })?;
        Ok(occupancy)
    }

    fn items(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.names(block, QB_GetItemCount, QB_GetItemNames)
    }

    fn topics(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.names(block, QB_GetTopicCount, QB_GetTopicNames)
    }

    fn pre_cached_items(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.names(block, QB_GetPreCachedItemCount, QB_GetPreCachedItemNames)
    }

    fn pre_cached_topics(&self, block: &str) -> ProviderResult<BTreeSet<String>> {
        self.names(block, QB_GetPreCachedTopicCount, QB_GetPreCachedTopicNames)
    }

    fn add_item(&self, block: &str, item: &str) -> ProviderResult<()> {
        self.membership(block, item, QB_AddItem)
    }

    fn add_topic(&self, block: &str, topic: &str) -> ProviderResult<()> {
        self.membership(block, topic, QB_AddTopic)
    }

    fn remove_item(&self, block: &str, item: &str) -> ProviderResult<()> {
        self.membership(block, item, QB_RemoveItem)
    }

    fn remove_topic(&self, block: &str, topic: &str) -> ProviderResult<()> {
        self.membership(block, topic, QB_RemoveTopic)
    }

    fn topic_type(&self, topic: &str) -> ProviderResult<DataType> {
        let t = c_str(topic)?;
        let mut raw: c_int = -1;
        // SAFETY: valid C string and out-pointer.
        check(unsafe { QB_GetTopicType(t.as_ptr(), &mut raw) })?;
        match raw {
            TYPE_LONG => Ok(DataType::Long),
            TYPE_DOUBLE => Ok(DataType::Double),
            TYPE_STRING => Ok(DataType::String),
            _ => Err(ErrorCode::DATA_TYPE),
        }
    }

    fn get_value(
        &self,
        stream: StreamRef<'_>,
        index: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Sample> {
        let s = CStream::new(stream)?;
        let mut stamps = Stamps::new(1, with_timestamp);
        let (b, i, t) = (s.block.as_ptr(), s.item.as_ptr(), s.topic.as_ptr());
        let indx = index as c_long;

        // SAFETY: every destination is sized for one value.
        let value = match ty {
            DataType::Long => {
                let mut v: i64 = 0;
                check(unsafe { QB_GetLongLong(b, i, t, indx, &mut v, stamps.as_mut_ptr()) })?;
                Value::Long(v)
            }
            DataType::Double => {
                let mut v: f64 = 0.0;
                check(unsafe { QB_GetDouble(b, i, t, indx, &mut v, stamps.as_mut_ptr()) })?;
                Value::Double(v)
            }
            DataType::String => {
                let mut buf = StringBuffers::new(1);
                let dest = buf.ptrs[0];
                check(unsafe {
                    QB_GetString(b, i, t, indx, dest, MAX_STR_SZ, stamps.as_mut_ptr())
                })?;
                Value::Text(buf.into_strings(1).remove(0))
            }
        };
        stamps.attach(vec![value]).pop().ok_or(ErrorCode::GET_DATA)
    }

    fn get_snapshot(
        &self,
        stream: StreamRef<'_>,
        beg: usize,
        end: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<Sample>> {
        let s = CStream::new(stream)?;
        let n = end.checked_sub(beg).ok_or(ErrorCode::BAD_INPUT)? + 1;
        let mut stamps = Stamps::new(n, with_timestamp);
        let (b, i, t) = (s.block.as_ptr(), s.item.as_ptr(), s.topic.as_ptr());
        let (end, beg) = (end as c_long, beg as c_long);

        // SAFETY: destinations hold `n` values; stamps hold `n` or are NULL.
        let values = match ty {
            DataType::Long => {
                let mut v = vec![0i64; n];
                check(unsafe {
                    QB_GetStreamSnapshotLongLongs(
                        b,
                        i,
                        t,
                        v.as_mut_ptr(),
                        n,
                        stamps.as_mut_ptr(),
                        end,
                        beg,
                    )
                })?;
                v.into_iter().map(Value::Long).collect()
            }
            DataType::Double => {
                let mut v = vec![0f64; n];
                check(unsafe {
                    QB_GetStreamSnapshotDoubles(
                        b,
                        i,
                        t,
                        v.as_mut_ptr(),
                        n,
                        stamps.as_mut_ptr(),
                        end,
                        beg,
                    )
                })?;
                v.into_iter().map(Value::Double).collect()
            }
            DataType::String => {
                let mut buf = StringBuffers::new(n);
                check(unsafe {
                    QB_GetStreamSnapshotStrings(
                        b,
                        i,
                        t,
                        buf.as_mut_ptr(),
                        n,
                        MAX_STR_SZ,
                        stamps.as_mut_ptr(),
                        end,
                        beg,
                    )
                })?;
                buf.into_strings(n).into_iter().map(Value::Text).collect()
            }
        };
        Ok(stamps.attach(values))
    }

    fn is_marker_dirty(&self, stream: StreamRef<'_>) -> ProviderResult<bool> {
        let s = CStream::new(stream)?;
        let mut dirty: c_uint = 0;
        // SAFETY: valid C strings and out-pointer.
        check(unsafe {
            QB_IsMarkerDirty(s.block.as_ptr(), s.item.as_ptr(), s.topic.as_ptr(), &mut dirty)
        })?;
        Ok(dirty != 0)
    }

    fn marker_position(&self, stream: StreamRef<'_>) -> ProviderResult<i64> {
        let s = CStream::new(stream)?;
        let mut position: i64 = 0;
        // SAFETY: valid C strings and out-pointer.
        check(unsafe {
            QB_GetMarkerPosition(s.block.as_ptr(), s.item.as_ptr(), s.topic.as_ptr(), &mut position)
        })?;
        Ok(position)
    }

    fn get_snapshot_from_marker(
        &self,
        stream: StreamRef<'_>,
        beg: usize,
        buffer_len: usize,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<MarkerFetch> {
        let s = CStream::new(stream)?;
        let n = buffer_len;
        let mut stamps = Stamps::new(n, with_timestamp);
        let (b, i, t) = (s.block.as_ptr(), s.item.as_ptr(), s.topic.as_ptr());
        let beg = beg as c_long;
        let mut got: c_long = 0;

        // SAFETY: destinations hold `n` values; stamps hold `n` or are NULL.
        let values: Vec<Value> = match ty {
            DataType::Long => {
                let mut v = vec![0i64; n];
                check(unsafe {
                    QB_GetStreamSnapshotLongLongsFromMarker(
                        b,
                        i,
                        t,
                        v.as_mut_ptr(),
                        n,
                        stamps.as_mut_ptr(),
                        beg,
                        &mut got,
                    )
                })?;
                v.into_iter().map(Value::Long).collect()
            }
            DataType::Double => {
                let mut v = vec![0f64; n];
                check(unsafe {
                    QB_GetStreamSnapshotDoublesFromMarker(
                        b,
                        i,
                        t,
                        v.as_mut_ptr(),
                        n,
                        stamps.as_mut_ptr(),
                        beg,
                        &mut got,
                    )
                })?;
                v.into_iter().map(Value::Double).collect()
            }
            DataType::String => {
                let mut buf = StringBuffers::new(n);
                check(unsafe {
                    QB_GetStreamSnapshotStringsFromMarker(
                        b,
                        i,
                        t,
                        buf.as_mut_ptr(),
                        n,
                        MAX_STR_SZ,
                        stamps.as_mut_ptr(),
                        beg,
                        &mut got,
                    )
                })?;
                buf.into_strings(n).into_iter().map(Value::Text).collect()
            }
        };

        // The engine fills the buffer newest first; callers want oldest first.
        let kept = (got.unsigned_abs() as usize).min(n);
        let mut samples = stamps.attach(values);
        samples.truncate(kept);
        samples.reverse();
        Ok(MarkerFetch {
            samples,
            size_got: got as i64,
        })
    }

    fn item_frame(
        &self,
        block: &str,
        topic: &str,
        ty: DataType,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>> {
        let n = self.items(block)?.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let id = c_str(block)?;
        let t = c_str(topic)?;
        let mut labels = StringBuffers::new(n);
        let mut stamps = Stamps::new(n, with_timestamp);

        // SAFETY: value, label and stamp buffers all hold `n` entries.
        let values: Vec<Value> = match ty {
            DataType::Long => {
                let mut v = vec![0i64; n];
                check(unsafe {
                    QB_GetItemFrameLongLongs(
                        id.as_ptr(),
                        t.as_ptr(),
                        v.as_mut_ptr(),
                        n,
                        labels.as_mut_ptr(),
                        MAX_STR_SZ,
                        stamps.as_mut_ptr(),
                    )
                })?;
                v.into_iter().map(Value::Long).collect()
            }
            DataType::Double => {
                let mut v = vec![0f64; n];
                check(unsafe {
                    QB_GetItemFrameDoubles(
                        id.as_ptr(),
                        t.as_ptr(),
                        v.as_mut_ptr(),
                        n,
                        labels.as_mut_ptr(),
                        MAX_STR_SZ,
                        stamps.as_mut_ptr(),
                    )
                })?;
                v.into_iter().map(Value::Double).collect()
            }
            DataType::String => {
                let mut buf = StringBuffers::new(n);
                check(unsafe {
                    QB_GetItemFrameStrings(
                        id.as_ptr(),
                        t.as_ptr(),
                        buf.as_mut_ptr(),
                        n,
                        MAX_STR_SZ,
                        labels.as_mut_ptr(),
                        MAX_STR_SZ,
                        stamps.as_mut_ptr(),
                    )
                })?;
                buf.into_strings(n).into_iter().map(Value::Text).collect()
            }
        };
        Ok(labels
            .into_strings(n)
            .into_iter()
            .zip(stamps.attach(values))
            .collect())
    }

    fn topic_frame(
        &self,
        block: &str,
        item: &str,
        with_timestamp: bool,
    ) -> ProviderResult<Vec<(String, Sample)>> {
        let n = self.topics(block)?.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let id = c_str(block)?;
        let it = c_str(item)?;
        let mut buf = StringBuffers::new(n);
        let mut labels = StringBuffers::new(n);
        let mut stamps = Stamps::new(n, with_timestamp);

        // SAFETY: value, label and stamp buffers all hold `n` entries.
        check(unsafe {
            QB_GetTopicFrameStrings(
                id.as_ptr(),
                it.as_ptr(),
                buf.as_mut_ptr(),
                n,
                MAX_STR_SZ,
                labels.as_mut_ptr(),
                MAX_STR_SZ,
                stamps.as_mut_ptr(),
            )
        })?;
        let values = buf.into_strings(n).into_iter().map(Value::Text).collect();
        Ok(labels
            .into_strings(n)
            .into_iter()
            .zip(stamps.attach(values))
            .collect())
    }

    fn block_limit(&self) -> usize {
        // SAFETY: no arguments.
        unsafe { QB_GetBlockLimit() }
    }

    fn set_block_limit(&self, limit: usize) -> usize {
        // SAFETY: scalar argument.
        unsafe { QB_SetBlockLimit(limit) }
    }

    fn block_count(&self) -> usize {
        // SAFETY: no arguments.
        unsafe { QB_GetBlockCount() }
    }

    fn block_names(&self) -> ProviderResult<Vec<String>> {
        let n = self.block_count();
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut buf = StringBuffers::new(n);
        // SAFETY: `buf` holds `n` slots of `MAX_STR_SZ` bytes each.
        check(unsafe { QB_GetBlockIDs(buf.as_mut_ptr(), n, MAX_STR_SZ) })?;
        Ok(buf.into_strings(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_str_rejects_bad_names() {
        assert!(c_str("SPY").is_ok());
        assert_eq!(c_str("A\0B").unwrap_err(), ErrorCode::BAD_INPUT);
        assert_eq!(c_str(&"X".repeat(MAX_STR_SZ)).unwrap_err(), ErrorCode::BAD_INPUT);
    }

    #[test]
    fn test_string_buffers_decode() {
        let mut buf = StringBuffers::new(2);
        for (slot, text) in buf.storage.iter_mut().zip(["SPY", "QQQ"]) {
            for (dst, src) in slot.iter_mut().zip(text.bytes()) {
                *dst = src as c_char;
            }
        }
        assert_eq!(buf.into_strings(2), vec!["SPY", "QQQ"]);
    }

    #[test]
    fn test_raw_stamp_conversion() {
        let mut raw = RawDateTimeStamp::zeroed();
        raw.ctime_struct.tm_year = 70;
        raw.ctime_struct.tm_mday = 2;
        raw.micro_second = 250;
        let ts = raw.to_stamp();
        assert_eq!(ts.seconds, 86_400);
        assert_eq!(ts.micros, 250);
    }

    #[test]
    fn test_missing_stamps_are_bare() {
        let stamps = Stamps::new(2, false);
        let samples = stamps.attach(vec![Value::Long(1), Value::Long(2)]);
        assert!(samples.iter().all(|s| s.timestamp.is_none()));
    }
}
