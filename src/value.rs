use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Native storage type of a topic's stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer (sizes, volumes).
    Long,
    /// 64-bit float (prices).
    Double,
    /// Text (descriptions, exchange names).
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Long => "long",
            DataType::Double => "double",
            DataType::String => "string",
        };
        f.write_str(name)
    }
}

/// Untyped value held in a stream slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Integer value.
    Long(i64),
    /// Floating-point value.
    Double(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Storage type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Long(_) => DataType::Long,
            Value::Double(_) => DataType::Double,
            Value::Text(_) => DataType::String,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// Engine-side write time of a data point, with microsecond resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTimeStamp {
    /// Whole seconds since the UNIX epoch.
    pub seconds: i64,
    /// Sub-second part, `0..1_000_000`.
    pub micros: u32,
}

impl DateTimeStamp {
    /// Builds a stamp from a [`SystemTime`]; times before the epoch clamp to zero.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            seconds: since.as_secs() as i64,
            micros: since.subsec_micros(),
        }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Microseconds since the UNIX epoch.
    pub fn as_micros(&self) -> i64 {
        self.seconds * 1_000_000 + self.micros as i64
    }
}

impl fmt::Display for DateTimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.seconds, self.micros)
    }
}

/// One stream slot: a value plus its timestamp when the block records them.
///
/// `T` is the requested Rust type; [`Sample`] is the untyped form the
/// provider hands back.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint<T = Value> {
    /// The stored value.
    pub value: T,
    /// Write time; `None` for blocks created without timestamps.
    pub timestamp: Option<DateTimeStamp>,
}

/// Untyped data point as returned by a [`RemoteProvider`](crate::provider::RemoteProvider).
pub type Sample = DataPoint<Value>;

impl<T> DataPoint<T> {
    /// Point without a timestamp.
    pub fn bare(value: T) -> Self {
        Self {
            value,
            timestamp: None,
        }
    }

    /// Point carrying a timestamp.
    pub fn stamped(value: T, timestamp: DateTimeStamp) -> Self {
        Self {
            value,
            timestamp: Some(timestamp),
        }
    }
}

/// Rust types a stream can be read as.
///
/// Each implementor names the [`DataType`] it asks the provider for and
/// knows how to unwrap the matching [`Value`].
pub trait StreamValue: Sized {
    /// Type requested from the provider.
    const DATA_TYPE: DataType;

    /// Extracts `Self` from a provider value; `None` on a type mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl StreamValue for i64 {
    const DATA_TYPE: DataType = DataType::Long;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Long(v) => Some(v),
            _ => None,
        }
    }
}

impl StreamValue for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
}

impl StreamValue for String {
    const DATA_TYPE: DataType = DataType::String;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl StreamValue for Value {
    // Untyped reads go through the text representation, which every topic supports.
    const DATA_TYPE: DataType = DataType::String;

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl Sample {
    /// Converts the untyped sample into `T`, keeping the timestamp.
    pub fn typed<T: StreamValue>(self) -> Option<DataPoint<T>> {
        Some(DataPoint {
            value: T::from_value(self.value)?,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_typed_conversion_matches_type() {
        let sample = DataPoint::bare(Value::Double(12.5));
        let point = sample.clone().typed::<f64>().unwrap();
        assert_eq!(point.value, 12.5);
        assert!(point.timestamp.is_none());

        assert!(sample.typed::<i64>().is_none());
    }

    #[test]
    fn test_typed_keeps_timestamp() {
        let ts = DateTimeStamp {
            seconds: 1_700_000_000,
            micros: 42,
        };
        let point = DataPoint::stamped(Value::Long(7), ts).typed::<i64>().unwrap();
        assert_eq!(point.value, 7);
        assert_eq!(point.timestamp, Some(ts));
    }

    #[test]
    fn test_stamp_from_system_time() {
        let time = UNIX_EPOCH + Duration::from_micros(1_500_000_123);
        let ts = DateTimeStamp::from_system_time(time);
        assert_eq!(ts.seconds, 1500);
        assert_eq!(ts.micros, 123);
        assert_eq!(ts.as_micros(), 1_500_000_123);
        assert_eq!(ts.to_string(), "1500.000123");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Long(-3).to_string(), "-3");
        assert_eq!(Value::Text("NYSE".into()).to_string(), "NYSE");
        assert_eq!(Value::Double(1.5).data_type(), DataType::Double);
    }
}
