use crate::value::{DateTimeStamp, Value};

/// Simulated market state of one item.
///
/// The [`QuoteFeed`](crate::feed::QuoteFeed) moves these with the
/// [`QuoteGenerator`](crate::quote_generator::QuoteGenerator) and publishes
/// the fields as topic values.
#[derive(Clone, Debug)]
pub struct StockQuote {
    /// Item symbol (e.g., `"SPY"`, `"XLF"`).
    pub ticker: String,

    /// Last traded price.
    pub last: f64,

    /// Best bid.
    pub bid: f64,

    /// Best ask.
    pub ask: f64,

    /// Session high.
    pub high: f64,

    /// Session low.
    pub low: f64,

    /// Size of the last trade.
    pub last_size: i64,

    /// Cumulative session volume.
    pub volume: i64,

    /// Time of the last update.
    pub timestamp: DateTimeStamp,
}

impl StockQuote {
    /// Creates a quote with a random price in `[1, 1000)` and an empty session.
    ///
    /// # Examples
    ///
    /// ```
    /// use quote_streams::stock_quote::StockQuote;
    /// let quote = StockQuote::new("SPY");
    /// assert_eq!(quote.ticker, "SPY");
    /// assert!(quote.bid <= quote.ask);
    /// ```
    pub fn new(ticker: &str) -> Self {
        let last = 1.0 + rand::random::<f64>() * 999.0;
        let mut quote = StockQuote {
            ticker: ticker.to_string(),
            last,
            bid: last,
            ask: last,
            high: last,
            low: last,
            last_size: 0,
            volume: 0,
            timestamp: DateTimeStamp::now(),
        };
        quote.set_last(last);
        quote
    }

    /// Moves the last price, keeping bid/ask one cent around it and the
    /// session range up to date.
    pub fn set_last(&mut self, last: f64) {
        self.last = last;
        self.bid = last - 0.01;
        self.ask = last + 0.01;
        self.high = self.high.max(last);
        self.low = self.low.min(last);
    }

    /// Value of `topic` for this quote, or `None` for topics it does not carry.
    ///
    /// ```
    /// use quote_streams::stock_quote::StockQuote;
    /// use quote_streams::value::Value;
    /// let quote = StockQuote::new("QQQ");
    /// assert_eq!(quote.topic_value("VOLUME"), Some(Value::Long(0)));
    /// assert_eq!(quote.topic_value("NOPE"), None);
    /// ```
    pub fn topic_value(&self, topic: &str) -> Option<Value> {
        let value = match topic {
            "LAST" => Value::Double(self.last),
            "BID" => Value::Double(self.bid),
            "ASK" => Value::Double(self.ask),
            "HIGH" => Value::Double(self.high),
            "LOW" => Value::Double(self.low),
            "MARK" => Value::Double((self.bid + self.ask) / 2.0),
            "VOLUME" => Value::Long(self.volume),
            "LAST_SIZE" => Value::Long(self.last_size),
            "BID_SIZE" | "ASK_SIZE" => Value::Long(100),
            "DESCRIPTION" => Value::Text(format!("{} simulated", self.ticker)),
            _ => return None,
        };
        Some(value)
    }
}
