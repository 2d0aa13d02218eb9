use crate::errors::QuoteGeneratorError;
use crate::stock_quote::StockQuote;
use crate::value::DateTimeStamp;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use rayon::prelude::*;

/// A parallel random quote generator.
///
/// This generator updates quotes in parallel using [`rayon`].
/// Each thread creates its own RNG (`StdRng`), ensuring thread safety.
#[derive(Debug)]
pub struct QuoteGenerator {
    /// Volatility (standard deviation) of the log-normal price distribution.
    volatility: f64,
}

impl QuoteGenerator {
    /// Creates a new quote generator.
    ///
    /// # Arguments
    /// * `volatility`: price fluctuation factor (must be in `(0, 1]`).
    ///
    /// # Errors
    /// Returns [`QuoteGeneratorError::InvalidVolatility`] if `volatility <= 0.0` or `> 1.0`.
    pub fn new(volatility: f64) -> Result<Self, QuoteGeneratorError> {
        if volatility <= 0.0 || volatility > 1.0 {
            return Err(QuoteGeneratorError::InvalidVolatility(volatility));
        }
        Ok(Self { volatility })
    }

    /// Updates quotes from any mutable iterator.
    ///
    /// Works with slices, `Vec`, `HashMap::values_mut`, or any other
    /// container that provides an iterator over `&mut StockQuote`.
    pub fn update_quotes<'a, I>(&self, quotes: I) -> Result<(), QuoteGeneratorError>
    where
        I: IntoIterator<Item = &'a mut StockQuote>,
        I::IntoIter: Send + 'a,
    {
        let log_normal = LogNormal::new(0.0, self.volatility)?;

        quotes.into_iter().par_bridge().for_each(|quote| {
            let mut rng = StdRng::from_entropy();
            update_single_quote(quote, &mut rng, &log_normal);
        });

        Ok(())
    }
}

/// Applies one random price step and a random trade to a quote.
fn update_single_quote(quote: &mut StockQuote, rng: &mut StdRng, log_normal: &LogNormal<f64>) {
    let multiplier = log_normal.sample(rng);
    quote.set_last(quote.last * multiplier);

    quote.last_size = match quote.ticker.as_str() {
        "SPY" | "QQQ" | "XLF" => rng.gen_range(1000..6000),
        _ => rng.gen_range(100..1100),
    };
    quote.volume += quote.last_size;
    quote.timestamp = DateTimeStamp::now();
}
