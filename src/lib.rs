//! # Quote Streams
//!
//! Client-side accessor for a remote quote-stream engine.
//!
//! The engine (fed by a trading platform) keeps named **blocks**. A block
//! holds one fixed-capacity circular stream per (item, topic) pair, e.g.
//! (`"SPY"`, `"LAST"`). This crate wraps one block in a [`Block`] that
//! validates names, normalizes indices and delegates every data transfer
//! to an injected [`RemoteProvider`].
//!
//! ## Features
//!
//! - Create, resize and close engine blocks.
//! - Add and remove items and topics, with a client-side membership cache
//!   that follows the engine's pre-cache semantics.
//! - Read single values, ranged snapshots and incremental marker reads,
//!   optionally with timestamps.
//! - Item, topic and total frames.
//! - An in-process [`SimulatedProvider`] plus a [`QuoteFeed`] that writes
//!   random quotes into it from a background thread.
//! - A native adapter behind the `native` feature.
//!
//! ## Architecture Overview
//!
//! - [`block`](crate::block): The `Block` accessor.
//! - [`provider`](crate::provider): The `RemoteProvider` seam.
//! - [`membership`](crate::membership): Cached item/topic sets.
//! - [`index`](crate::index): Index and range normalization.
//! - [`value`](crate::value): Values, timestamps and typed data points.
//! - [`sim`](crate::sim): In-process engine.
//! - [`feed`](crate::feed): Background quote writer for the simulator.
//! - [`stock_quote`](crate::stock_quote): Simulated quote state.
//! - [`quote_generator`](crate::quote_generator): Random price steps.
//! - [`config`](crate::config): Block parameters and watchlists.
//! - [`defs`](crate::defs): Shared constants.
//! - [`errors`](crate::errors): Error codes and error types.
//!
//! ## Indexing
//!
//! Index `0` is the most recent value of a stream. Negative indices count
//! from the oldest end of the capacity, so `-1` is `size - 1`.
//! Snapshots come back most recent first; marker reads come back oldest
//! first.
//!
//! ## Marker Reads
//!
//! Every stream carries a marker that remembers how far the client has
//! read. [`Block::snapshot_from_marker`] returns everything written since
//! the previous marker read. If the writer lapped the marker in between,
//! the read fails with [`StreamError::DirtyMarker`] unless
//! [`LossPolicy::Ignore`] is passed.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use quote_streams::block::{Block, LossPolicy};
//! use quote_streams::config::BlockConfig;
//! use quote_streams::sim::SimulatedProvider;
//! use quote_streams::value::Value;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(SimulatedProvider::new());
//!     let block = Block::create(engine.clone(), BlockConfig::with_size(100).timestamps(true))?;
//!     block.add_item("SPY")?;
//!     block.add_topic("VOLUME")?;
//!
//!     for v in [100, 250, 400] {
//!         engine.publish("SPY", "VOLUME", Value::Long(v));
//!     }
//!
//!     let fresh = block.snapshot_from_marker::<i64>("SPY", "VOLUME", 0, LossPolicy::Fail)?;
//!     let values: Vec<i64> = fresh.iter().map(|p| p.value).collect();
//!     assert_eq!(values, vec![100, 250, 400]);
//!
//!     block.close()?;
//!     Ok(())
//! }
//! ```
//!
//! [`Block`]: crate::block::Block
//! [`Block::snapshot_from_marker`]: crate::block::Block::snapshot_from_marker
//! [`RemoteProvider`]: crate::provider::RemoteProvider
//! [`SimulatedProvider`]: crate::sim::SimulatedProvider
//! [`QuoteFeed`]: crate::feed::QuoteFeed
//! [`StreamError::DirtyMarker`]: crate::errors::StreamError::DirtyMarker
//! [`LossPolicy::Ignore`]: crate::block::LossPolicy::Ignore

#![warn(missing_docs)]
#![deny(unreachable_pub)]

pub mod block;
pub mod config;
pub mod defs;
pub mod errors;
pub mod feed;
#[cfg(feature = "native")]
pub mod ffi;
pub mod index;
pub mod membership;
pub mod provider;
pub mod quote_generator;
pub mod sim;
pub mod stock_quote;
pub mod value;

#[cfg(test)]
mod testing;
