//! Stream index arithmetic.
//!
//! Index `0` is the most recent slot of a stream and `capacity - 1` the
//! oldest. Negative indices count from the other end (`-1` is the last
//! slot, `-capacity` the first), so every valid slot has exactly two
//! spellings.

use crate::errors::StreamError;

/// Translates a possibly negative index into an absolute slot.
///
/// # Errors
/// [`StreamError::IndexOutOfRange`] when the index is below `-capacity` or
/// at/above `capacity`.
pub fn normalize(index: i64, capacity: usize) -> Result<usize, StreamError> {
    let cap = capacity as i64;
    let absolute = if index < 0 { index + cap } else { index };
    if absolute < 0 || absolute >= cap {
        return Err(StreamError::IndexOutOfRange { index, capacity });
    }
    Ok(absolute as usize)
}

/// Normalized `[beg, end]` range with its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    /// First (most recent) slot.
    pub beg: usize,
    /// Last (oldest) slot, inclusive.
    pub end: usize,
    /// `end - beg + 1`.
    pub size: usize,
}

/// Normalizes both ends of a range independently and checks it is non-empty.
pub fn normalize_range(beg: i64, end: i64, capacity: usize) -> Result<Range, StreamError> {
    let b = normalize(beg, capacity)?;
    let e = normalize(end, capacity)?;
    if e < b {
        return Err(StreamError::IndexOutOfRange {
            index: end,
            capacity,
        });
    }
    Ok(Range {
        beg: b,
        end: e,
        size: e - b + 1,
    })
}

/// Outcome of clamping a range to what a stream actually holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// Nothing to read: the stream is empty or shorter than `beg`.
    Empty,
    /// Range that fits inside the occupied part of the stream.
    Range(Range),
}

/// Clamps an already-normalized range to the stream's occupancy.
///
/// Runs after [`normalize_range`]; a short stream yields a shorter range or
/// [`Resolved::Empty`], never an error.
pub fn resolve_range(beg: usize, end: usize, occupancy: usize) -> Resolved {
    if occupancy == 0 || occupancy <= beg {
        return Resolved::Empty;
    }
    let last = occupancy - 1;
    let end = end.min(last);
    let beg = beg.min(last);
    Resolved::Range(Range {
        beg,
        end,
        size: end - beg + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_negative_index_wraps() {
        assert_eq!(normalize(-1, 10).unwrap(), 9);
        assert_eq!(normalize(-10, 10).unwrap(), 0);
        assert_eq!(normalize(3, 10).unwrap(), 3);
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            normalize(10, 10),
            Err(StreamError::IndexOutOfRange {
                index: 10,
                capacity: 10
            })
        ));
        assert!(normalize(-11, 10).is_err());
        assert!(normalize(0, 0).is_err());
    }

    #[test]
    fn test_range_requires_positive_size() {
        let range = normalize_range(2, -1, 10).unwrap();
        assert_eq!(range, Range { beg: 2, end: 9, size: 8 });

        assert!(normalize_range(5, 4, 10).is_err());
        assert!(normalize_range(-1, 0, 10).is_err());
        assert_eq!(normalize_range(4, 4, 10).unwrap().size, 1);
    }

    #[test]
    fn test_resolve_without_clamping() {
        assert_eq!(
            resolve_range(0, 4, 10),
            Resolved::Range(Range { beg: 0, end: 4, size: 5 })
        );
    }

    #[test]
    fn test_resolve_clamps_end_to_occupancy() {
        assert_eq!(
            resolve_range(0, 9, 5),
            Resolved::Range(Range { beg: 0, end: 4, size: 5 })
        );
    }

    #[test]
    fn test_resolve_empty_when_beg_past_occupancy() {
        assert_eq!(resolve_range(5, 9, 5), Resolved::Empty);
        assert_eq!(
            resolve_range(4, 9, 5),
            Resolved::Range(Range { beg: 4, end: 4, size: 1 })
        );
    }

    proptest! {
        #[test]
        fn prop_valid_indices_normalize(cap in 1usize..5000, offset in 0usize..5000) {
            let cap_i = cap as i64;
            let index = (offset % (2 * cap)) as i64 - cap_i;
            let slot = normalize(index, cap).unwrap();
            prop_assert!(slot < cap);
        }

        #[test]
        fn prop_negative_wraps_to_positive(cap in 1usize..5000, offset in 1usize..5000) {
            let index = -(((offset - 1) % cap) as i64) - 1;
            prop_assert_eq!(
                normalize(index, cap).unwrap(),
                normalize(index + cap as i64, cap).unwrap()
            );
        }

        #[test]
        fn prop_outside_indices_fail(
            cap in 1usize..5000,
            beyond in 0i64..100_000,
            low in any::<bool>(),
        ) {
            let cap_i = cap as i64;
            let index = if low { -cap_i - 1 - beyond } else { cap_i + beyond };
            let is_out_of_range = matches!(
                normalize(index, cap),
                Err(StreamError::IndexOutOfRange { .. })
            );
            prop_assert!(is_out_of_range);
        }

        #[test]
        fn prop_empty_stream_resolves_empty(beg in 0usize..1000, len in 0usize..1000) {
            prop_assert_eq!(resolve_range(beg, beg + len, 0), Resolved::Empty);
        }

        #[test]
        fn prop_resolved_range_fits_occupancy(
            beg in 0usize..1000,
            len in 0usize..1000,
            occ in 1usize..1000,
        ) {
            match resolve_range(beg, beg + len, occ) {
                Resolved::Empty => prop_assert!(occ <= beg),
                Resolved::Range(r) => {
                    prop_assert!(r.end < occ);
                    prop_assert_eq!(r.size, r.end - r.beg + 1);
                }
            }
        }
    }
}
