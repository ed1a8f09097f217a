//! Pure chunk arithmetic for the playback engine.
//!
//! Seek targets, skip clamping, and progress decades are plain functions
//! over `(index, total)` so their edge cases are testable without a
//! transport or a runtime.

/// Chunk index a seek percentage lands on.
///
/// `floor(percentage / 100 * total)`, clamped to the final chunk so 100%
/// (and anything above, positive infinity included) resolves to the last
/// index rather than one past the end. NaN and negative percentages resolve
/// to the first chunk. Returns `None` when there are no chunks to seek
/// within.
pub fn seek_target(percentage: f64, total_chunks: usize) -> Option<usize> {
    if total_chunks == 0 {
        return None;
    }
    if percentage.is_nan() || percentage <= 0.0 {
        return Some(0);
    }
    // Float-to-int casts saturate, so infinity clamps to the last chunk
    let raw = (percentage / 100.0 * total_chunks as f64).floor() as usize;
    Some(raw.min(total_chunks - 1))
}

/// Next chunk index, clamped to the final chunk.
pub fn skip_forward(current: usize, total_chunks: usize) -> usize {
    if total_chunks == 0 {
        return 0;
    }
    (current + 1).min(total_chunks - 1)
}

/// Previous chunk index, clamped to the first chunk.
pub fn skip_back(current: usize) -> usize {
    current.saturating_sub(1)
}

/// Percentage represented by standing at the start of `index`.
///
/// Computed as one division so even splits (10 of 20, 3 of 25) come out
/// exact instead of a hair under the decade boundary.
pub fn progress_percentage(index: usize, total_chunks: usize) -> f64 {
    if total_chunks == 0 {
        return 0.0;
    }
    (index as f64 * 100.0) / total_chunks as f64
}

/// 10%-decade a percentage falls in: 0 for [0,10), 1 for [10,20), 10 for 100.
pub fn decade(percentage: f64) -> u8 {
    if !percentage.is_finite() || percentage <= 0.0 {
        return 0;
    }
    ((percentage.min(100.0).floor() as u32) / 10) as u8
}

/// Whether arriving at `next` warrants a progress write.
///
/// Writes happen only when the decade changes from the last persisted one;
/// a fresh session (`None`) always writes its first decade.
pub fn crosses_decade(last_persisted: Option<u8>, next: u8) -> bool {
    last_persisted != Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_target_boundaries() {
        assert_eq!(seek_target(0.0, 10), Some(0));
        assert_eq!(seek_target(50.0, 10), Some(5));
        assert_eq!(seek_target(99.9, 10), Some(9));
        assert_eq!(seek_target(100.0, 10), Some(9));
        assert_eq!(seek_target(250.0, 10), Some(9));
    }

    #[test]
    fn test_seek_target_floors() {
        // 25% of 8 chunks is exactly chunk 2
        assert_eq!(seek_target(25.0, 8), Some(2));
        // 26% of 8 chunks floors back down to chunk 2
        assert_eq!(seek_target(26.0, 8), Some(2));
        assert_eq!(seek_target(37.4, 8), Some(2));
        assert_eq!(seek_target(37.5, 8), Some(3));
    }

    #[test]
    fn test_seek_target_degenerate_inputs() {
        assert_eq!(seek_target(50.0, 0), None);
        assert_eq!(seek_target(-5.0, 10), Some(0));
        assert_eq!(seek_target(f64::NAN, 10), Some(0));
        assert_eq!(seek_target(f64::NEG_INFINITY, 10), Some(0));
        assert_eq!(seek_target(f64::INFINITY, 10), Some(9));
        assert_eq!(seek_target(1e9, 10), Some(9));
        assert_eq!(seek_target(100.0, 1), Some(0));
    }

    #[test]
    fn test_skip_clamps() {
        assert_eq!(skip_forward(3, 10), 4);
        assert_eq!(skip_forward(9, 10), 9);
        assert_eq!(skip_forward(0, 0), 0);
        assert_eq!(skip_back(3), 2);
        assert_eq!(skip_back(0), 0);
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(progress_percentage(0, 10), 0.0);
        assert_eq!(progress_percentage(5, 10), 50.0);
        assert_eq!(progress_percentage(9, 10), 90.0);
        assert_eq!(progress_percentage(0, 0), 0.0);
        assert!((progress_percentage(1, 3) - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_decade_assignment() {
        assert_eq!(decade(0.0), 0);
        assert_eq!(decade(9.99), 0);
        assert_eq!(decade(10.0), 1);
        assert_eq!(decade(55.0), 5);
        assert_eq!(decade(99.9), 9);
        assert_eq!(decade(100.0), 10);
        assert_eq!(decade(-3.0), 0);
    }

    #[test]
    fn test_crosses_decade() {
        assert!(crosses_decade(None, 0));
        assert!(crosses_decade(Some(0), 1));
        assert!(!crosses_decade(Some(1), 1));
        // Backward jumps also rewrite; monotonicity is broken only by
        // explicit seek or stop, which is exactly when this fires
        assert!(crosses_decade(Some(5), 2));
    }

    #[test]
    fn test_decade_writes_over_natural_run() {
        // 25 chunks: a write on the first chunk of each decade, nowhere else
        let total = 25;
        let mut last: Option<u8> = None;
        let mut writes = Vec::new();
        for index in 0..total {
            let d = decade(progress_percentage(index, total));
            if crosses_decade(last, d) {
                writes.push(index);
                last = Some(d);
            }
        }
        assert_eq!(writes, vec![0, 3, 5, 8, 10, 13, 15, 18, 20, 23]);
    }
}
