// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pending-point buffer and batch splitting.

/// Split encoded lines into consecutive batches of at most `size` lines.
///
/// Empty input yields no batches. Order is preserved and no line is
/// duplicated or dropped. A `size` of zero is treated as one.
pub fn create_batches(points: Vec<String>, size: usize) -> Vec<Vec<String>> {
    if points.is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    if points.len() <= size {
        return vec![points];
    }

    let mut batches = Vec::with_capacity(points.len().div_ceil(size));
    let mut iter = points.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }
    batches
}

/// Encoded lines waiting for the next flush.
///
/// Owned by the reporter; drained in one step by [`PendingPoints::take`].
#[derive(Debug, Default)]
pub struct PendingPoints {
    lines: Vec<String>,
}

impl PendingPoints {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one encoded line.
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    /// True once the buffer holds more than `threshold` lines.
    pub fn exceeds(&self, threshold: usize) -> bool {
        self.lines.len() > threshold
    }

    /// Take every buffered line, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    /// Buffered lines, oldest first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Get the current number of buffered lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{}", i)).collect()
    }

    #[test]
    fn test_empty_input_gives_no_batches() {
        assert!(create_batches(Vec::new(), 100).is_empty());
    }

    #[test]
    fn test_small_input_single_batch() {
        let batches = create_batches(lines(3), 100);
        assert_eq!(batches, vec![lines(3)]);

        let exact = create_batches(lines(100), 100);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].len(), 100);
    }

    #[test]
    fn test_split_with_remainder() {
        let input = lines(250);
        let batches = create_batches(input.clone(), 100);

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches.concat(), input);
    }

    #[test]
    fn test_zero_size_treated_as_one() {
        let batches = create_batches(lines(2), 0);
        assert_eq!(batches, vec![vec!["p0".to_string()], vec!["p1".to_string()]]);
    }

    #[test]
    fn test_pending_threshold_and_take() {
        let mut buf = PendingPoints::new();
        assert!(buf.is_empty());
        assert!(!buf.exceeds(0));

        buf.push("a".to_string());
        buf.push("b".to_string());
        assert_eq!(buf.len(), 2);
        assert!(buf.exceeds(1));
        assert!(!buf.exceeds(2));
        assert_eq!(buf.lines(), &["a".to_string(), "b".to_string()]);

        let taken = buf.take();
        assert_eq!(taken, vec!["a", "b"]);
        assert!(buf.is_empty());
    }
}
