//! Virtualization Window
//!
//! Given the number of displayed rows, a per-index size estimate, measured-size overrides, a
//! viewport extent and a scroll offset, computes the contiguous index range to materialize and
//! each item's cumulative start offset.
//!
//! Item starts are kept in a prefix-sum table (`offsets[i]` is the start of item `i`,
//! `offsets[count]` is the total extent), so offset → index lookup is a binary search.
//! Measurements take precedence over the estimate for their index until the count shrinks below
//! that index.
//!
//! # Example
//!
//! ```rust
//! use treeview_core::{Align, Virtualizer};
//!
//! let mut virtualizer = Virtualizer::new(1_000, 20.0).with_overscan(2);
//! virtualizer.set_viewport(100.0);
//! virtualizer.scroll_to_offset(200.0);
//!
//! let window = virtualizer.window();
//! assert_eq!(window.range, 8..17);
//! assert_eq!(window.total_size, 20_000.0);
//!
//! virtualizer.scroll_to_index(500, Align::Start);
//! assert_eq!(virtualizer.scroll_offset(), 10_000.0);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Where a scrolled-to item should land in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Item start at the viewport start.
    Start,
    /// Item centered.
    Center,
    /// Item end at the viewport end.
    End,
    /// Scroll the minimum distance; no movement if the item is fully visible.
    #[default]
    Auto,
}

/// One materialized item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualItem {
    /// Index in the flattened sequence.
    pub index: usize,
    /// Cumulative start offset.
    pub start: f64,
    /// Size (measured, else estimated).
    pub size: f64,
}

impl VirtualItem {
    /// End offset (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.size
    }
}

/// Range of items to render plus the total scrollable extent.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualWindow {
    /// Indices to materialize, overscan included.
    pub range: Range<usize>,
    /// One entry per index in `range`.
    pub items: Vec<VirtualItem>,
    /// Sum of all item sizes.
    pub total_size: f64,
}

/// Per-index size estimate.
pub type SizeEstimator = Box<dyn Fn(usize) -> f64>;

enum Estimate {
    Fixed(f64),
    Dynamic(SizeEstimator),
}

impl Estimate {
    fn size(&self, index: usize) -> f64 {
        match self {
            Self::Fixed(size) => *size,
            Self::Dynamic(estimate) => sanitize(estimate(index)),
        }
    }
}

fn sanitize(size: f64) -> f64 {
    if size.is_finite() { size.max(0.0) } else { 0.0 }
}

/// Windowed virtualization state.
pub struct Virtualizer {
    count: usize,
    estimate: Estimate,
    measurements: HashMap<usize, f64>,
    overscan: usize,
    enabled: bool,
    viewport: f64,
    scroll_offset: f64,
    offsets: Vec<f64>,
}

impl fmt::Debug for Virtualizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Virtualizer")
            .field("count", &self.count)
            .field("measured", &self.measurements.len())
            .field("overscan", &self.overscan)
            .field("enabled", &self.enabled)
            .field("viewport", &self.viewport)
            .field("scroll_offset", &self.scroll_offset)
            .field("total_size", &self.total_size())
            .finish()
    }
}

impl Virtualizer {
    /// Create a virtualizer for `count` items estimated at `item_size` each.
    pub fn new(count: usize, item_size: f64) -> Self {
        let mut virtualizer = Self {
            count,
            estimate: Estimate::Fixed(sanitize(item_size)),
            measurements: HashMap::new(),
            overscan: 0,
            enabled: true,
            viewport: 0.0,
            scroll_offset: 0.0,
            offsets: Vec::new(),
        };
        virtualizer.rebuild_from(0);
        virtualizer
    }

    /// Set the overscan count.
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Replace the fixed estimate with a per-index estimator.
    pub fn with_estimator<F>(mut self, estimate: F) -> Self
    where
        F: Fn(usize) -> f64 + 'static,
    {
        self.estimate = Estimate::Dynamic(Box::new(estimate));
        self.rebuild_from(0);
        self
    }

    /// Enable or disable windowing. When disabled the window is always the full range.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns `true` if windowing is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the overscan count.
    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
    }

    /// Overscan count.
    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Use a fixed estimate for every unmeasured index.
    pub fn set_item_size(&mut self, item_size: f64) {
        self.estimate = Estimate::Fixed(sanitize(item_size));
        self.rebuild_from(0);
    }

    /// Number of items.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Change the item count. Measurements at or beyond the new count are discarded.
    pub fn set_count(&mut self, count: usize) {
        if count == self.count {
            return;
        }
        self.measurements.retain(|index, _| *index < count);
        let from = self.count.min(count);
        self.count = count;
        self.rebuild_from(from);
        self.clamp_offset();
    }

    /// Drop every measurement.
    pub fn reset_measurements(&mut self) {
        if self.measurements.is_empty() {
            return;
        }
        self.measurements.clear();
        self.rebuild_from(0);
    }

    /// Viewport extent.
    pub fn viewport(&self) -> f64 {
        self.viewport
    }

    /// Set the viewport extent.
    pub fn set_viewport(&mut self, viewport: f64) {
        self.viewport = sanitize(viewport);
        self.clamp_offset();
    }

    /// Current scroll offset.
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Scroll to `offset`, clamped to the scrollable range.
    pub fn scroll_to_offset(&mut self, offset: f64) {
        self.scroll_offset = sanitize(offset);
        self.clamp_offset();
    }

    /// Sum of all item sizes.
    pub fn total_size(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Largest valid scroll offset.
    pub fn max_scroll_offset(&self) -> f64 {
        (self.total_size() - self.viewport).max(0.0)
    }

    /// Size of `index` (measured, else estimated).
    pub fn item_size(&self, index: usize) -> f64 {
        self.measurements
            .get(&index)
            .copied()
            .unwrap_or_else(|| self.estimate.size(index))
    }

    /// Position of `index`, if in range.
    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        if index >= self.count {
            return None;
        }
        Some(VirtualItem {
            index,
            start: self.offsets[index],
            size: self.offsets[index + 1] - self.offsets[index],
        })
    }

    /// Record the rendered size of `index`. Returns `true` if the layout changed.
    pub fn measure(&mut self, index: usize, size: f64) -> bool {
        if index >= self.count || !size.is_finite() {
            return false;
        }
        let size = size.max(0.0);
        if self.item_size(index) == size {
            self.measurements.insert(index, size);
            return false;
        }
        self.measurements.insert(index, size);
        self.rebuild_from(index);
        self.clamp_offset();
        true
    }

    /// Index of the item covering `offset` (the last item for offsets past the end).
    pub fn index_at_offset(&self, offset: f64) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let ends = &self.offsets[1..];
        Some(ends.partition_point(|end| *end <= offset).min(self.count - 1))
    }

    /// The items intersecting the viewport, expanded by overscan.
    pub fn window(&self) -> VirtualWindow {
        let range = self.range();
        let items = range.clone().filter_map(|index| self.item(index)).collect();
        VirtualWindow {
            range,
            items,
            total_size: self.total_size(),
        }
    }

    /// Index range of [`Virtualizer::window`] without materializing the items.
    pub fn range(&self) -> Range<usize> {
        if self.count == 0 {
            return 0..0;
        }
        if !self.enabled || self.viewport <= 0.0 {
            return 0..self.count;
        }

        let (first, last) = self.visible_bounds();
        let start = first.saturating_sub(self.overscan);
        let end = last.saturating_add(self.overscan).min(self.count - 1);
        start..end + 1
    }

    /// First and last index intersecting `[scroll_offset, scroll_offset + viewport)`.
    fn visible_bounds(&self) -> (usize, usize) {
        let offset = self.scroll_offset;
        let first = self.index_at_offset(offset).unwrap_or(0);
        let limit = offset + self.viewport;
        let starts = &self.offsets[..self.count];
        let last = starts
            .partition_point(|start| *start < limit)
            .saturating_sub(1)
            .max(first);
        (first, last)
    }

    /// Scroll so that `index` is placed per `align`. Returns the new offset.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> f64 {
        let Some(item) = self.item(index.min(self.count.saturating_sub(1))) else {
            return self.scroll_offset;
        };

        let target = match align {
            Align::Start => item.start,
            Align::End => item.end() - self.viewport,
            Align::Center => item.start + item.size / 2.0 - self.viewport / 2.0,
            Align::Auto => {
                let view_end = self.scroll_offset + self.viewport;
                if item.start >= self.scroll_offset && item.end() <= view_end {
                    self.scroll_offset
                } else if item.start < self.scroll_offset || item.size > self.viewport {
                    item.start
                } else {
                    item.end() - self.viewport
                }
            }
        };
        self.scroll_to_offset(target);
        self.scroll_offset
    }

    /// Scroll the minimum distance needed to show `index`.
    pub fn scroll_into_view(&mut self, index: usize) -> f64 {
        self.scroll_to_index(index, Align::Auto)
    }

    fn rebuild_from(&mut self, from: usize) {
        let from = from.min(self.count);
        self.offsets.truncate(from + 1);
        if self.offsets.is_empty() {
            self.offsets.push(0.0);
        }
        let mut acc = self.offsets[from];
        for index in from..self.count {
            acc += self.item_size(index);
            self.offsets.push(acc);
        }
    }

    fn clamp_offset(&mut self) {
        self.scroll_offset = self.scroll_offset.clamp(0.0, self.max_scroll_offset());
    }
}
