//! Tick bookkeeping for the double-buffer reader

/// How a published tick relates to the last one the reader observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOrder {
    /// A row newer than anything observed so far.
    Newer,
    /// The row that was already observed.
    Same,
    /// The writer's counter went backwards (restart or reset).
    Older,
}

/// Last tick observed by a reader.
///
/// Starts at the "infinite" sentinel, so the first tick seen after a connect
/// or reset classifies as [`TickOrder::Older`] and only resynchronises the
/// cursor. Rows are emitted from the following tick on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCursor {
    last: Option<i32>,
}

impl TickCursor {
    /// A cursor at the sentinel.
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Last observed tick, `None` while at the sentinel.
    pub fn last(&self) -> Option<i32> {
        self.last
    }

    /// Classify `tick` against the last observed one.
    pub fn classify(&self, tick: i32) -> TickOrder {
        match self.last {
            None => TickOrder::Older,
            Some(last) if tick > last => TickOrder::Newer,
            Some(last) if tick == last => TickOrder::Same,
            Some(_) => TickOrder::Older,
        }
    }

    /// Record `tick` as observed.
    pub fn observe(&mut self, tick: i32) {
        self.last = Some(tick);
    }

    /// Return to the sentinel.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
