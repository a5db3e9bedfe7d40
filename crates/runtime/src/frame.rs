/// One full re-render of the map.
///
/// Every store mutation triggers a new pass; there is no incremental diffing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Frame {
    /// 0-based render-pass index.
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1)
    }
}

/// Hands out consecutive frames.
#[derive(Debug, Default)]
pub struct FrameCounter {
    last: Option<Frame>,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Frame {
        let frame = self.last.map_or(Frame::new(0), Frame::next);
        self.last = Some(frame);
        frame
    }

    /// Most recently started pass, if any.
    pub fn last(&self) -> Option<Frame> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, FrameCounter};

    #[test]
    fn next_advances_index() {
        assert_eq!(Frame::new(0).next(), Frame::new(1));
    }

    #[test]
    fn counter_starts_at_zero() {
        let mut c = FrameCounter::new();
        assert_eq!(c.last(), None);
        assert_eq!(c.begin().index, 0);
        assert_eq!(c.begin().index, 1);
        assert_eq!(c.last(), Some(Frame::new(1)));
    }
}
