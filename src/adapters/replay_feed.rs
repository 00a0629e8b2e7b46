//! In-memory market data feed.

use std::collections::VecDeque;

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;
use crate::ports::data_port::{Feed, MarketDataPort};

/// Replays a fixed sequence of bars, then reports end of stream forever.
#[derive(Debug, Clone, Default)]
pub struct ReplayFeed {
    bars: VecDeque<Bar>,
}

impl ReplayFeed {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars: bars.into() }
    }

    pub fn remaining(&self) -> usize {
        self.bars.len()
    }
}

impl From<Vec<Bar>> for ReplayFeed {
    fn from(bars: Vec<Bar>) -> Self {
        Self::new(bars)
    }
}

impl MarketDataPort for ReplayFeed {
    fn next_bar(&mut self) -> Result<Feed, EngineError> {
        Ok(self.bars.pop_front().map_or(Feed::EndOfStream, Feed::Bar))
    }
}
