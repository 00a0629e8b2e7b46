//! Market data port trait.

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;

/// One pull from a market data source. End of stream is explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    Bar(Bar),
    EndOfStream,
}

pub trait MarketDataPort {
    /// Next bar in timestamp order. Implementations report unreadable or
    /// missing timestamps as [`EngineError::DataGap`].
    fn next_bar(&mut self) -> Result<Feed, EngineError>;
}

impl<T: MarketDataPort + ?Sized> MarketDataPort for Box<T> {
    fn next_bar(&mut self) -> Result<Feed, EngineError> {
        (**self).next_bar()
    }
}
