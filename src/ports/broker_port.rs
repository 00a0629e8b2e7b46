//! Broker / execution gateway port trait.

use crate::domain::error::BrokerError;
use crate::domain::order::{Fill, PricedOrder};

pub trait BrokerPort {
    /// Submit a cost-adjusted order. A returned `Fill` is terminal for the
    /// order; an error means nothing was executed.
    fn submit(&mut self, order: &PricedOrder) -> Result<Fill, BrokerError>;
}

impl<T: BrokerPort + ?Sized> BrokerPort for Box<T> {
    fn submit(&mut self, order: &PricedOrder) -> Result<Fill, BrokerError> {
        (**self).submit(order)
    }
}
