mod health_check;
mod newsletters;
mod subscribers;
mod subscriptions;
mod welcome;

pub use health_check::*;
pub use newsletters::*;
pub use subscribers::*;
pub use subscriptions::*;
pub use welcome::*;
