//! Effect interfaces consumed by the coordination core
//!
//! These traits describe the outside world the session talks to. The core
//! consumes them and never implements them; production implementations live
//! in the surrounding application, test implementations in `stemma-testkit`.

pub mod gateway;

pub use gateway::{
    Candidate, GatewayError, PersistenceGateway, SaveReply, SaveRequest,
};
