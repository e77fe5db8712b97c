//! Authentication backends and the session lifecycle

pub mod none;
pub mod session;
pub mod simple;
pub mod strategy;

pub use session::SessionLifecycleHandler;
pub use strategy::{
    select_strategy, wire_strategy, AuthenticationStrategy, IdentitySink, IdentitySource, SessionFlow,
    StrategyWiring,
};
