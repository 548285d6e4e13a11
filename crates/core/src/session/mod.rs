pub mod connection_session;
pub mod rate_limiter;
pub mod session_manager;
pub mod transport;
