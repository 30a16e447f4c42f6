pub mod client;
pub mod query;
pub mod realtime;
pub mod rest;

#[cfg(test)]
pub mod testing;

pub use client::{rows_into, to_row, Backend, BackendClient, ClientOptions, NotifyingClient};
pub use query::{Filter, FilterOp, Order, SelectQuery};
pub use realtime::{
    ChangeCallback, ChangeEvent, ChangeEventType, ChannelSpec, LocalRealtimeHub, RealtimeChannel,
    RealtimeTransport,
};
pub use rest::RestBackendClient;

/// Tables the console reads and writes.
pub mod tables {
    pub const DONATIONS: &str = "donations";
    pub const MEMBERS: &str = "members";
    pub const DONATION_TYPES: &str = "donation_types";
    pub const POSITIONS: &str = "positions";
    pub const POSITION_STATUSES: &str = "position_statuses";
    pub const CHURCHES: &str = "churches";
}
