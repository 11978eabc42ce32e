// Re-export all model types from submodules.

pub use app::{ActionKind, TableId, ViewRegion};
pub use client::{ClientState, ClientStatus};
pub use container::{ContainerInfo, ContainerState};
pub use snapshot::{Keyed, ResourceSnapshot};
pub use stats::ServerStat;
pub(crate) use stats::ratio_percent;

mod app;
mod client;
mod container;
mod snapshot;
mod stats;
