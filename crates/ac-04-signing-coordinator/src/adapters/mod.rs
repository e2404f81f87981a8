//! In-memory adapters for every coordinator port.

pub mod checkpoint_store;
pub mod identity;
pub mod network;
pub mod policy;
pub mod vault;

pub use checkpoint_store::InMemoryCheckpointStore;
pub use identity::LocalKeyVault;
pub use network::{ChannelSession, InMemoryNetwork, NetworkOpener};
pub use policy::IouResponderPolicy;
pub use vault::InMemoryVault;
