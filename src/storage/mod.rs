//! Persistence.
//!
//! The client state is two JSON arrays in a [`KeyValueStore`]: the memory
//! collection under [`MEMORIES_KEY`] and the chat history under
//! [`HISTORY_KEY`]. [`FileKeyValueStore`] keeps them as files in the data
//! directory; [`InMemoryKeyValueStore`] serves tests.

mod filesystem;
mod memory;
mod state;
mod traits;

pub use filesystem::{FileKeyValueStore, MAX_FILE_SIZE};
pub use memory::InMemoryKeyValueStore;
pub use state::{ClientState, HISTORY_KEY, MEMORIES_KEY};
pub use traits::KeyValueStore;
