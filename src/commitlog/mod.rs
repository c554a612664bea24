mod in_memory;
mod log;

pub use in_memory::InMemoryLog;
pub use log::index_as_u64;
pub use log::Entry;
pub use log::EntryDecodeError;
pub use log::Index;
pub use log::Log;
