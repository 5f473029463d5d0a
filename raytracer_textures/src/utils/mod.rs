//! Shared utilities

pub mod pending;
pub mod slot_allocator;
pub mod spawner;

pub use pending::{pending, Completer, Pending};
pub use slot_allocator::SlotAllocator;
pub use spawner::{Job, Spawner};
