// # Local Environment Stores
//
// Implementations of the EnvironmentApi trait that keep variables locally
// instead of on a remote platform.

pub mod memory;

pub use memory::MemoryEnvironment;
