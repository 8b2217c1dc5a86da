pub mod agent;
pub mod capability;
pub mod compose;
pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod registry;
pub mod source;
pub mod types;

pub use error::{CapkitError, Result};
pub use registry::{Registry, RegistryHandle};

#[cfg(test)]
pub(crate) mod test_support;
