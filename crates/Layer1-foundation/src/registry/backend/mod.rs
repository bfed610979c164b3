mod descriptor;
mod strategy;

pub use descriptor::{
    builtin_backends, BackendDescriptor, DEFAULT_TIMEOUT_MS, RESERVED_BACKEND_NAMES,
};
pub use strategy::ArgStrategy;
