//! Process ancestry graph engine: builds an indexed process tree from
//! endpoint events, lays it out, and drives a camera and a request-aware
//! store over it.

pub mod camera;
pub mod data_access;
pub mod graph;
pub mod net;
pub mod store;
pub mod util;

pub use data_access::{DataAccessError, DataAccessLayer};
pub use store::{ResolverAction, ResolverRuntime, ResolverState};
