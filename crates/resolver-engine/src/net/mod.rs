pub mod uds;

pub use uds::UdsDataAccessLayer;
