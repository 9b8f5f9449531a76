// Domain models

pub mod nasne;
mod snapshot;

pub use snapshot::Snapshot;
