//! Recording asset adapters

mod fs;

pub use fs::FsAssetStore;
