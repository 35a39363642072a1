pub mod blob;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use blob::BlobBackend;
pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
