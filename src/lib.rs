pub mod archive;
pub mod codec;
pub mod crc;
pub mod dir;
pub mod error;
pub mod io_stream;
pub mod ktape;
pub mod patch;

pub use archive::{IpkArchive, IpkEntry, PATCH_SENTINEL};
pub use error::IpkError;
pub use io_stream::{Endian, IpkStream};
