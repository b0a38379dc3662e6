//! Drive v3 services.

mod about;
mod files;
mod permissions;
mod upload;

pub use about::AboutService;
pub use files::FilesService;
pub use permissions::PermissionsService;
pub use upload::{ResumableUploadSession, UploadChunkResult, UploadStatus, DEFAULT_CHUNK_SIZE};
