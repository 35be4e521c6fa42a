//! Repository traits for site store operations.

pub mod files;
pub mod sites;
pub mod uploads;

pub use files::FileRepo;
pub use sites::SiteRepo;
pub use uploads::{SiteUpload, UploadRepo};
