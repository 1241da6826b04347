pub mod archive;
pub mod creator;
pub mod metadata;
pub mod props;
pub mod receipt;
pub mod recipe;
pub mod update;

pub use archive::{LoadError, LocatedManifest, PackageArchive};
pub use metadata::{Metadata, MetadataError};
pub use recipe::Recipe;
pub use update::is_update;
