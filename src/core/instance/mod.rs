pub mod layout;
pub mod manager;
pub mod model;

pub use layout::GameFolder;
pub use manager::InstanceStore;
pub use model::{
    safe_relative_path, validate_instance_id, FileSide, InstanceSummary, LoaderType, Manifest,
    ManifestFile,
};
