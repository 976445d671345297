//! Terra API service implementations.
//!
//! - Store: temporary storage credentials and upload registration
//! - Resources: create, get, list and delete resources
//! - Jobs: create, start, get and list reconstruction jobs
//! - Files: get, list and delete files

mod files;
mod jobs;
mod resources;
mod store;

pub use files::FilesService;
pub use jobs::JobsService;
pub use resources::ResourcesService;
pub use store::StoreService;
