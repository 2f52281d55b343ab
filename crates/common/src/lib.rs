pub mod cursor;
pub mod error;
pub mod models;
pub mod query;
pub mod submission;
pub mod upload;

pub use cursor::{PageCursor, PageKey};
pub use error::{Error, Result};
pub use models::{Category, Coordinates, Location, Sighting, Submitter, Weather};
pub use query::{AccessPath, FilterDimension, IndexFilter, ListSightingsParams, SightingQuery};
pub use submission::{NewSighting, SightingSubmission};
pub use upload::{ImageFormat, UploadTarget, UploadUrlParams, UPLOAD_EXPIRES_IN_SECS};
