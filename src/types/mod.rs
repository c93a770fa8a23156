pub mod vector;
pub mod preset;
pub mod results;
pub mod session;
pub mod tasks;

pub use vector::{magnitude, subtract, TimestampedSample, Vector3};
pub use preset::{FlailType, PresetCatalog, PresetSpec};
pub use results::{Comparison, GradeLevel, MeasurementResult, ResultPath, SaveResult, UploadRecord};
pub use session::SessionRecord;
pub use tasks::StoreTask;
