pub mod batch;
pub mod status;
pub mod work_item;

pub use batch::{NewRecord, RecordBatch, StoredRecord};
pub use status::{BatchStatus, StatusId, WorkItemStatus};
pub use work_item::WorkItem;
