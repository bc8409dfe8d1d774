pub mod batch_repo;
pub mod work_item_repo;

pub use batch_repo::BatchRepo;
pub use work_item_repo::WorkItemRepo;
