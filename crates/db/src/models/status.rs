//! Status enums mapping to INTEGER status columns.
//!
//! Each enum variant's discriminant matches the numeric `status_id` stored
//! in the corresponding table; no status literal appears as a bare number
//! outside this module.

/// Status ID type matching the INTEGER status columns.
pub type StatusId = i64;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i64)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Work item lifecycle status.
    ///
    /// Items are created `Pending`, move to `Processing` only via the atomic
    /// claim, and end in `Completed` or `Failed`. `reset_failed` is the one
    /// transition back (`Failed` -> `Pending`).
    WorkItemStatus {
        Pending = 1,
        Processing = 2,
        Completed = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Record batch lifecycle status.
    BatchStatus {
        Processing = 1,
        Completed = 2,
        Finalized = 3,
    }
}

impl WorkItemStatus {
    /// Lowercase name as shown in listings.
    pub fn name(self) -> &'static str {
        match self {
            WorkItemStatus::Pending => "pending",
            WorkItemStatus::Processing => "processing",
            WorkItemStatus::Completed => "completed",
            WorkItemStatus::Failed => "failed",
        }
    }

    /// Reverse lookup from a stored status id.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(WorkItemStatus::Pending),
            2 => Some(WorkItemStatus::Processing),
            3 => Some(WorkItemStatus::Completed),
            4 => Some(WorkItemStatus::Failed),
            _ => None,
        }
    }
}
