use thiserror::Error;

use super::entities::{CategoryId, EntryId};

/// Why a history record couldn't be credited to a category. These are expected outcomes of
/// racing user actions, not faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignError {
    #[error("history record {0} was not found")]
    NotFound(EntryId),
    #[error("history record {0} is already saved to a category")]
    AlreadyAssigned(EntryId),
    #[error("no categories exist, create one first")]
    NoCategoriesExist,
    #[error("category {0} does not exist")]
    UnknownCategory(CategoryId),
}
