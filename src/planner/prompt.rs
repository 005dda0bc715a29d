#[cfg(test)]
use mockall::automock;

use super::{
    entities::{Category, CategoryId},
    timer::HistoryRecord,
};

/// Asks the user where a stopped timer session should be credited. Returning `None` means the
/// user cancelled and nothing is changed.
#[cfg_attr(test, automock)]
pub trait CategoryPrompt {
    fn choose_category(
        &mut self,
        record: &HistoryRecord,
        categories: &[Category],
    ) -> Option<CategoryId>;
}
