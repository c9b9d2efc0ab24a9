pub mod jsonl_source;
pub mod vec_source;

pub use jsonl_source::JsonlSource;
pub use vec_source::VecSource;

use crate::script::ScriptItem;
use crate::DataError;

/// Sequential reader of script items
pub trait ScriptSource: Send {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Next item, or `Ok(None)` at the end of the script.
    ///
    /// A non-fatal error (see [`DataError::is_fatal`]) costs only the item
    /// that raised it; reading may continue.
    fn next_item(&mut self) -> Result<Option<ScriptItem>, DataError>;

    /// Total size of the script in progress units, if known
    fn total_units(&self) -> Option<u64>;

    /// Progress units consumed so far
    fn consumed_units(&self) -> u64;
}
