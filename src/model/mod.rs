//! Types that represent the core data model, such as `Entry` and `Amount`.
mod amount;
mod entries;
mod entry;
mod kind;
mod owner;

pub use amount::{format_money, Amount, AmountError};
pub use entries::{DroppedRow, Entries};
pub use entry::{
    parse_date, DropReason, Entry, EntryColumn, DATE_FORMAT, TIMESTAMP_FORMAT,
};
pub use kind::Kind;
pub use owner::{Owner, View, COUPLE};
