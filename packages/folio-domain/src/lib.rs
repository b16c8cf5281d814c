pub mod category;
pub mod filter;
pub mod identity;
pub mod normalize;
pub mod record;
pub mod schedule;
pub mod time_serde;

pub use category::CategoryMap;
pub use filter::FilterContext;
pub use normalize::{MalformedRecord, NormalizeContext, Normalized, ViewItem, normalize};
pub use record::{EntityKind, RawRecord, SourceFields};
