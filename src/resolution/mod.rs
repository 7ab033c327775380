/// Translation reference resolution.
///
/// Turns an object, or an `(object type, id)` pair, into an identity plus the
/// resolved chain of site, parent, group, category and filter dependency
/// references.
mod builder;
mod fields;
mod filter_cache;
mod session;

pub use builder::ReferenceGraphBuilder;
pub use fields::AdditionalFieldsResolver;
pub use filter_cache::FilterConditionCache;
pub use session::{ResolutionSession, SessionStats};
