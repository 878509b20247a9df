pub mod element;
pub mod index;
pub mod issue;
pub mod property;

pub use element::{Element, Scalar, Status};
pub use index::{count_ids, CheckContext, ElementIndex, Highlighter, ModelIdMap, PropertySource};
pub use issue::{Issue, IssueLog};
pub use property::{FlatProperties, PropertyNode};
