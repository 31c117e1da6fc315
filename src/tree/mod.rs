//! Arena-backed tree with begin/end change notifications.

mod model;
mod node;
mod sink;

pub use model::{TreeModel, TreeResult};
pub use node::{NodeId, NodeKind, TreeNode};
pub use sink::{ChangeSink, ModelEvent, ModelIndex, NullSink, RecordingSink};
