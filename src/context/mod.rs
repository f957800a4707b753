//! Context domain: tree model, builder, name filter and support requirements.
//! Trees are plain data; the runner reads them and never writes to them.

pub mod builder;
pub mod filter;
pub mod model;
pub mod requirements;

pub use builder::{BuildHandle, ContextBuilder, Description, Finish, Item};
pub use filter::{filter, NameFilter};
pub use model::{Context, ContextHooks, Test};
pub use requirements::{Requirement, RequirementMap, SupportRequirements};
