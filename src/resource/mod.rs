//! Resource model shared by every integration.
//!
//! A resource is a named bundle of attributes. The reconciler only ever
//! compares attribute bundles for equality; their meaning belongs to the
//! integration that produced them.

mod model;
mod set;

pub use model::{attributes_equal, changed_fields, AttributeValue, Attributes, FieldChange, NamedResource};
pub use set::{CurrentResourceSnapshot, DesiredResourceSet};
