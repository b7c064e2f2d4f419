mod diagnostics;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};

mod schema;
pub use schema::{Attribute, AttributeKind, Mode, PlanModifier, Schema};

pub mod validators;
pub use validators::Validator;

mod resource;
pub use resource::*;
