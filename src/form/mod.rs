pub mod completion;
pub mod derive;
pub mod field;
pub mod layout;
pub mod registry;
pub mod rules;
pub mod section;
pub mod session;
pub mod visibility;
pub mod wizard;

pub use completion::{CompletionState, SectionCompletion};
pub use derive::{DerivedRule, DerivedValueEngine, RecomputeReport};
pub use field::{FieldDescriptor, FieldKind, FieldValue, FileRef, YesNo};
pub use layout::keys;
pub use registry::FieldRegistry;
pub use rules::{SimulatedDecoder, VehicleDecoder, VehicleDetails};
pub use section::{Navigation, Section, SectionNavigator};
pub use session::Session;
pub use visibility::{RevealRule, VisibilityRules};
pub use wizard::{ClaimWizard, FieldChange};
