pub mod amount;
pub mod confidence;
pub mod evidence;
pub mod money;
pub mod value;

pub use amount::{is_percentage_only, scan_amounts, AmountToken};
pub use confidence::{clamp_confidence, ConfidenceBucket};
pub use evidence::Evidence;
pub use money::Money;
pub use value::EntityValue;

/// Version stamped on every serialized result object.
pub const SCHEMA_VERSION: u32 = 3;
