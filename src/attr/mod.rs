//! Attribute engine: typed buffers, decoding, scope reconciliation and
//! user attribute collection.

pub mod collect;
pub mod decode;
pub mod scope;
pub mod value;

pub use collect::{
    collect_user_attributes, reconcile_levels, remove_conflicting, AttributeLevel, AttributeLevels, UserAttributes,
};
pub use decode::{classify, decode, decode_as, decode_samples, decode_samples_as, Layout};
pub use scope::{expected_count, promote, reconcile, remap_indexed};
pub use value::{AttrScope, AttributeData, StringPool, TypedValueVector, Usage, ValueType};
