mod array;
mod atomic;
mod function;
mod map;
pub mod matching;
pub mod registry;
mod sequence;

pub use array::XdmArray;
pub use atomic::{AtomicValue, format_double, parse_double};
pub use function::XdmFunction;
pub use map::XdmMap;
pub use matching::{
    ItemType, KindTest, MapTypeArgs, Occurrence, SequenceType, TypeMatch, matches_sequence_type,
};
pub use registry::{AtomicType, XS_NAMESPACE};
pub use sequence::{XdmItem, XdmValue};
