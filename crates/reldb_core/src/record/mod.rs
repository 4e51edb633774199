//! Record identity, metadata and codec.

mod codec;
mod id;
mod meta;

pub use codec::{decode_entity, encode_entity};
pub use id::RecordId;
pub use meta::{now_millis, Entity, Metadata};
