//! Device-local key material and the record sealing primitives.

pub mod cipher;
pub mod device_key;

pub use cipher::{RecordCipher, Sealed};
pub use device_key::DeviceKey;
