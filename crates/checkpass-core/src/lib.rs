//! Checkpass Core - wire protocol and conversation primitives
//!
//! This crate carries everything both sides of the privilege boundary agree
//! on: the length-prefixed wire protocol spoken over the inherited server
//! descriptor, the conversation capability set with its remote (wire-backed)
//! implementation, and the zero-on-drop secret buffer.

pub mod conv;
pub mod error;
pub mod secret;
pub mod wire;

pub use conv::{ConvRequest, Conversation, RemoteConversation};
pub use error::{ConvError, Result, WireError};
pub use secret::Secret;
pub use wire::{FramedChannel, MAX_BYTES_LEN, MAX_STRING_LEN};
