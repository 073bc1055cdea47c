//! QR transport for signed CQM transfers.
//!
//! A signed transfer travels from the signing device to the relaying device
//! as a QR code whose content is a six-field, colon-separated ASCII string:
//!
//! ```text
//! from:to:amount:nonce:deadline:signature
//! ```
//!
//! [`packet`] encodes and decodes that string; [`render`] turns it into an
//! image. Neither module carries the chain id or contract address, so both
//! devices must be configured for the same token.

pub mod packet;
pub mod render;

pub use packet::{decode_packet, encode_packet, PacketError, SignedTransferPacket};
pub use render::{ErrorCorrection, QrError, QrRenderer};
