//! Typed-data construction and signature handling for CQM meta-transfers.
//!
//! This crate holds the pure, I/O-free half of the signing flow:
//! - [`typed_data`] builds the EIP-712 document a wallet signs and computes its digest
//! - [`codec`] splits a 65-byte signature into `(r, s, v)` and joins it back
//! - [`verify`] recovers the signer of a document and checks its deadline

pub mod codec;
pub mod typed_data;
pub mod verify;

pub use codec::{join_signature, split_signature, SignatureError, SignatureParts};
pub use typed_data::{TypedDataBuilder, TypedDataDocument, TypedField, TypedMessage};
pub use verify::{recover_signer, verify_document, VerifyError};
