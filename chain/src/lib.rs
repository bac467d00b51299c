//! Functionality around proof-of-work header chains.
#![allow(clippy::collapsible_if)]
#![deny(missing_docs, unsafe_code)]
pub mod headers;
pub mod pow;
