//! # Truth Kernel Testkit
//!
//! Testing utilities for the Truth Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known payload spellings with their exact canonical bytes
//! - **Generators**: Proptest strategies for JSON payloads in many spellings
//! - **Fixtures**: Signed records, peer documents and broken variants of both
//!
//! ## Golden Vectors
//!
//! ```rust
//! use truth_kernel_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, canonical) in verify_all_vectors() {
//!     assert!(matches, "{name}: {canonical}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use truth_kernel_testkit::generators::{payload_tree, render, style};
//!
//! proptest! {
//!     #[test]
//!     fn spelling_does_not_matter(tree in payload_tree(), a in style(), b in style()) {
//!         // parse render(&tree, a) and render(&tree, b), compare canonical bytes
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use truth_kernel_testkit::fixtures::{response_body, TestFixture};
//!
//! let peer = TestFixture::with_seed([7; 32]);
//! let body = response_body(&[peer.document("a"), peer.tampered_document("b")]);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{input_document, multi_party_fixtures, response_body, TestFixture};
