//! Encoders and decoders for factored sentence annotations.
//!
//! This crate contains the parts of the annotation pipeline that do
//! not depend on the corpus format:
//!
//! * [`vocab`]: vocabularies and character alphabets with reserved
//!   padding, unknown, and root symbols.
//! * [`lemma`]: lemma rules that describe how a lemma is derived from
//!   a form.
//! * [`dependency`]: decoding of dependency trees from head scores.

pub mod dependency;

pub mod lemma;

pub mod vocab;
