//! Annotation of sentences with factored predictions.
//!
//! This crate reads CoNLL-U corpora into factors, builds the mappings
//! between factor values and identifiers, batches sentences for a
//! network, and turns network predictions back into annotated
//! sentences.

pub mod annotator;

pub mod config;

pub mod dataset;

pub mod disambiguate;

pub mod error;

pub mod factor;

pub mod mappings;

pub mod predictions;
