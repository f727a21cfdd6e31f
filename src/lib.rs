//! Citegraph Core Library
//!
//! This library extracts bibliographies from scholarly-article XML and resolves
//! in-text citation pointers (`[3]`, `[1-3]`, superscripts, structural
//! cross-references) to the bibliography entries they denote.
//!
//! # Architecture
//!
//! The library is organized into the following modules, leaf-first:
//! - [`document`] - Tolerant XML parsing and body-text flattening
//! - [`schema`] - Schema classification (JATS, TEI, Wiley, `BioC`)
//! - [`bibliography`] - Schema-dispatched bibliography extraction and DOI detection
//! - [`pointer`] - In-text citation pointer scanning
//! - [`resolver`] - Pointer-to-entry resolution
//! - [`graph`] - Per-document pipeline and the serializable [`CitationGraph`]
//! - [`batch`] - Concurrent corpus processing with per-document timeouts

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod bibliography;
pub mod constants;
pub mod document;
pub mod graph;
pub mod pointer;
pub mod resolver;
pub mod schema;
pub mod warning;

// Re-export commonly used types
pub use batch::{BatchError, BatchOutcome, BatchProcessor, CoverageReport, collect_xml_files};
pub use bibliography::{BibliographyEntry, ExtractionOutcome, LabelOrigin, extract};
pub use document::{BodyText, Document, Span};
pub use graph::{CitationGraph, DoiMention, PipelineOptions, process_document, process_document_with};
pub use pointer::{PointerForm, PointerOccurrence, PointerScanner, ScanOptions};
pub use resolver::{ReferenceResolver, ResolutionMethod, ResolvedCitation};
pub use schema::{SchemaKind, classify};
pub use warning::CitationWarning;
