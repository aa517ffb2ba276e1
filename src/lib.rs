//! # Academic IR
//!
//! A cross-source retrieval core for student records, course results and
//! per-student documents.
//!
//! Three structured sources (an entity table, a metric table in wide or long
//! layout, and a JSON reference list) are loaded once into a read-only
//! [`snapshot::Snapshot`]. A folder of documents, one sub-folder per entity,
//! is searched live. A single free-text query is matched against all of them
//! and the combined result can be narrowed to one category.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────┐
//! │   Loader     │──▶│  Normalize   │──▶│ Snapshot │
//! │ CSV / JSON   │   │ wide ▸ long  │   │ (shared) │
//! └──────────────┘   └─────────────┘   └────┬─────┘
//!                                          │  search ▸ filter
//! ┌──────────────┐   ┌─────────────┐        │
//! │   Corpus     │──▶│   Extract    │────────┤
//! │ <id>/<file>  │   │ txt/pdf/docx │        │
//! └──────────────┘   └─────────────┘   ┌────┴─────┐
//!                                      ▼          ▼
//!                                 ┌────────┐ ┌────────┐
//!                                 │  CLI   │ │  HTTP  │
//!                                 │ (air)  │ │ (JSON) │
//!                                 └────────┘ └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! air sources                     # check every configured source
//! air search "lovelace"           # query everything
//! air search "CS101" --filter courses --json
//! air fetch S1 cv.pdf             # locate a stored document
//! air serve                       # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Records and result types |
//! | [`loader`] | CSV and JSON source loading |
//! | [`normalize`] | Wide/long layout detection and reference join |
//! | [`extract`] | Plain-text, PDF and DOCX text extraction |
//! | [`corpus`] | Document folder listing and path resolution |
//! | [`search`] | Query matching and deduplication |
//! | [`filter`] | Category filter |
//! | [`snapshot`] | Loaded state and the query entry point |
//! | [`server`] | JSON HTTP server |

pub mod config;
pub mod corpus;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod search;
pub mod server;
pub mod snapshot;
pub mod sources;
