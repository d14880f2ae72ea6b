//! # Rowdex
//!
//! Change-tracking and paginated-harvesting core that exposes rows of a
//! relational table as indexable documents for a search-indexing subsystem.
//!
//! Rowdex decides *what* needs indexing and *when* — it enumerates all rows
//! needing (re)indexing in stable, resumable pages, and on each row mutation
//! resolves which indexes care and enqueues the correct tracking operation
//! for exactly the right identifiers. How indexing executes (batching,
//! committing to the search backend) belongs to the index engine behind the
//! [`registry::IndexHandle`] seam.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │  Main table  │──▶│  TableHarvester  │──▶│  RowDocument  │
//! │  (RowSource) │   │  id pages+cursor │   │  typed view   │
//! └──────┬───────┘   └──────────────────┘   └───────┬───────┘
//!        │  mutation events                         │
//!        ▼                                          ▼
//! ┌──────────────────┐   resolves   ┌────────────────────────┐
//! │ TrackingManager  │─────────────▶│ IndexRegistry/Handles  │
//! │ insert/upd/del   │   notifies   │ (external index engine)│
//! └──────────────────┘              └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migration for crate-owned tables |
//! | [`error`] | Configuration and schema error taxonomy |
//! | [`schema`] | Fixed row property schema |
//! | [`document`] | Validated row documents |
//! | [`context`] | Harvest context identity and keys |
//! | [`state`] | Keyed state store + harvest cursors |
//! | [`rows`] | Row storage seam over the main table |
//! | [`harvest`] | Paginated, resumable id harvesting |
//! | [`registry`] | Index registry seam and lookup |
//! | [`tracking`] | Mutation tracking with per-index isolation |

pub mod config;
pub mod context;
pub mod db;
pub mod document;
pub mod error;
pub mod harvest;
pub mod migrate;
pub mod registry;
pub mod rows;
pub mod schema;
pub mod state;
pub mod tracking;
