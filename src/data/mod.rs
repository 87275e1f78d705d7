//! Data layer: naming, addressing, loading and assembly.
//!
//! Architecture:
//! ```text
//!   "2018-09-30_2_Mouse"
//!        │
//!        ▼
//!   ┌───────────┐           ┌─────────┐
//!   │ reference  │ ◄──────── │ listing  │  root/subject/date/seq → references
//!   └───────────┘           └─────────┘
//!        │ root/Mouse/2018-09-30/2
//!        ▼
//!   ┌───────────┐
//!   │ filename   │  _ns_object.attribute.ext → keep trials files
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ loader/npy │  payload → NumericArray
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ trials     │  row check, intervals split, contrast → TrialTable
//!   └───────────┘
//!        │
//!        ▼
//!   summary / export  (inputs for plotting and fitting)
//! ```

pub mod export;
pub mod filename;
pub mod listing;
pub mod loader;
pub mod model;
pub mod npy;
pub mod raw;
pub mod reference;
pub mod summary;
pub mod trials;
