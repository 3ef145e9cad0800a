/*!
# Production Log

A shop-floor quality log for extrusion production runs, built in Rust.

## Overview

Operators record sampled measurements (outer diameter, wall thickness, weights,
lengths, unit numbers, scrap) in a running table, one row per sampling
interval. The library computes the derived quality statistics for each row,
enforces the row completion and locking workflow, and exports the finished
form as JSON, CSV or XLSX, or posts it to a remote workflow endpoint.

## Architecture

### Core Library
- **Measurement** - a numeric field that is blank, not applicable (`-`) or a number
- **Target Specifications** - the sixteen limits of a run, typed in or scanned from a `*^`-separated label
- **Derived Metrics Calculator** - out-of-round, ovality, toe-in, eccentricity, gain and loss
- **Row Lifecycle Controller** - editing, adding, removing and locking rows of a form
- **Form Desk** - up to twelve forms open side by side

### Web Layer (feature `web`)
- **Technologies**: Rust, axum, tokio
- Session cookie login, JSON API for forms, rows and the hourly inspection checklist
- Submission to the workflow endpoint with reqwest

### Data Persistence Layer
- Drafts stored as gzip-compressed JSON
- JSON/CSV/XLSX export

## Modules

- **measurement**: blank / not-applicable / numeric field type
- **specs**: target specifications, label scan parsing, limit checks
- **entry**: one production row and its field parsing rules
- **metrics**: derived statistics
- **form**: the production form and its row lifecycle
- **summary**: totals across rows
- **desk**: open forms (tabs)
- **inspection**: hourly inspection checklist
- **export**, **downloader**: export payload, CSV and XLSX
- **saving**: drafts
- **config**: environment configuration
- **auth**, **submit**, **app**: web layer (feature `web`)

## REST API Endpoints

- `POST /login`, `/logout` - session handling
- `/api/forms` - list and open forms
- `/api/forms/{id}/header`, `/specs`, `/scan` - header and target limits
- `/api/forms/{id}/entries[/{row}]` - add, edit and remove rows
- `/api/forms/{id}/export[.csv|.xlsx]`, `/submit`, `/draft` - output
- `/api/inspection` - hourly inspection checklist
*/

pub mod config;
pub mod desk;
pub mod downloader;
pub mod entry;
pub mod export;
pub mod form;
pub mod inspection;
pub mod measurement;
pub mod metrics;
pub mod saving;
pub mod specs;
pub mod summary;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod auth;
#[cfg(feature = "web")]
pub mod submit;

pub use desk::FormDesk;
pub use entry::{EntryField, ProductionEntry, RowState};
pub use form::{FormError, HeaderField, ProductionForm};
pub use measurement::Measurement;
pub use metrics::DerivedMetrics;
pub use specs::{SpecField, TargetSpecifications};
pub use summary::FormSummary;
