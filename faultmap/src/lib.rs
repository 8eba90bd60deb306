//! # faultmap - Startup Page Fault Attribution for Android Apps
//!
//! faultmap records the page faults an app takes during a cold start and
//! attributes each one to the file it touched and, inside APKs, to the
//! archive entry covering the faulting offset. The output drives layout
//! work such as reordering APK entries so startup reads stay contiguous.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Device (via adb)                          │
//! │  force-stop, drop caches, /proc/<pid>/maps, inode dump, pull │
//! └───────────────┬─────────────────────────────┬────────────────┘
//!                 │ perfetto trace              │ layout snapshot
//!                 ▼                             ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    faultmap (This Crate)                      │
//! │                                                              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────┐        │
//! │  │ trace_data  │──▶│  resolver   │──▶│ mapped_faults│        │
//! │  │ (fault log) │   │ page cache  │   │    .csv      │        │
//! │  └─────────────┘   └─────────────┘   └──────────────┘        │
//! │                        ▲      ▲                              │
//! │               ┌────────┘      └───────┐                      │
//! │        ┌─────────────┐         ┌─────────────┐               │
//! │        │   layout    │         │   archive   │               │
//! │        │ maps/inodes │         │ APK entries │               │
//! │        └─────────────┘         └─────────────┘               │
//! │                                       │                      │
//! │                                       ▼                      │
//! │                               ┌──────────────┐               │
//! │                               │ file_sizes   │               │
//! │                               │    .csv      │               │
//! │                               └──────────────┘               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`device`]: adb collaborator, trace capture and trace query
//! - [`trace_data`]: fault log rows from `trace_processor`
//! - [`layout`]: address-mode memory maps and inode-mode inode tables
//! - [`archive`]: APK staging and entry tables
//! - [`resolver`]: fault resolution against the simulated page cache
//! - [`catalog`]: `file_sizes.csv` construction
//! - [`classification`]: package-code vs platform file origin
//! - [`pipeline`]: the `collect` and `process` operations
//! - [`preflight`]: host tool and capture checks with actionable errors
//! - [`cli`]: command-line arguments
//! - [`domain`]: identifiers and error types
//!
//! ## Capture Modes
//!
//! | ABI   | Tracepoint                        | Layout snapshot   |
//! |-------|-----------------------------------|-------------------|
//! | x86*  | `exceptions/page_fault_user`      | `/proc/<pid>/maps`|
//! | arm*  | `filemap/mm_filemap_add_to_page_cache` | inode dump   |
//!
//! ## Typical Usage
//!
//! ```bash
//! faultmap collect --package com.example
//! faultmap process --package com.example --pull-apks
//! ```

pub mod archive;
pub mod catalog;
pub mod classification;
pub mod cli;
pub mod device;
pub mod domain;
pub mod layout;
pub mod pipeline;
pub mod preflight;
pub mod resolver;
pub mod trace_data;
