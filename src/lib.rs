// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]

//! Live GPU viewer for capsule-cell simulations, built on wgpu.
//!
//! cellview subscribes to a running simulation, fetches per-step binary
//! frames describing a population of capsule-shaped cells (plus an optional
//! volumetric signal field and static shape overlays) and renders them with
//! order-independent transparency.
//!
//! # Key entry points
//!
//! - [`frame::codec`] - binary frame decoding and encoding
//! - [`scene::SceneState`] - the single mutable store read by the renderer
//!   and the picker
//! - [`session::FrameSession`] - sequence-guarded frame fetches and the
//!   simulation event stream
//! - [`renderer::Renderer`] - opaque pass, dual depth peeling with
//!   volumetric compositing, present
//! - [`picking`] - ray/capsule picking on the CPU
//! - [`engine::ViewerEngine`] - ties the above together per window
//!
//! # Architecture
//!
//! Network I/O runs on named worker threads and hands results back over
//! channels. The render thread drains those channels once per tick, applies
//! the sequence guard, updates [`scene::SceneState`] and records one command
//! buffer: opaque → N peel layers → opaque-under composite → present.

pub mod camera;
pub mod engine;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod input;
pub mod model;
pub mod options;
pub mod picking;
pub mod renderer;
pub mod scene;
pub mod session;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use engine::command::ViewerCommand;
pub use engine::ViewerEngine;
pub use error::ViewerError;
pub use frame::{CellInstance, Frame, VolumetricField};
pub use input::{InputEvent, MouseButton};
pub use options::Options;
#[cfg(feature = "viewer")]
pub use viewer::Viewer;
