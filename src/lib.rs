//! # Voronoi Compute
//!
//! Static and animated Voronoi diagrams rendered with GPU compute passes.
//!
//! ## Features
//!
//! - **Static renderer**: seeds are generated, uploaded and painted exactly once
//! - **Moving renderer**: seeds are advanced on the GPU and repainted every frame
//! - **Compute backends**: a wgpu implementation and a deterministic CPU implementation
//!   that runs the same kernels (used by tests and headless runs)
//! - **Configuration**: TOML/JSON files with environment variable overrides
//!
//! ### Example
//!
//! ```ignore
//! use voronoi_compute::config::MovingVoronoiConfig;
//! use voronoi_compute::render::SoftwareBackend;
//! use voronoi_compute::voronoi::{make_rng, MovingVoronoiRenderer, VoronoiRenderer};
//!
//! let mut backend = SoftwareBackend::new();
//! let mut rng = make_rng(Some(7));
//! let mut renderer = MovingVoronoiRenderer::new(&mut backend, &MovingVoronoiConfig::default(), &mut rng)?;
//! renderer.tick(&mut backend, 1.0 / 60.0)?;
//! renderer.render(&mut backend)?;
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Application entry, frame driver and error types
//! - [`config`]: Configuration loading and validation
//! - [`render`]: Compute backend abstraction, compute programs and backends
//! - [`voronoi`]: Seed generation and the two renderers

/// Core functionality including the application loop and error types
pub mod core;
/// Configuration system
pub mod config;
/// Compute backends and compute programs
pub mod render;
/// Voronoi renderers
pub mod voronoi;
