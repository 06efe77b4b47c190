//! Resolve downstream job graphs and assemble delivery pipelines from build
//! history.
//!
//! A [`view::TimelineView`] reads a [`registry::JobRegistry`], expands each
//! configured component into a [`graph::JobGraph`], turns the graph into
//! pipelines with [`pipeline::PipelineAssembler`], then sorts and trims the
//! result.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod sort;
pub mod trigger;
pub mod view;
