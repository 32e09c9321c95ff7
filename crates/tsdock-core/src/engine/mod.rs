//! # Engine Module
//!
//! The search machinery that turns a set of reactant molecules into a small,
//! pruned population of transition-state candidate poses.
//!
//! ## Overview
//!
//! A run starts from an [`context::EmbedContext`], which validates the
//! configuration against the molecules, enumerates every [`pairing`] of
//! reactive atoms and caches local frames and spatial indices. Work is then
//! streamed as (conformer combination, pairing) tasks ([`stream`]): each task
//! is aligned into seed arrangements ([`alignment`]), every seed is swept about
//! its docking axes ([`scanner`]), and the resulting [`pose::Pose`]s pass
//! through the pruning filters in [`tasks`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated search, pruning and refinement settings
//! - **Pairings** ([`pairing`]) - Which reactive atoms bond, and at what distance
//! - **Alignment** ([`alignment`]) - Open and ring-closing seed placement
//! - **Scanning** ([`scanner`]) - Rotation grids about docking axes
//! - **Pruning** ([`tasks`]) - Clash, pin, suprafacial, new-bond, energy and RMSD filters
//! - **Refinement boundary** ([`refine`], [`neb`]) - Bounded, timed calls to external optimizers
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-level error kinds
//!
//! Pose construction and the per-pose filters run in parallel when the
//! `parallel` feature is enabled; RMSD deduplication accepts poses strictly
//! in generation order.

pub mod alignment;
pub(crate) mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod neb;
pub mod pairing;
pub mod pose;
pub mod progress;
pub mod refine;
pub mod scanner;
pub mod stream;
pub mod tasks;
