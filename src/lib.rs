// ==============================================================================
// lib.rs - Eye Color Pipeline Library
// ==============================================================================
// Description: Library interface for genotype preparation and IrisPlex scoring
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-01-17
// Version: 2.0.0
// ==============================================================================

pub mod config;
pub mod dataset;
pub mod early_stop;
pub mod filter;
pub mod genotype_converter;
pub mod irisplex;
pub mod labels;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod output;
pub mod parsers;
pub mod partition;
pub mod processor;
pub mod reference_panel;
pub mod run_log;
pub mod validator;
