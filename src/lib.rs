//! QuizForge - AI quiz generation and tutoring backend
//!
//! This crate orchestrates LLM-backed quiz generation, grading feedback,
//! and streamed tutoring answers behind per-tariff usage quotas, with the
//! heavy generation work dispatched to background jobs.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
