//! SponsorBridge Payments - Payment Order & Reconciliation Engine
//!
//! This crate implements payment intake for the SponsorBridge platform:
//! creating orders with the external payment gateway, reconciling asynchronous
//! webhook notifications with active status polling, and moving each payment
//! to a terminal state exactly once so that subscription activation never
//! happens twice.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
