// ABOUTME: Route module organization for the assistant hub HTTP endpoints
// ABOUTME: Groups assistant provisioning/messaging routes and health routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module
//!
//! Each domain module contains route definitions and thin handlers that
//! delegate to the assistant registry.

/// Assistant provisioning and messaging routes
pub mod assistants;
/// Health check and readiness routes
pub mod health;

/// Assistant route handlers
pub use assistants::AssistantRoutes;
/// Health check route handlers
pub use health::HealthRoutes;
