//! Tracking-issue reconciliation and organisation scanning.
//!
//! This crate sequences calls between the pure domain logic in [`compliance`]
//! (configuration validation) and the hosting-platform ports it defines. It
//! contains the decision of *which* corrective action a repository needs; the
//! ports decide *how* it is carried out.
//!
//! Data flows one way:
//!
//! ```text
//! OrgScanner ─► ComplianceReconciler ─► { validate, IssueTracker }
//! ```
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** No HTTP, no file system. Everything external is
//! reached through [`compliance::HostingPlatform`] and
//! [`compliance::TemplateRenderer`], so tests substitute in-memory doubles.

pub mod pacer;
pub mod reconcile;
pub mod scanner;
pub mod tracker;

pub use pacer::Pacer;
pub use reconcile::{ComplianceReconciler, Execution, ReconcileError, ReconciliationOutcome};
pub use scanner::{OrgScanner, RepositoryReport, ScanReport, ScanTotals};
pub use tracker::{CloseSummary, IssueCreation, IssueTracker};
