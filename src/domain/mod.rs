//! Core domain models for podup
//!
//! This module contains the fundamental types used throughout the crate:
//! - Pod versions and version requirements
//! - Dependency and source descriptors
//! - Credentials for private sources

mod credential;
mod dependency;
mod requirement;
mod version;

pub use credential::Credential;
pub use dependency::{root_name, Dependency, DependencySource, GitRevision};
pub use requirement::{Constraint, Operator, Requirement};
pub use version::{PodVersion, VersionParseError};
