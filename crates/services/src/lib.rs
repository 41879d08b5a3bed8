#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod generator;
pub mod outline_service;
pub mod sessions;

pub use outline_core::Clock;
pub use sessions as session;

pub use app_services::{AppServices, ServiceConfig};
pub use error::{AppServicesError, GeneratorError, OutlineServiceError, SessionError};
pub use generator::{
    ChatOutlineGenerator, GeneratedSection, GeneratorConfig, OutlineGenerator, apply_generated,
};
pub use outline_service::{Dashboard, OutlineService};

pub use sessions::{
    CompletionOutcome, NavCommand, PresentationService, PresentationSession, SessionNavigator,
    SessionProgress,
};
