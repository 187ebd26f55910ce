#![forbid(unsafe_code)]

pub mod adaptive;
pub mod app_services;
pub mod catalog;
pub mod error;
pub mod generation;
pub mod practice;

pub use practice_core::Clock;

pub use adaptive::{AdaptiveService, ProgressUpdate};
pub use app_services::AppServices;
pub use catalog::{CatalogService, UnitDetail};
pub use error::{AppServicesError, CatalogError, GenerationError, PracticeError};
pub use generation::{GenerationConfig, GenerationRequest, QuestionGenerator};
pub use practice::{
    AnswerFeedback, NextQuestion, PracticeService, QuestionSelector, SessionReport, SessionStart,
    StartSession, SubmitAnswer,
};
