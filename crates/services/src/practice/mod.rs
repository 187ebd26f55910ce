mod selection;
mod service;

pub use selection::QuestionSelector;
pub use service::{
    AnswerFeedback, NextQuestion, PracticeService, SessionReport, SessionStart, StartSession,
    SubmitAnswer,
};
