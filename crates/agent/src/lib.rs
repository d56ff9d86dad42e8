//! Lead qualification runtime.
//!
//! A lead flows through a fixed loop:
//! 1. **Prompt** (`prompt`) - render the versioned rubric around company name and description
//! 2. **Model call** (`llm`) - one deterministic JSON-mode chat completion
//! 3. **Parse** (`parser`) - strict JSON object or a typed `ParseFailure`
//! 4. **Validate** (`validator`) - field-by-field coercion with documented defaults
//!
//! `pipeline::QualificationPipeline` wires the loop together and folds every
//! transport or parse failure into an `Error` result for that lead only.
//! `runtime::LeadProcessor` is the caller side: it runs leads in order and
//! appends each outcome to the user's profile.
//!
//! The model only classifies. It never writes to the profile store and a bad
//! answer can never abort a batch.

pub mod llm;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod runtime;
pub mod validator;

pub use llm::{ChatRequest, LlmClient, LlmError, OpenAiCompatibleClient, ScriptedLlmClient};
pub use pipeline::{QualificationPipeline, RetryPolicy};
pub use runtime::{BatchReport, BatchSummary, LeadProcessor, ProcessedLead, ProfileSession};
