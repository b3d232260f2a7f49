//! # oval-engine — Evaluation Engine
//!
//! Evaluates definitions against collected system characteristics:
//!
//! - **Comparator** (`comparator.rs`): datatype-aware comparison of two
//!   string-encoded values under one operation.
//! - **Analyzer** (`analyzer.rs`): applies a selector or state entity to
//!   item entities, honoring collection status and nil values.
//! - **Functions** (`function.rs`): the pure value functions behind
//!   component expressions (concat, arithmetic, substring, time
//!   difference, ...).
//! - **Resolver** (`variable.rs`): variables and component trees to value
//!   lists with a result flag.
//! - **Correlator** (`correlator.rs`): object to selected items, including
//!   set objects and filters.
//! - **Scorer** (`scorer.rs`): one test over its correlated items.
//! - **Evaluator** (`evaluator.rs`): criteria trees, memoized per pass.
//!
//! ## Failure model
//!
//! Per-value failures never abort anything: they surface as ERROR or
//! UNKNOWN results and propagate through the lattice in `oval-core`.
//! Structural defects (cycles, dangling references) are
//! [`EvaluationError`]s that abort only the top-level definition being
//! evaluated.
//!
//! ## Usage
//!
//! ```ignore
//! let evaluator = Evaluator::new(&definitions, &store, &externals);
//! for outcome in evaluator.evaluate_all() {
//!     println!("{}: {:?}", outcome.id, outcome.result());
//! }
//! ```

pub mod analyzer;
pub mod comparator;
pub mod correlator;
pub mod error;
pub mod evaluator;
pub mod function;
pub mod results;
pub mod scorer;
pub mod variable;

pub use comparator::{compare, compare_sets, PatternCache};
pub use correlator::Correlation;
pub use error::{ComparisonError, EvaluationError, FunctionError};
pub use evaluator::{EvaluationOptions, EvaluationPass, Evaluator};
pub use results::{
    CriteriaResult, DefinitionOutcome, DefinitionResult, RunSummary, TestResult, TestedItem,
};
pub use variable::ResolvedValues;
