pub mod builder;
pub mod error;
pub mod index;
pub mod language;
pub mod persist;
pub mod query;
pub mod tokenizer;

pub use builder::{BuildOutput, DocumentFailure, IndexBuilder};
pub use error::{CodecError, QueryError};
pub use index::{DocumentId, FormCache, InvertedIndex, Position};
pub use language::{DictionaryForms, LanguageProfile, Languages, NormalFormProvider, SnowballForms};
pub use query::{Expr, Occurrence, QueryEvaluator};
