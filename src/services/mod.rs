pub mod classifier;
pub mod document_reader;
pub mod result_sink;

pub use classifier::{Classifier, LlmClassifier};
pub use document_reader::{DocumentReader, PdfReader};
pub use result_sink::{CsvSink, ResultSink};
