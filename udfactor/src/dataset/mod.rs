//! Reading, batching, and writing of CoNLL-U corpora.

mod batch;
pub use batch::{
    Batch, BatchRecord, Batcher, CharBatch, CharBatchRecord, DEFAULT_MAX_FORM_LEN,
};

mod corpus;
pub use corpus::{CharSeqTable, Corpus, CorpusOptions, FactorColumn, Sentence};

mod embeddings;
pub use embeddings::Embeddings;

mod reader;
pub use reader::{ConlluReader, CorpusError, RawSentence, N_COLUMNS};

mod writer;
pub use writer::{ConlluWriter, Override, Overrides, SerializeError};
