use std::collections::{HashMap, VecDeque};

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use udfactor_encoders::vocab::PAD;

use crate::dataset::{CharSeqTable, Corpus, Embeddings, Sentence};
use crate::factor::Factor;

/// The default maximum length of character sequences.
pub const DEFAULT_MAX_FORM_LEN: usize = 64;

/// Character sequences of a factor in a batch.
#[derive(Debug, PartialEq)]
pub struct CharBatch {
    /// Index of every token into `seqs`, `[batch_size, max_len]`.
    pub seq_ids: Array2<i64>,

    /// Deduplicated character sequences, `[n_seqs, max_chars]`.
    ///
    /// Sequence 0 is the padding sequence.
    pub seqs: Array2<i64>,

    /// The length of each sequence.
    pub seq_lens: Array1<i64>,
}

/// A batch of sentences.
#[derive(Debug, PartialEq)]
pub struct Batch {
    /// Corpus indices of the sentences.
    pub sentences: Vec<usize>,

    /// Sentence lengths, excluding the root.
    pub sentence_lens: Array1<i64>,

    /// Value identifiers per factor, `[batch_size, max_len + with_root]`.
    pub ids: Vec<Array2<i64>>,

    /// Document variant identifiers.
    pub variants: Array1<i64>,

    /// Character sequences of factors with characters.
    pub chars: Vec<Option<CharBatch>>,

    /// Contextualized embeddings, aligned with the forms,
    /// `[batch_size, max_len + with_root, dim]`.
    pub embeddings: Option<Array3<f32>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn ids(&self, factor: Factor) -> ArrayView2<i64> {
        self.ids[factor.index()].view()
    }

    pub fn chars(&self, factor: Factor) -> Option<&CharBatch> {
        self.chars[factor.index()].as_ref()
    }
}

/// Build padded batch arrays.
struct BatchBuilder {
    current_sequence: usize,
    sentence_lens: Array1<i64>,
    ids: Vec<Array2<i64>>,
    variants: Array1<i64>,
    char_seq_ids: Vec<Option<Array2<i64>>>,
    embeddings: Option<Array3<f32>>,
}

impl BatchBuilder {
    fn new(
        first: &Sentence,
        batch_size: usize,
        max_len: usize,
        embeddings_dim: Option<usize>,
    ) -> Self {
        let shape = |factor: Factor| (batch_size, max_len + first.config(factor).root_offset());

        BatchBuilder {
            current_sequence: 0,
            sentence_lens: Array1::zeros((batch_size,)),
            ids: Factor::ALL
                .iter()
                .map(|&factor| Array2::from_elem(shape(factor), PAD as i64))
                .collect(),
            variants: Array1::zeros((batch_size,)),
            char_seq_ids: Factor::ALL
                .iter()
                .map(|&factor| {
                    if first.config(factor).characters {
                        Some(Array2::from_elem(shape(factor), PAD as i64))
                    } else {
                        None
                    }
                })
                .collect(),
            embeddings: embeddings_dim.map(|dim| {
                let (rows, cols) = shape(Factor::Forms);
                Array3::zeros((rows, cols, dim))
            }),
        }
    }

    fn add(
        &mut self,
        sentence: &Sentence,
        char_seq_ids: &[Option<Vec<i64>>],
        embeddings: Option<ArrayView2<f32>>,
    ) {
        assert!(
            self.current_sequence < self.sentence_lens.len(),
            "BatchBuilder is already filled."
        );

        for factor in &Factor::ALL {
            let ids = ArrayView1::from(sentence.factor(*factor).ids());
            self.ids[factor.index()]
                .row_mut(self.current_sequence)
                .slice_mut(s![0..ids.len()])
                .assign(&ids);

            if let (Some(batch_ids), Some(sentence_ids)) = (
                self.char_seq_ids[factor.index()].as_mut(),
                char_seq_ids[factor.index()].as_ref(),
            ) {
                batch_ids
                    .row_mut(self.current_sequence)
                    .slice_mut(s![0..sentence_ids.len()])
                    .assign(&ArrayView1::from(sentence_ids.as_slice()));
            }
        }

        if let (Some(batch_embeddings), Some(embeddings)) = (self.embeddings.as_mut(), embeddings) {
            let offset = sentence.config(Factor::Forms).root_offset();
            batch_embeddings
                .slice_mut(s![
                    self.current_sequence,
                    offset..offset + embeddings.nrows(),
                    ..
                ])
                .assign(&embeddings);
        }

        self.sentence_lens[self.current_sequence] = sentence.len() as i64;
        self.variants[self.current_sequence] = sentence.variant() as i64;

        self.current_sequence += 1;
    }
}

/// Character sequences of a factor, deduplicated within a batch.
struct BatchCharSeqs<'a> {
    table: &'a CharSeqTable,
    max_form_len: usize,
    index: HashMap<usize, usize>,
    seqs: Vec<&'a [usize]>,
}

impl<'a> BatchCharSeqs<'a> {
    fn new(table: &'a CharSeqTable, max_form_len: usize) -> Self {
        BatchCharSeqs {
            table,
            max_form_len,
            index: HashMap::new(),
            seqs: vec![table.seq(PAD)],
        }
    }

    /// Get the batch-local identifier of a corpus character sequence.
    fn id_of(&mut self, corpus_id: usize) -> usize {
        let table = self.table;
        let max_form_len = self.max_form_len;
        let seqs = &mut self.seqs;
        *self.index.entry(corpus_id).or_insert_with(|| {
            let seq = table.seq(corpus_id);
            seqs.push(&seq[..seq.len().min(max_form_len)]);
            seqs.len() - 1
        })
    }

    fn into_arrays(self, seq_ids: Array2<i64>) -> CharBatch {
        let max_chars = self.seqs.iter().map(|seq| seq.len()).max().unwrap_or(0);

        let mut seqs = Array2::from_elem((self.seqs.len(), max_chars), PAD as i64);
        for (mut row, seq) in seqs.outer_iter_mut().zip(&self.seqs) {
            for (cell, &c) in row.iter_mut().zip(seq.iter()) {
                *cell = c as i64;
            }
        }

        CharBatch {
            seq_ids,
            seqs,
            seq_lens: self.seqs.iter().map(|seq| seq.len() as i64).collect(),
        }
    }
}

/// Batches over a corpus.
///
/// Sentences are taken from a permutation of the corpus. Once all
/// sentences are taken, the epoch is finished and a new permutation
/// is made.
pub struct Batcher<'a> {
    corpus: &'a Corpus,
    pending: VecDeque<usize>,
    shuffle: bool,
    rng: XorShiftRng,
    max_form_len: usize,
}

impl<'a> Batcher<'a> {
    /// Construct a batcher.
    ///
    /// When `shuffle` is set, the sentences are shuffled every epoch
    /// using a random number generator seeded with `seed`.
    pub fn new(corpus: &'a Corpus, shuffle: bool, seed: u64) -> Self {
        let mut batcher = Batcher {
            corpus,
            pending: VecDeque::new(),
            shuffle,
            rng: XorShiftRng::seed_from_u64(seed),
            max_form_len: DEFAULT_MAX_FORM_LEN,
        };
        batcher.pending = batcher.permutation();
        batcher
    }

    /// Truncate character sequences to `max_form_len` characters.
    pub fn max_form_len(mut self, max_form_len: usize) -> Self {
        self.max_form_len = max_form_len;
        self
    }

    fn permutation(&mut self) -> VecDeque<usize> {
        let mut permutation = (0..self.corpus.len()).collect::<Vec<_>>();
        if self.shuffle {
            permutation.shuffle(&mut self.rng);
        }
        permutation.into()
    }

    /// Check whether all sentences of the epoch were batched.
    ///
    /// When the epoch is finished, the next epoch is started.
    pub fn epoch_finished(&mut self) -> bool {
        if self.pending.is_empty() {
            self.pending = self.permutation();
            true
        } else {
            false
        }
    }

    /// Get the next batch of at most `batch_size` sentences.
    ///
    /// Returns `None` when all sentences of the epoch were batched.
    pub fn next_batch(&mut self, batch_size: usize) -> Option<Batch> {
        let batch_size = batch_size.min(self.pending.len());
        if batch_size == 0 {
            return None;
        }

        let indices = self.pending.drain(..batch_size).collect::<Vec<_>>();
        let sentences = indices
            .iter()
            .map(|&idx| &self.corpus.sentences()[idx])
            .collect::<Vec<_>>();

        let max_len = sentences.iter().map(|s| s.len()).max().unwrap_or(0);
        let embeddings = self.corpus.embeddings();
        let mut builder = BatchBuilder::new(
            sentences[0],
            batch_size,
            max_len,
            embeddings.map(Embeddings::dim),
        );

        let mut char_seqs = Factor::ALL
            .iter()
            .map(|&factor| {
                self.corpus
                    .char_seqs(factor)
                    .map(|table| BatchCharSeqs::new(table, self.max_form_len))
            })
            .collect::<Vec<_>>();

        for (&idx, sentence) in indices.iter().zip(sentences) {
            let char_seq_ids = Factor::ALL
                .iter()
                .map(|&factor| {
                    let corpus_ids = sentence.factor(factor).char_seq_ids()?;
                    let batch_seqs = char_seqs[factor.index()].as_mut()?;
                    Some(
                        corpus_ids
                            .iter()
                            .map(|&id| batch_seqs.id_of(id) as i64)
                            .collect(),
                    )
                })
                .collect::<Vec<_>>();
            builder.add(
                sentence,
                &char_seq_ids,
                embeddings.map(|embeddings| embeddings.sentence(idx)),
            );
        }

        let chars = char_seqs
            .into_iter()
            .zip(builder.char_seq_ids)
            .map(|(seqs, ids)| match (seqs, ids) {
                (Some(seqs), Some(ids)) => Some(seqs.into_arrays(ids)),
                _ => None,
            })
            .collect();

        Some(Batch {
            sentences: indices,
            sentence_lens: builder.sentence_lens,
            ids: builder.ids,
            variants: builder.variants,
            chars,
            embeddings: builder.embeddings,
        })
    }
}

/// Serializable form of a batch.
///
/// Arrays are stored as nested vectors, factors by their names.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct BatchRecord {
    pub sentences: Vec<usize>,
    pub sentence_lens: Vec<i64>,
    pub variants: Vec<i64>,
    pub ids: HashMap<Factor, Vec<Vec<i64>>>,
    pub chars: HashMap<Factor, CharBatchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Vec<Vec<f32>>>>,
}

/// Serializable form of the character sequences of a batch.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct CharBatchRecord {
    pub seq_ids: Vec<Vec<i64>>,
    pub seqs: Vec<Vec<i64>>,
    pub seq_lens: Vec<i64>,
}

fn nested(array: &Array2<i64>) -> Vec<Vec<i64>> {
    array.outer_iter().map(|row| row.to_vec()).collect()
}

impl From<&Batch> for BatchRecord {
    fn from(batch: &Batch) -> Self {
        BatchRecord {
            sentences: batch.sentences.clone(),
            sentence_lens: batch.sentence_lens.to_vec(),
            variants: batch.variants.to_vec(),
            ids: Factor::ALL
                .iter()
                .map(|&factor| (factor, nested(&batch.ids[factor.index()])))
                .collect(),
            chars: Factor::ALL
                .iter()
                .filter_map(|&factor| {
                    batch.chars(factor).map(|chars| {
                        (
                            factor,
                            CharBatchRecord {
                                seq_ids: nested(&chars.seq_ids),
                                seqs: nested(&chars.seqs),
                                seq_lens: chars.seq_lens.to_vec(),
                            },
                        )
                    })
                })
                .collect(),
            embeddings: batch.embeddings.as_ref().map(|embeddings| {
                embeddings
                    .outer_iter()
                    .map(|sentence| sentence.outer_iter().map(|token| token.to_vec()).collect())
                    .collect()
            }),
        }
    }
}
