use std::collections::HashMap;
use std::io::BufRead;

use udfactor_encoders::lemma::{CopyPolicySelector, LemmaRuleEncoder};
use udfactor_encoders::vocab::{Alphabet, Number, PAD, RESERVED, ROOT};

use crate::dataset::{ConlluReader, CorpusError, Embeddings, RawSentence};
use crate::factor::{Factor, FactorConfig};
use crate::mappings::{ImmutableMappings, Mappings, MutableMappings};

/// Options for reading a corpus.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CorpusOptions {
    /// Drop the tokens of a sentence beyond this length.
    pub max_sentence_len: Option<usize>,

    /// Stop reading after this number of sentences.
    pub max_sentences: Option<usize>,

    /// Use this document variant for all sentences.
    pub variant: Option<String>,
}

/// A factor of a sentence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FactorColumn {
    strings: Vec<String>,
    ids: Vec<i64>,
    char_seq_ids: Option<Vec<usize>>,
}

impl FactorColumn {
    /// The values, including the root prefix.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// The value identifiers, including the root prefix.
    ///
    /// Heads are stored as numbers, `-1` for tokens without a head.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Identifiers of the character sequences in the corpus table.
    pub fn char_seq_ids(&self) -> Option<&[usize]> {
        self.char_seq_ids.as_deref()
    }
}

/// A sentence with all its factors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sentence {
    configs: Vec<FactorConfig>,
    factors: Vec<FactorColumn>,
    extras: Vec<Vec<String>>,
    variant: usize,
}

impl Sentence {
    /// The number of tokens, excluding the root.
    pub fn len(&self) -> usize {
        self.extras.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn factor(&self, factor: Factor) -> &FactorColumn {
        &self.factors[factor.index()]
    }

    pub fn config(&self, factor: Factor) -> FactorConfig {
        self.configs[factor.index()]
    }

    /// The values of a factor, without the root prefix.
    pub fn values(&self, factor: Factor) -> &[String] {
        let offset = self.config(factor).root_offset();
        &self.factor(factor).strings[offset..]
    }

    /// The value of a factor for a token (0-based, excluding the root).
    pub fn value(&self, token: usize, factor: Factor) -> &str {
        &self.values(factor)[token]
    }

    /// Lines preceding each token, the last position holds the trailing lines.
    pub fn extras(&self) -> &[Vec<String>] {
        &self.extras
    }

    /// The document variant identifier.
    pub fn variant(&self) -> usize {
        self.variant
    }
}

/// Deduplicated character sequences of a factor.
#[derive(Debug)]
pub struct CharSeqTable {
    index: HashMap<String, usize>,
    seqs: Vec<Vec<usize>>,
}

impl Default for CharSeqTable {
    fn default() -> Self {
        let mut table = CharSeqTable {
            index: HashMap::new(),
            seqs: Vec::new(),
        };
        for (id, word) in RESERVED.iter().enumerate() {
            table.index.insert(word.to_string(), id);
            table.seqs.push(vec![id]);
        }
        table
    }
}

impl CharSeqTable {
    fn id_of<C>(&mut self, word: &str, alphabet: &Alphabet<C>) -> usize
    where
        C: Number<char>,
    {
        if let Some(&id) = self.index.get(word) {
            return id;
        }

        let id = self.seqs.len();
        self.seqs.push(alphabet.encode(word));
        self.index.insert(word.to_owned(), id);
        id
    }

    /// Get a character sequence.
    pub fn seq(&self, id: usize) -> &[usize] {
        &self.seqs[id]
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }
}

/// A corpus of sentences encoded with mappings.
#[derive(Debug)]
pub struct Corpus {
    sentences: Vec<Sentence>,
    char_seqs: Vec<Option<CharSeqTable>>,
    embeddings: Option<Embeddings>,
}

impl Corpus {
    /// Read a training corpus.
    ///
    /// The mappings are constructed while reading. The lemma rule copy
    /// policy that results in the fewest distinct rules is used.
    pub fn read_train<R>(
        read: R,
        root_factors: &[Factor],
        options: &CorpusOptions,
    ) -> Result<(Corpus, MutableMappings), CorpusError>
    where
        R: BufRead,
    {
        let mut mappings = MutableMappings::new(root_factors);
        let mut corpus = Corpus::with_mappings(&mappings);
        let mut selector = CopyPolicySelector::new();

        let mut raw_sentences = Vec::new();
        for raw in Self::raw_sentences(read, options) {
            let raw = raw?;
            for token in 0..raw.tokens.len() {
                selector.add(
                    raw.value(token, Factor::Forms),
                    raw.value(token, Factor::Lemmas),
                );
            }
            let sentence = corpus.encode(&raw, &mappings, None, options);
            corpus.sentences.push(sentence);
            raw_sentences.push(raw);
        }

        let (with_copy, without_copy) = selector.rule_counts();
        let lemma_encoder = selector.select();
        log::info!(
            "Lemma rules: {} with copying, {} without copying",
            with_copy,
            without_copy
        );
        mappings.set_lemma_encoder(lemma_encoder);

        for (sentence, raw) in corpus.sentences.iter_mut().zip(&raw_sentences) {
            let lemmas = Self::encode_lemmas(raw, &mappings, lemma_encoder);
            let column = &mut sentence.factors[Factor::Lemmas.index()];
            let offset = column.ids.len() - lemmas.len();
            column.ids[offset..].copy_from_slice(&lemmas);
        }

        log::info!("Read {} training sentences", corpus.len());

        Ok((corpus, mappings))
    }

    /// Read a corpus using frozen mappings.
    ///
    /// Unknown values and characters are mapped to the unknown symbol,
    /// unknown document variants to 0.
    pub fn read<R>(
        read: R,
        mappings: &ImmutableMappings,
        options: &CorpusOptions,
    ) -> Result<Corpus, CorpusError>
    where
        R: BufRead,
    {
        let mut corpus = Corpus::with_mappings(mappings);

        for raw in Self::raw_sentences(read, options) {
            let raw = raw?;
            let sentence = corpus.encode(&raw, mappings, Some(mappings.lemma_encoder()), options);
            corpus.sentences.push(sentence);
        }

        Ok(corpus)
    }

    fn with_mappings<W, C>(mappings: &Mappings<W, C>) -> Self
    where
        W: Number<String>,
        C: Number<char>,
    {
        Corpus {
            embeddings: None,
            sentences: Vec::new(),
            char_seqs: Factor::ALL
                .iter()
                .map(|&factor| {
                    if mappings.config(factor).characters {
                        Some(CharSeqTable::default())
                    } else {
                        None
                    }
                })
                .collect(),
        }
    }

    fn raw_sentences<'a, R>(
        read: R,
        options: &CorpusOptions,
    ) -> impl Iterator<Item = Result<RawSentence, CorpusError>> + 'a
    where
        R: BufRead + 'a,
    {
        ConlluReader::new(read)
            .max_sentence_len(options.max_sentence_len)
            .take(options.max_sentences.unwrap_or(usize::MAX))
    }

    /// Encode a sentence.
    ///
    /// Lemmas are encoded as rules when a lemma encoder is given,
    /// otherwise their identifiers are left as padding.
    fn encode<W, C>(
        &mut self,
        raw: &RawSentence,
        mappings: &Mappings<W, C>,
        lemma_encoder: Option<LemmaRuleEncoder>,
        options: &CorpusOptions,
    ) -> Sentence
    where
        W: Number<String>,
        C: Number<char>,
    {
        let configs = Factor::ALL
            .iter()
            .map(|&factor| mappings.config(factor))
            .collect::<Vec<_>>();

        let factors = Factor::ALL
            .iter()
            .map(|&factor| {
                let config = mappings.config(factor);
                let mut strings = Vec::with_capacity(raw.tokens.len() + 1);
                let mut ids = Vec::with_capacity(raw.tokens.len() + 1);
                if config.with_root {
                    strings.push(RESERVED[ROOT].to_owned());
                    ids.push(ROOT as i64);
                }
                strings.extend(raw.tokens.iter().map(|token| token[factor.index()].clone()));

                match factor {
                    Factor::Head => ids.extend(
                        strings[config.root_offset()..]
                            .iter()
                            .map(|head| head.parse::<i64>().unwrap_or(-1)),
                    ),
                    Factor::Lemmas => match lemma_encoder {
                        Some(lemma_encoder) => {
                            ids.extend(Self::encode_lemmas(raw, mappings, lemma_encoder))
                        }
                        None => ids.resize(strings.len(), PAD as i64),
                    },
                    _ => {
                        let vocab = mappings.vocab(factor);
                        ids.extend(
                            strings[config.root_offset()..]
                                .iter()
                                .map(|value| vocab.id_of(value) as i64),
                        )
                    }
                }

                let char_seq_ids = match (
                    self.char_seqs[factor.index()].as_mut(),
                    mappings.alphabet(factor),
                ) {
                    (Some(table), Some(alphabet)) => Some(
                        strings
                            .iter()
                            .enumerate()
                            .map(|(idx, value)| {
                                if config.with_root && idx == 0 {
                                    ROOT
                                } else {
                                    table.id_of(value, alphabet)
                                }
                            })
                            .collect(),
                    ),
                    _ => None,
                };

                FactorColumn {
                    strings,
                    ids,
                    char_seq_ids,
                }
            })
            .collect();

        let variant = options.variant.as_deref().unwrap_or(&raw.variant);

        Sentence {
            configs,
            factors,
            extras: raw.extras.clone(),
            variant: mappings.variant_id(variant),
        }
    }

    fn encode_lemmas<W, C>(
        raw: &RawSentence,
        mappings: &Mappings<W, C>,
        lemma_encoder: LemmaRuleEncoder,
    ) -> Vec<i64>
    where
        W: Number<String>,
        C: Number<char>,
    {
        let vocab = mappings.vocab(Factor::Lemmas);
        (0..raw.tokens.len())
            .map(|token| {
                let rule = lemma_encoder.encode(
                    raw.value(token, Factor::Forms),
                    raw.value(token, Factor::Lemmas),
                );
                vocab.id_of(&rule.to_string()) as i64
            })
            .collect()
    }

    /// Attach contextualized embeddings to the sentences.
    ///
    /// There must be embeddings for every token of every sentence.
    pub fn with_embeddings(mut self, embeddings: Embeddings) -> Result<Self, CorpusError> {
        if embeddings.len() != self.len() {
            return Err(CorpusError::EmbeddingsCount {
                embeddings: embeddings.len(),
                sentences: self.len(),
            });
        }

        for (idx, sentence) in self.sentences.iter().enumerate() {
            let n_embeddings = embeddings.sentence(idx).nrows();
            if n_embeddings != sentence.len() {
                return Err(CorpusError::EmbeddingsLength {
                    sentence: idx,
                    embeddings: n_embeddings,
                    tokens: sentence.len(),
                });
            }
        }

        self.embeddings = Some(embeddings);

        Ok(self)
    }

    pub fn embeddings(&self) -> Option<&Embeddings> {
        self.embeddings.as_ref()
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// The character sequence table of a factor.
    pub fn char_seqs(&self, factor: Factor) -> Option<&CharSeqTable> {
        self.char_seqs[factor.index()].as_ref()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use udfactor_encoders::vocab::{PAD, ROOT, UNK};

    use super::{Corpus, CorpusOptions};
    use crate::dataset::{CorpusError, Embeddings};
    use crate::factor::Factor;

    pub(crate) static TRAIN: &str = "# variant = news
1\tHonden\thond\tNOUN\tN\tNumber=Plur\t2\tnsubj\t_\t_
2\tblaffen\tblaffen\tVERB\tWW\t_\t0\troot\t_\t_

# variant = wiki
1\tKatten\tkat\tNOUN\tN\tNumber=Plur\t2\tnsubj\t_\t_
2\tmiauwen\tmiauwen\tVERB\tWW\t_\t0\troot\t_\t_
3\thard\thard\tADJ\tADJ\t_\t_\t_\t_\t_
";

    #[test]
    fn training_corpus_grows_mappings() {
        let (corpus, mappings) = Corpus::read_train(
            Cursor::new(TRAIN),
            &[Factor::Forms, Factor::Head],
            &CorpusOptions::default(),
        )
        .unwrap();

        assert_eq!(corpus.len(), 2);
        let sentence = &corpus.sentences()[1];
        assert_eq!(sentence.len(), 3);
        assert_eq!(sentence.variant(), 1);
        assert_eq!(sentence.factor(Factor::Forms).ids(), &[ROOT as i64, 5, 6, 7]);
        assert_eq!(sentence.factor(Factor::UPos).ids(), &[3, 4, 5]);
        assert_eq!(sentence.factor(Factor::Head).ids(), &[ROOT as i64, 2, 0, -1]);
        assert_eq!(sentence.values(Factor::Forms)[0], "Katten");
        assert_eq!(sentence.factor(Factor::Forms).strings()[0], "<root>");

        // Lemma rules are interned after the copy policy is chosen.
        let lemma_ids = sentence.factor(Factor::Lemmas).ids();
        assert!(lemma_ids.iter().all(|&id| id >= 3));
        let first_lemmas = corpus.sentences()[0].factor(Factor::Lemmas).ids();
        assert_eq!(first_lemmas[1], lemma_ids[1]);
        assert_eq!(lemma_ids[1], lemma_ids[2]);

        let mappings = mappings.freeze();
        assert_eq!(
            mappings.vocab(Factor::Lemmas).word_of(lemma_ids[0] as usize),
            Some(
                mappings
                    .lemma_encoder()
                    .encode("Katten", "kat")
                    .to_string()
            )
        );
    }

    #[test]
    fn character_sequences_are_deduplicated() {
        let corpus = "1\tna\tna\tADP\tVZ\t_\t0\troot\t_\t_\n2\tna\tna\tADP\tVZ\t_\t1\tfixed\t_\t_\n";
        let (corpus, mappings) =
            Corpus::read_train(Cursor::new(corpus), &[Factor::Forms], &CorpusOptions::default())
                .unwrap();

        let char_seq_ids = corpus.sentences()[0]
            .factor(Factor::Forms)
            .char_seq_ids()
            .unwrap();
        assert_eq!(char_seq_ids, &[ROOT, 3, 3]);

        let table = corpus.char_seqs(Factor::Forms).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.seq(3), &[3, 4]);
        assert_eq!(table.seq(PAD), &[PAD]);
        assert!(mappings.alphabet(Factor::Lemmas).is_none());
    }

    #[test]
    fn inference_corpus_uses_frozen_mappings() {
        let (_, mappings) = Corpus::read_train(
            Cursor::new(TRAIN),
            &[Factor::Forms],
            &CorpusOptions::default(),
        )
        .unwrap();
        let mappings = mappings.freeze();

        let data = "# variant = forum\n1\tHonden\thond\tNOUN\tN\t_\t0\troot\t_\t_\n2\tzwemmen\tzwemmen\tVERB\tWW\t_\t1\tacl\t_\t_\n";
        let corpus = Corpus::read(Cursor::new(data), &mappings, &CorpusOptions::default()).unwrap();
        let sentence = &corpus.sentences()[0];

        assert_eq!(sentence.variant(), 0);
        assert_eq!(sentence.factor(Factor::Forms).ids(), &[ROOT as i64, 3, UNK as i64]);
        assert_eq!(sentence.factor(Factor::Lemmas).ids()[0], 3);
        assert_eq!(sentence.factor(Factor::Head).ids(), &[0, 1]);
        assert_eq!(mappings.vocab(Factor::Forms).len(), 8);

        // 'z' is not in the training alphabet.
        let table = corpus.char_seqs(Factor::Forms).unwrap();
        let zwemmen = sentence.factor(Factor::Forms).char_seq_ids().unwrap()[2];
        assert_eq!(table.seq(zwemmen)[0], UNK);

        let options = CorpusOptions {
            variant: Some("wiki".to_string()),
            max_sentences: Some(1),
            ..Default::default()
        };
        let corpus = Corpus::read(Cursor::new(TRAIN), &mappings, &options).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.sentences()[0].variant(), 1);
    }

    #[test]
    fn embeddings_match_sentence_lengths() {
        let (corpus, _) = Corpus::read_train(
            Cursor::new(TRAIN),
            &[Factor::Forms],
            &CorpusOptions::default(),
        )
        .unwrap();
        let embeddings =
            Embeddings::read(Cursor::new("[[1.0], [2.0]]\n[[3.0], [4.0], [5.0]]\n"), None)
                .unwrap();
        let corpus = corpus.with_embeddings(embeddings).unwrap();
        assert_eq!(corpus.embeddings().unwrap().dim(), 1);

        let (corpus, _) = Corpus::read_train(
            Cursor::new(TRAIN),
            &[Factor::Forms],
            &CorpusOptions::default(),
        )
        .unwrap();
        let embeddings =
            Embeddings::read(Cursor::new("[[1.0], [2.0]]\n[[3.0], [4.0]]\n"), None).unwrap();
        assert!(matches!(
            corpus.with_embeddings(embeddings),
            Err(CorpusError::EmbeddingsLength {
                sentence: 1,
                embeddings: 2,
                tokens: 3
            })
        ));
    }
}
