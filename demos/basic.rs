use tf_idf_corpus::{AnnotatedDocument, Corpus, CorpusConfig, NormType, TextField, TfIdfTransform, TfType};

/// Whitespace tokenizer good enough for a demo: a trailing '.' becomes its
/// own token and ends the sentence.
fn annotate(id: &str, label: &str, text: &str) -> AnnotatedDocument {
    let mut sentences = vec![Vec::new()];
    for word in text.split_whitespace() {
        let (word, ends) = match word.strip_suffix('.') {
            Some(w) => (w, true),
            None => (word, false),
        };
        if let Some(current) = sentences.last_mut() {
            if !word.is_empty() {
                current.push(word.to_owned());
            }
            if ends {
                current.push(".".to_owned());
            }
        }
        if ends {
            sentences.push(Vec::new());
        }
    }
    sentences.retain(|s| !s.is_empty());
    AnnotatedDocument::new(id)
        .with_label(label)
        .with_field("text", TextField::from_words(sentences))
}

fn main() -> tf_idf_corpus::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = CorpusConfig::new(2).with_weighting(TfIdfTransform::new(TfType::LengthNorm, NormType::L2));
    let mut corpus = Corpus::new(config)?;

    let texts = [
        ("d1", "pets", "The dog picked up the bone. The dog then went and buried the bone."),
        ("d2", "pets", "The cat ignored the dog."),
        ("d3", "food", "A bone broth needs a good bone and a long simmer."),
    ];
    for (id, label, text) in texts {
        corpus.add_document(&annotate(id, label, text))?;
    }

    corpus.trim_tail(1, 1)?;
    corpus.finalize();

    let space = corpus.feature_space();
    let names = space.column_names(corpus.dictionary().dictionary(), corpus.features());
    println!("{} columns, labels: {:?}", space.dim(), corpus.class_labels().collect::<Vec<_>>());

    for doc in corpus.documents() {
        let row = doc.to_sparse_vec::<f32>(&space);
        let mut top: Vec<_> = row.iter().collect();
        top.sort_by(|a, b| b.1.total_cmp(&a.1));
        let top: Vec<String> = top
            .iter()
            .take(3)
            .map(|(col, w)| format!("{}={:.3}", names[*col], w))
            .collect();
        println!("{} [{}]: {}", doc.id(), doc.label().unwrap_or("-"), top.join(", "));
    }

    let query = corpus.vectorize(&annotate("q", "?", "Where is the bone?"));
    println!("query has {} known n-grams", query.nnz());
    Ok(())
}
