use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

pub const ANALYZER_NAME: &str = "lower_whitespace";

#[derive(Debug, Clone, Copy)]
pub struct Fields {
    pub ordinal: Field,
    pub text: Field,
}

pub fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let ordinal = builder.add_u64_field("ordinal", STORED);
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(ANALYZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqs);
    let text = builder.add_text_field("text", TextOptions::default().set_indexing_options(indexing));
    (builder.build(), Fields { ordinal, text })
}

pub fn register_analyzer(index: &Index) {
    let analyzer = TextAnalyzer::builder(WhitespaceTokenizer::default()).filter(LowerCaser).build();
    index.tokenizers().register(ANALYZER_NAME, analyzer);
}

/// Query-side tokenization; matches what the registered analyzer emits.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
