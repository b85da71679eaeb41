//! Tokenization for lexical scoring and feature hashing
//!
//! Latin-script text is split on Unicode word boundaries (UAX #29) and
//! lowercased. Runs of CJK characters, which carry no whitespace between
//! words, are emitted as overlapping character bigrams.
//!
//! Bigrams stand in for a dictionary segmenter such as jieba. They need no
//! dictionary and work the same for Chinese, Japanese, and Korean, at the
//! cost of extra terms that span word boundaries. Any two-character word in
//! a query is always one of the passage's bigrams, so recall is kept; BM25's
//! IDF weighting damps the spurious cross-word pairs.

use unicode_segmentation::UnicodeSegmentation;

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // Hiragana, Katakana
        | '\u{3400}'..='\u{4DBF}' // CJK Extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK Unified Ideographs
        | '\u{AC00}'..='\u{D7AF}' // Hangul syllables
        | '\u{F900}'..='\u{FAFF}' // CJK Compatibility Ideographs
    )
}

fn flush_run(run: &mut Vec<char>, tokens: &mut Vec<String>) {
    match run.len() {
        0 => {}
        1 => tokens.push(run[0].to_string()),
        _ => {
            for pair in run.windows(2) {
                tokens.push(pair.iter().collect());
            }
        }
    }
    run.clear();
}

/// Split text into lowercase terms
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run: Vec<char> = Vec::new();

    for segment in text.split_word_bounds() {
        if !segment.chars().any(char::is_alphanumeric) {
            flush_run(&mut run, &mut tokens);
            continue;
        }

        if segment.chars().all(is_cjk) {
            run.extend(segment.chars());
            continue;
        }

        flush_run(&mut run, &mut tokens);

        // Mixed segments keep their Latin part as one term and bigram the rest
        let (cjk, latin): (String, String) = segment.chars().partition(|c| is_cjk(*c));
        if !latin.is_empty() {
            tokens.push(latin.to_lowercase());
        }
        if !cjk.is_empty() {
            run.extend(cjk.chars());
            flush_run(&mut run, &mut tokens);
        }
    }

    flush_run(&mut run, &mut tokens);
    tokens
}
