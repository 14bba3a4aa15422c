use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use loradex::search::matching;
use loradex::search::tokenizer::QueryTokenizer;

const PROMPT: &str = "photorealistic portrait of a woman in a cyberpunk city at night, \
                      neon lighting, depth of field, intricate detail, oil painting texture";

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = QueryTokenizer::new();
    c.bench_function("tokenize_prompt", |b| {
        b.iter(|| tokenizer.tokenize(black_box(PROMPT)));
    });
}

fn bench_match_tags(c: &mut Criterion) {
    let tokenizer = QueryTokenizer::new();
    let tokens = tokenizer.tokenize(PROMPT);

    // tag mix typical of one synced overlay: triggers + histogram tags
    let tags: Vec<String> = [
        "cyberpunk", "neon", "city", "night", "portrait", "photorealistic",
        "oil painting", "rain", "umbrella", "neon_city", "street", "reflection",
        "depth of field", "bokeh", "woman", "detailed", "1girl", "building",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect();

    c.bench_function("match_tags_single_overlay", |b| {
        b.iter(|| matching::match_tags(black_box(&tokens), black_box(&tags)));
    });

    c.bench_function("match_tags_catalog_200", |b| {
        b.iter(|| {
            for _ in 0..200 {
                matching::match_tags(black_box(&tokens), black_box(&tags));
            }
        });
    });
}

criterion_group!(benches, bench_tokenize, bench_match_tags);
criterion_main!(benches);
