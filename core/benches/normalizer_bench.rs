use agora_core::normalizer::{English, Greek, Normalizer};
use agora_core::{Document, DocumentInfo};
use criterion::{criterion_group, criterion_main, Criterion};

const PROEM: &str = "ἄνδρα μοι ἔννεπε, μοῦσα, πολύτροπον, ὃς μάλα πολλὰ\n\
πλάγχθη, ἐπεὶ Τροίης ἱερὸν πτολίεθρον ἔπερσεν·\n\
πολλῶν δ᾽ ἀνθρώπων ἴδεν ἄστεα καὶ νόον ἔγνω,\n";

const ENGLISH_TEXT: &str = "Tell me, O muse, of that ingenious hero who travelled far and wide \
after he had sacked the famous town of Troy. Many cities did he visit, and many were the nations \
with whose manners and customs he was acquainted.\n";

fn bench_clean_text(c: &mut Criterion) {
    let greek = PROEM.repeat(50);
    let english = ENGLISH_TEXT.repeat(50);
    c.bench_function("clean_text_greek", |b| b.iter(|| Greek.clean_text(&greek)));
    c.bench_function("clean_text_english", |b| b.iter(|| English.clean_text(&english)));
}

fn bench_document_counts(c: &mut Criterion) {
    let greek = PROEM.repeat(50);
    let info = DocumentInfo::new("odyssey.txt", true);
    c.bench_function("document_from_text_greek", |b| {
        b.iter(|| Document::from_text("odyssey", &greek, &info, " ", &Greek).to_doc_counts())
    });
}

criterion_group!(benches, bench_clean_text, bench_document_counts);
criterion_main!(benches);
