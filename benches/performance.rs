use books_core::core::documents::DocumentStore;
use books_core::core::services::{ChartService, EntryFilter, JournalService, LedgerService, NewEntry, PeriodService, TaxService};
use books_core::domain::{Books, Expense, Invoice, InvoiceLine, InvoiceState, JournalLine, TaxKind, TaxRate};
use books_core::storage::json_backend::{load_books_from_path, save_books_to_path};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;
use uuid::Uuid;

fn build_sample_books(entry_count: usize) -> (Books, Uuid) {
    let mut books = Books::new("Benchmark");
    ChartService::seed_standard_chart(&mut books);
    let period = PeriodService::get_or_create(&mut books, 2025).id;
    let bank = books.account_by_code("572").map(|a| a.id).expect("bank");
    let supplies = books.account_by_code("628").map(|a| a.id).expect("supplies");
    let vat = books.account_by_code("472").map(|a| a.id).expect("vat input");

    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let journal = JournalService::default();
    for idx in 0..entry_count {
        let base = 50.0 + (idx % 100) as f64;
        let entry = NewEntry::new(
            start + Duration::days((idx % 365) as i64),
            format!("Suministro {idx}"),
            vec![
                JournalLine::debit(supplies, base),
                JournalLine::debit(vat, base * 0.21),
                JournalLine::credit(bank, base * 1.21),
            ],
        );
        journal.create_manual(&mut books, entry).expect("post entry");
    }
    (books, period)
}

fn build_sample_documents(count: usize) -> DocumentStore {
    let mut docs = DocumentStore::new();
    let vat = docs.add_tax_rate(TaxRate::new("IVA 21%", 21.0, TaxKind::Vat).as_default());
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    for idx in 0..count {
        let day = start + Duration::days((idx % 365) as i64);
        docs.add_invoice(
            Invoice::new(format!("F-{idx}"), Uuid::new_v4(), "Cliente", day)
                .with_state(InvoiceState::Emitted)
                .with_line(InvoiceLine::new("Servicio", 1.0, 100.0 + idx as f64).with_vat(vat)),
        );
        docs.add_expense(Expense::new(day, "Material", 40.0 + (idx % 10) as f64));
    }
    docs
}

fn bench_projections(c: &mut Criterion) {
    let (books, period) = build_sample_books(black_box(5_000));
    let bank = books.account_by_code("572").map(|a| a.id).expect("bank");

    c.bench_function("diary_5k", |b| {
        b.iter(|| black_box(LedgerService::journal(&books, &EntryFilter::period(period))))
    });

    c.bench_function("ledger_5k", |b| {
        b.iter(|| black_box(LedgerService::ledger(&books, bank, period, None, None).expect("ledger")))
    });

    c.bench_function("trial_balance_5k", |b| {
        b.iter(|| black_box(LedgerService::trial_balance(&books, period)))
    });
}

fn bench_tax_models(c: &mut Criterion) {
    let mut books = Books::new("Taxes");
    let period = PeriodService::get_or_create(&mut books, 2025).id;
    let docs = build_sample_documents(black_box(2_000));

    c.bench_function("vat_annual_2k", |b| {
        b.iter(|| black_box(TaxService::vat_annual(&books, &docs, period).expect("annual")))
    });
}

fn bench_books_io(c: &mut Criterion) {
    let (books, _) = build_sample_books(black_box(5_000));
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("books.json");

    c.bench_function("books_save_5k", |b| {
        b.iter(|| save_books_to_path(&books, &file_path).expect("save books"))
    });

    save_books_to_path(&books, &file_path).expect("seed");

    c.bench_function("books_load_5k", |b| {
        b.iter(|| black_box(load_books_from_path(&file_path).expect("load books")))
    });
}

criterion_group!(benches, bench_projections, bench_tax_models, bench_books_io);
criterion_main!(benches);
