use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use billquill_pricing::{DiscountKind, DocumentRates, LineItem, compute_financials};

fn items(count: usize) -> Vec<LineItem> {
    (0..count)
        .map(|i| {
            let mut item = LineItem::new(
                Decimal::from(i as u64 % 9 + 1),
                Decimal::new(1999 + i as i64 * 37, 2),
                Decimal::new(750 + i as i64 * 11, 2),
            );
            if i % 3 == 0 {
                item.tax_rate = Some(dec!(7.5));
            }
            if i % 4 == 0 {
                item.subject_to_withholding = true;
            }
            item
        })
        .collect()
}

fn rates() -> DocumentRates {
    DocumentRates {
        discount: dec!(5),
        discount_kind: DiscountKind::Percentage,
        default_tax_rate: Some(dec!(10)),
        vat_rate: dec!(7),
        wht_rate: dec!(3),
    }
}

fn bench_compute_financials(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_financials");
    let rates = rates();

    for count in [1usize, 10, 100, 1000] {
        let items = items(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("document", count),
            &items,
            |b, items| b.iter(|| compute_financials(black_box(items), black_box(&rates))),
        );
    }

    group.finish();
}

fn bench_dirty_input_sanitization(c: &mut Criterion) {
    // Half the items need sanitizing; measures the warning/logging path.
    let mut dirty = items(100);
    for (i, item) in dirty.iter_mut().enumerate() {
        if i % 2 == 0 {
            item.quantity = Decimal::NEGATIVE_ONE;
        }
    }
    let rates = rates();

    c.bench_function("compute_financials_dirty_100", |b| {
        b.iter(|| compute_financials(black_box(&dirty), black_box(&rates)))
    });
}

criterion_group!(
    benches,
    bench_compute_financials,
    bench_dirty_input_sanitization
);
criterion_main!(benches);
