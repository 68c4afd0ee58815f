use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sprig_core::{create_root, h, Element, MemoryHost, VNode};

fn list(keys: impl Iterator<Item = usize>) -> Element {
    h("ul").children(keys.map(|key| VNode::from(h("li").key(key).attr("n", key as u64).child(key))))
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("Keyed Reconciliation");

    group.bench_function("mount 1000", |b| {
        b.iter(|| {
            let host = MemoryHost::new();
            let root = create_root(host.create_container(), host.clone());
            root.render(list(0..1000));
            host.run_until_idle();
            black_box(host.take_ops().len());
        });
    });

    let host = MemoryHost::new();
    let root = create_root(host.create_container(), host.clone());
    root.render(list(0..1000));
    host.run_until_idle();
    host.take_ops();

    group.bench_function("identical rerender 1000", |b| {
        b.iter(|| {
            root.render(list(0..1000));
            host.run_until_idle();
            black_box(root.last_commit());
        });
    });

    // Alternate between two orders so every iteration does real moves.
    let mut reversed = false;
    group.bench_function("reverse 1000", |b| {
        b.iter(|| {
            reversed = !reversed;
            if reversed {
                root.render(list((0..1000).rev()));
            } else {
                root.render(list(0..1000));
            }
            host.run_until_idle();
            black_box(host.take_ops().len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
