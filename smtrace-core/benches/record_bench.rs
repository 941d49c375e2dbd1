//! Benchmarks for trace recording
//!
//! Compares tracing on vs off at the call site, and times full state dumps.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use smtrace_core::{
    InMemoryObjectModel, MemorySink, ObjectInfo, ObjectRef, PropertiesToTrace, PropertyState,
    StateDump, TraceContext, TraceEvent, TraceItem, TraceItemArgs,
};

/// A chain of `n` filters, each fed by the previous, shown in one view
fn create_pipeline(n: u64) -> Arc<InMemoryObjectModel> {
    let model = InMemoryObjectModel::new();
    let view = ObjectRef(1);
    model.add_object(
        ObjectInfo::view(view, "RenderView", "RenderView1"),
        vec![PropertyState::vector("ViewSize", vec![400.into(), 400.into()])],
    );
    for i in 0..n {
        let id = ObjectRef(100 + i);
        let mut properties = vec![
            PropertyState::new("Value", 0.5),
            PropertyState::new("Enabled", true),
        ];
        if i > 0 {
            properties.push(PropertyState::vector("Input", vec![ObjectRef(99 + i).into()]));
        }
        model.add_object(ObjectInfo::source(id, "Filter", format!("Filter{}", i)), properties);
        model.add_object(
            ObjectInfo::representation(ObjectRef(10_000 + i), id, view, "Display"),
            vec![PropertyState::new("Opacity", 1.0)],
        );
        model.set_property(id, "Value", vec![(i as f64).into()]).unwrap();
    }
    Arc::new(model)
}

fn context(model: Arc<InMemoryObjectModel>) -> TraceContext {
    TraceContext::new(model).with_sink(Arc::new(MemorySink::new()))
}

fn bench_record_disabled(c: &mut Criterion) {
    let ctx = context(create_pipeline(1));

    c.bench_function("record_disabled", |b| {
        b.iter(|| {
            TraceItem::record(
                &ctx,
                "CallFunction",
                TraceItemArgs::new().arg("ResetSession").kwarg("force", true),
            );
        })
    });
}

fn bench_record_text(c: &mut Criterion) {
    let ctx = context(create_pipeline(1));
    ctx.start_trace();

    c.bench_function("record_text", |b| {
        b.iter(|| {
            TraceItem::record(&ctx, "TraceText", TraceItemArgs::new().arg(black_box("# marker")));
        })
    });
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    for size in [10u64, 100] {
        let model = create_pipeline(size);
        group.bench_with_input(BenchmarkId::new("register_and_show", size), &size, |b, &n| {
            b.iter(|| {
                let ctx = context(model.clone());
                ctx.start_trace();
                for i in 0..n {
                    let source = ObjectRef(100 + i);
                    ctx.record(&TraceEvent::new(
                        "RegisterPipelineProxy",
                        TraceItemArgs::new().kwarg("proxy", source),
                    ));
                    ctx.record(&TraceEvent::new(
                        "Show",
                        TraceItemArgs::new()
                            .kwarg("producer", source)
                            .kwarg("view", ObjectRef(1))
                            .kwarg("display", ObjectRef(10_000 + i)),
                    ));
                }
                black_box(ctx.stop_trace().unwrap())
            })
        });
    }

    group.finish();
}

fn bench_state_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_dump");

    for size in [10u64, 100, 1000] {
        let model = create_pipeline(size);
        group.bench_with_input(BenchmarkId::new("modified", size), &model, |b, model| {
            b.iter(|| {
                let dump = StateDump::new(model.clone(), Arc::new(MemorySink::new()))
                    .properties_to_trace_on_create(PropertiesToTrace::Modified);
                black_box(dump.render().unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("all", size), &model, |b, model| {
            b.iter(|| {
                let dump = StateDump::new(model.clone(), Arc::new(MemorySink::new()))
                    .properties_to_trace_on_create(PropertiesToTrace::All);
                black_box(dump.render().unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_record_disabled,
    bench_record_text,
    bench_session,
    bench_state_dump
);

criterion_main!(benches);
