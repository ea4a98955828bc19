use cadr::runtime::{
    call::{call2, invoke},
    context::Runtime,
    error::Result,
    function::{Arity, Native, func_host, func_n2, native},
    pair::list,
    value::Value,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn add(_: &mut Runtime, _: Value, a: Value, b: Value) -> Result<Value> {
    Ok(Value::Fixnum(
        a.as_fixnum().unwrap_or(0) + b.as_fixnum().unwrap_or(0),
    ))
}

fn add_all(_: &mut Runtime, _: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Fixnum(args.iter().filter_map(|v| v.as_fixnum()).sum()))
}

fn bench_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("call/two_args");
    let mut rt = Runtime::new();
    let (a, b) = (Value::Fixnum(20), Value::Fixnum(22));

    let exact = func_n2(&mut rt, add);
    let optional = native(
        &mut rt,
        Value::Nil,
        Native::N(add_all),
        Arity::new(3, 1, false).unwrap(),
    )
    .unwrap();
    let host = func_host(&mut rt, Arity::exact(2), |rt, args| {
        add(rt, Value::Nil, args[0], args[1])
    });
    let items: Vec<Value> = (0..64).map(Value::Fixnum).collect();
    let data = list(&mut rt, &items);
    for callee in [exact, optional, host, data] {
        rt.register_root(callee);
    }

    group.bench_function(BenchmarkId::new("fast_path", "native"), |bench| {
        bench.iter(|| black_box(call2(&mut rt, exact, black_box(a), black_box(b)).unwrap()));
    });
    group.bench_function(BenchmarkId::new("invoke", "native"), |bench| {
        bench.iter(|| black_box(invoke(&mut rt, exact, &[black_box(a), black_box(b)]).unwrap()));
    });
    group.bench_function(BenchmarkId::new("invoke", "optional_slot"), |bench| {
        bench.iter(|| {
            black_box(invoke(&mut rt, optional, &[black_box(a), black_box(b)]).unwrap())
        });
    });
    group.bench_function(BenchmarkId::new("invoke", "host_closure"), |bench| {
        bench.iter(|| black_box(call2(&mut rt, host, black_box(a), black_box(b)).unwrap()));
    });
    group.bench_function(BenchmarkId::new("invoke", "list_slice"), |bench| {
        bench.iter(|| {
            let slice = call2(&mut rt, data, black_box(Value::Fixnum(8)), black_box(Value::Fixnum(12)));
            rt.maybe_collect(&[]);
            black_box(slice.unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_invoke);
criterion_main!(benches);
