/// Benchmark runner for the dispatch path.
///
/// Measures the cost of routing checked operations through policy chains of
/// increasing length, against calling the real operation directly.

extern crate just_sandbox;

use std::rc::Rc;
use std::time::{Duration, Instant};

use just_sandbox::runner::ds::class::{ClassBuilder, ClassRef, Constructor, ParamType};
use just_sandbox::runner::ds::object::Instance;
use just_sandbox::runner::ds::operations::object::invoke_method;
use just_sandbox::runner::ds::value::Value;
use just_sandbox::runner::sandbox::{
    checked_call, checked_constructor, checked_get_property, checked_set_property,
    prepare_sandboxed_class, AssignOp, BinaryOp, ExecutionContext, OpFlags, Policy,
};

struct PassThrough;
impl Policy for PassThrough {}

fn context_with(policies: usize) -> ExecutionContext {
    let mut ctx = ExecutionContext::new();
    for _ in 0..policies {
        ctx.register(Rc::new(PassThrough));
    }
    ctx
}

fn classes() -> (ClassRef, ClassRef) {
    let base = ClassBuilder::new("Base")
        .field("n", Value::from(0))
        .constructor(Constructor::new(vec![ParamType::Number]))
        .method("get", Some(0), |_, _, _| Ok(Value::from(1)))
        .build();
    let derived = prepare_sandboxed_class(
        ClassBuilder::new("Derived")
            .extends(&base)
            .constructor(
                Constructor::new(vec![ParamType::Number]).chain_super(|_, _, args| Ok(args.to_vec())),
            )
            .into_def(),
    )
    .expect("Derived should be sandboxable");
    (base, derived)
}

/// Run `op` `iterations` times against a fresh context and return the time.
fn run_benchmark<F>(policies: usize, iterations: u32, op: F) -> Duration
where
    F: Fn(&mut ExecutionContext),
{
    let mut ctx = context_with(policies);
    let start = Instant::now();
    for _ in 0..iterations {
        op(&mut ctx);
    }
    start.elapsed()
}

fn main() {
    println!("=======================================================");
    println!("  Just Sandbox - Dispatch Benchmarks");
    println!("  Checked operations over pass-through policy chains");
    println!("=======================================================\n");

    let (base, derived) = classes();
    let obj = Value::Object(Instance::allocate(&base));
    let iterations = 100_000;

    let direct = {
        let mut ctx = ExecutionContext::new();
        let start = Instant::now();
        for _ in 0..iterations {
            let _ = invoke_method(&mut ctx, &obj, "get", vec![]);
        }
        start.elapsed()
    };
    println!("{:<28} {:>12.1} ns/op\n", "Direct method call", per_op(direct, iterations));

    println!(
        "{:<28} {:>10} {:>10} {:>10} {:>10}",
        "Benchmark (ns/op)", "1", "4", "16", "64"
    );
    println!("{}", "-".repeat(72));

    let chains = [1usize, 4, 16, 64];
    let rows: Vec<(&str, Box<dyn Fn(&mut ExecutionContext) + '_>)> = vec![
        (
            "Method call",
            Box::new(|ctx: &mut ExecutionContext| {
                let _ = checked_call(ctx, obj.clone(), "get", vec![], OpFlags::NONE);
            }),
        ),
        (
            "Property get",
            Box::new(|ctx: &mut ExecutionContext| {
                let _ = checked_get_property(ctx, obj.clone(), "n", OpFlags::NONE);
            }),
        ),
        (
            "Compound assignment",
            Box::new(|ctx: &mut ExecutionContext| {
                let _ = checked_set_property(
                    ctx,
                    obj.clone(),
                    "n",
                    AssignOp::Compound(BinaryOp::Plus),
                    Value::from(0),
                    OpFlags::NONE,
                );
            }),
        ),
        (
            "Chained construction",
            Box::new(|ctx: &mut ExecutionContext| {
                let _ = checked_constructor(ctx, &derived, vec![Value::from(1)]);
            }),
        ),
    ];

    for (name, op) in &rows {
        let timings: Vec<String> = chains
            .iter()
            .map(|&k| {
                let d = run_benchmark(k, iterations, |ctx| op(ctx));
                format!("{:>10.1}", per_op(d, iterations))
            })
            .collect();
        println!("{:<28} {}", name, timings.join(" "));
    }

    // An empty chain fails closed; this is the cost of a rejection.
    let rejected = run_benchmark(0, iterations, |ctx| {
        let _ = checked_call(ctx, obj.clone(), "get", vec![], OpFlags::NONE);
    });
    println!("\n{:<28} {:>12.1} ns/op", "Rejected (empty chain)", per_op(rejected, iterations));
}

fn per_op(d: Duration, iterations: u32) -> f64 {
    d.as_nanos() as f64 / iterations as f64
}
