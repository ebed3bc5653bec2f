//! CLI for the just sandbox: runs demonstration scenarios through the
//! checked-operation facade and prints what the policies saw.
//!
//! Usage:
//!   just_sandbox [options] [scenario...]
//!
//! Log output goes to stderr and is controlled by `RUST_LOG`.

use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::process;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use just_sandbox::runner::ds::class::{ClassBuilder, ClassRef, Constructor, ParamType};
use just_sandbox::runner::ds::error::{OperationKind, Rejection, SandboxError, SandboxResult};
use just_sandbox::runner::ds::operations::type_conversion::{get_type, CastTarget};
use just_sandbox::runner::ds::value::Value;
use just_sandbox::runner::sandbox::{
    checked_call, checked_cast, checked_constructor, checked_get_property, checked_set_property,
    prepare_sandboxed_class, AssignOp, BinaryOp, ExecutionContext, Invoker, OpFlags, Policy,
    RecordingPolicy, SandboxConfig,
};

const SCENARIOS: &[&str] = &["call", "property", "broadcast", "constructor", "cast"];

/// Refuses calls to the named methods and forwards everything else.
struct DenyMethods {
    denied: HashSet<String>,
}

impl Policy for DenyMethods {
    fn on_method_call(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        if self.denied.contains(method) {
            let types = args.iter().map(get_type).collect();
            return Err(SandboxError::Rejected(Rejection::new(
                OperationKind::MethodCall,
                get_type(&receiver),
                Some(method),
                types,
                "denied on the command line",
            )));
        }
        invoker.call(receiver, Some(method), args)
    }

    fn name(&self) -> &str {
        "deny-methods"
    }
}

struct Options {
    config: SandboxConfig,
    no_policy: bool,
    denied: HashSet<String>,
    scenarios: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = match parse_args(env::args().skip(1).collect()) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage();
            process::exit(1);
        }
    };

    let mut ctx = ExecutionContext::with_config(options.config.clone());
    let recorder = Rc::new(RecordingPolicy::new());
    if !options.no_policy {
        ctx.register(recorder.clone());
        if !options.denied.is_empty() {
            ctx.register(Rc::new(DenyMethods {
                denied: options.denied.clone(),
            }));
        }
    }

    let mut failed = false;
    for scenario in &options.scenarios {
        recorder.clear();
        println!("== {}", scenario);
        match run_scenario(&mut ctx, scenario) {
            Ok(v) => println!("result: {}", v),
            Err(e) => {
                failed = true;
                println!("error: {}", e);
            }
        }
        for line in recorder.lines() {
            println!("  {}", line);
        }
    }
    if failed {
        process::exit(2);
    }
}

fn print_usage() {
    eprintln!("just_sandbox - run demonstration scenarios under sandbox policies");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  just_sandbox [options] [scenario...]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file>    Load [sandbox] settings from a TOML file");
    eprintln!("  --no-policy        Register nothing (every operation is refused)");
    eprintln!("  --deny <method>    Refuse calls to <method>; may be repeated");
    eprintln!("  -h, --help         Show this help");
    eprintln!();
    eprintln!("Scenarios: {} (default: all)", SCENARIOS.join(", "));
}

fn parse_args(args: Vec<String>) -> Result<Options, String> {
    let mut options = Options {
        config: SandboxConfig::default(),
        no_policy: false,
        denied: HashSet::new(),
        scenarios: Vec::new(),
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "--config" => {
                let path = it.next().ok_or("--config needs a file")?;
                options.config = SandboxConfig::load(Path::new(&path)).map_err(|e| e.to_string())?;
            }
            "--no-policy" => options.no_policy = true,
            "--deny" => {
                let method = it.next().ok_or("--deny needs a method name")?;
                options.denied.insert(method);
            }
            s if SCENARIOS.contains(&s) => options.scenarios.push(arg),
            other => return Err(format!("Unknown argument '{}'", other)),
        }
    }
    if options.scenarios.is_empty() {
        options.scenarios = SCENARIOS.iter().map(|s| s.to_string()).collect();
    }
    Ok(options)
}

fn point_class() -> ClassRef {
    ClassBuilder::new("Point")
        .field("x", Value::from(0))
        .field("y", Value::from(0))
        .constructor(Constructor::new(vec![]))
        .constructor(
            Constructor::new(vec![ParamType::Number, ParamType::Number]).body(|ctx, this, args| {
                checked_set_property(ctx, this.clone(), "x", AssignOp::Assign, args[0].clone(), OpFlags::NONE)?;
                checked_set_property(ctx, this.clone(), "y", AssignOp::Assign, args[1].clone(), OpFlags::NONE)?;
                Ok(())
            }),
        )
        .method("sum", Some(0), |ctx, this, _| {
            let x = checked_get_property(ctx, this.clone(), "x", OpFlags::NONE)?;
            let y = checked_get_property(ctx, this.clone(), "y", OpFlags::NONE)?;
            checked_call(ctx, x, "plus", vec![y], OpFlags::NONE)
        })
        .build()
}

fn run_scenario(ctx: &mut ExecutionContext, scenario: &str) -> SandboxResult<Value> {
    let point = point_class();
    match scenario {
        "call" => {
            let p = checked_constructor(ctx, &point, vec![Value::from(3), Value::from(4)])?;
            checked_call(ctx, p, "sum", vec![], OpFlags::NONE)
        }
        "property" => {
            let p = checked_constructor(ctx, &point, vec![])?;
            checked_set_property(
                ctx,
                p.clone(),
                "x",
                AssignOp::Compound(BinaryOp::Plus),
                Value::from(5),
                OpFlags::NONE,
            )?;
            checked_get_property(ctx, Value::Null, "x", OpFlags::NULL_SAFE)?;
            checked_get_property(ctx, p, "x", OpFlags::NONE)
        }
        "broadcast" => {
            let a = checked_constructor(ctx, &point, vec![Value::from(1), Value::from(2)])?;
            let b = checked_constructor(ctx, &point, vec![Value::from(3), Value::from(4)])?;
            let points = Value::list(vec![a, Value::Null, b]);
            checked_get_property(ctx, points, "x", OpFlags::BROADCAST)
        }
        "constructor" => {
            let labeled = prepare_sandboxed_class(
                ClassBuilder::new("LabeledPoint")
                    .extends(&point)
                    .field("label", Value::Null)
                    .constructor(
                        Constructor::new(vec![ParamType::String])
                            .chain_super(|ctx, _, args| {
                                let n = checked_call(ctx, args[0].clone(), "size", vec![], OpFlags::NONE)?;
                                Ok(vec![n.clone(), n])
                            })
                            .body(|ctx, this, args| {
                                checked_set_property(ctx, this.clone(), "label", AssignOp::Assign, args[0].clone(), OpFlags::NONE)?;
                                Ok(())
                            }),
                    )
                    .into_def(),
            )?;
            let p = checked_constructor(ctx, &labeled, vec![Value::from("abc")])?;
            checked_call(ctx, p, "sum", vec![], OpFlags::NONE)
        }
        "cast" => {
            let n = checked_cast(ctx, Value::from("42"), &CastTarget::Integer)?;
            checked_cast(ctx, n, &CastTarget::Integer)
        }
        other => Err(SandboxError::Resolution(format!("no scenario named '{}'", other))),
    }
}
