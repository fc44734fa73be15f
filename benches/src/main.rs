use benches::BENCHMARKS;
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();

    if args.list {
        cli::list(BENCHMARKS);
        return Ok(());
    }

    if args.steps == 0 || args.repeat == 0 {
        eprintln!("The number of steps and repetitions must be greater than 0.");
        return Ok(());
    }

    let Some(name) = &args.name else {
        // If no specific benchmark is requested, run all benchmarks.
        return cli::run(BENCHMARKS, &args);
    };

    // Benchmarks can be selected by name or by their number in the list.
    let benchmark = BENCHMARKS.iter().find(|b| b.name == name).or_else(|| {
        name.parse::<usize>()
            .ok()
            .and_then(|i| BENCHMARKS.get(i.checked_sub(1)?))
    });

    match benchmark {
        Some(benchmark) => cli::run(core::slice::from_ref(benchmark), &args),
        None => {
            eprintln!("Benchmark '{name}' not found. Use --list to see available benchmarks.");
            Ok(())
        }
    }
}
