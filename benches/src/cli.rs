//! A command line interface for running physics benchmarks.

use core::{ops::Range, time::Duration};
use std::time::Instant;

use benches::{Benchmark, TIME_STEP};
use clap::Parser;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The name or number of the benchmark to run. Leave empty to run all benchmarks.
    #[arg(short, long)]
    pub name: Option<String>,

    /// A range for which thread counts to run the benchmarks with.
    /// Can be specified as `start..end` (exclusive), `start..=end` (inclusive), or `start`.
    #[arg(short, long, value_parser = parse_range, default_value = "1")]
    pub threads: Range<u32>,

    /// The number of steps to run for each benchmark.
    #[arg(short, long, default_value_t = 500)]
    pub steps: u32,

    /// The number of times to repeat each benchmark.
    /// The results will be averaged over these repetitions.
    #[arg(short, long, default_value_t = 5)]
    pub repeat: u32,

    /// List all available benchmarks in a numbered list.
    #[arg(short, long)]
    pub list: bool,

    /// The output directory where results are written in CSV format.
    /// Leave empty to disable output.
    #[arg(short, long)]
    pub output: Option<String>,
}

impl Args {
    /// Parses the command line arguments and returns an `Args` instance.
    pub fn parse() -> Self {
        Parser::parse()
    }
}

fn parse_range(s: &str) -> Result<Range<u32>, String> {
    let parse = |s: &str| s.parse::<u32>().map_err(|e| e.to_string());
    match s.split_once("..") {
        // Single value, for example "4"
        None => {
            let start = parse(s)?;
            Ok(start..start + 1)
        }
        // Inclusive range, for example "4..=10"
        Some((start, end)) if end.starts_with('=') => Ok(parse(start)?..parse(&end[1..])? + 1),
        // Exclusive range, for example "4..10"
        Some((start, end)) => Ok(parse(start)?..parse(end)?),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BenchmarkOptions {
    /// The number of narrow phase threads.
    pub threads: u32,
    /// The number of steps to run for each benchmark.
    pub steps: u32,
    /// The number of times to repeat the benchmark.
    ///
    /// This is used to average the results over multiple runs.
    pub repeat: u32,
}

pub struct BenchmarkResult {
    /// The average time taken for a single step in the benchmark.
    pub average_time: Duration,
    /// The minimum time taken for a single step in the benchmark.
    pub min_time: Duration,
}

/// Lists all available benchmarks in the console.
pub fn list(benchmarks: &[Benchmark]) {
    println!("Available benchmarks:");
    for (i, benchmark) in benchmarks.iter().enumerate() {
        println!("{:>2}. {}", i + 1, benchmark.name);
    }
}

/// Runs the given benchmarks with every thread count and prints the results to the console.
///
/// If `--output` is specified, the results are also written to a CSV file per benchmark
/// in the specified directory.
pub fn run(benchmarks: &[Benchmark], args: &Args) -> std::io::Result<()> {
    for benchmark in benchmarks {
        println!("'{}'", benchmark.name);
        println!("| threads | avg time / step | min time / step |");
        println!("| ------- | --------------- | --------------- |");

        let mut csv = String::from("threads,avg_step_ms,min_step_ms\n");
        for threads in args.threads.clone() {
            let result = run_benchmark(
                benchmark,
                &BenchmarkOptions {
                    threads,
                    steps: args.steps,
                    repeat: args.repeat,
                },
            );
            let average = result.average_time.as_secs_f64() * 1000.0;
            let min = result.min_time.as_secs_f64() * 1000.0;
            println!("|      {threads:>2} | {average:>12.5} ms | {min:>12.5} ms |");
            csv.push_str(&format!("{threads},{average:.10},{min:.10}\n"));
        }

        if let Some(output_dir) = &args.output {
            std::fs::create_dir_all(output_dir)?;
            let path = format!(
                "{output_dir}/{}.csv",
                benchmark.name.to_lowercase().replace(' ', "_")
            );
            std::fs::write(&path, csv)?;
            info!(%path, "results written");
        }
    }
    Ok(())
}

fn run_benchmark(benchmark: &Benchmark, options: &BenchmarkOptions) -> BenchmarkResult {
    let mut average_time = Duration::ZERO;
    let mut average_min_time = Duration::ZERO;

    for repetition in 0..options.repeat {
        let mut space = (benchmark.constructor)();
        space.set_threads(options.threads as usize);
        debug!(
            benchmark = benchmark.name,
            repetition,
            bodies = space.body_count(),
            shapes = space.shape_count(),
            constraints = space.constraint_count(),
            "starting run"
        );

        // Run the initial step before starting measurements to avoid skewing the results.
        space.step(TIME_STEP).unwrap();

        let mut average_step_time = Duration::ZERO;
        let mut min_step_time = Duration::MAX;

        for _ in 0..options.steps {
            let start = Instant::now();
            space.step(TIME_STEP).unwrap();
            let step_time = start.elapsed();

            average_step_time += step_time;
            min_step_time = min_step_time.min(step_time);
        }

        average_time += average_step_time / options.steps;
        average_min_time += min_step_time;
    }

    BenchmarkResult {
        average_time: average_time / options.repeat,
        min_time: average_min_time / options.repeat,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_range;

    #[test]
    fn parses_thread_ranges() {
        assert_eq!(parse_range("4"), Ok(4..5));
        assert_eq!(parse_range("1..4"), Ok(1..4));
        assert_eq!(parse_range("1..=4"), Ok(1..5));
        assert!(parse_range("a..b").is_err());
    }
}
