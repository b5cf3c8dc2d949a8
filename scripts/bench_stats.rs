use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

const LINES: usize = 200_000;

/// Times the release `pretty_logfmt` binary over a generated log file.
///
/// Usage: `bench_stats [RUNS]` (default 10).
fn main() -> io::Result<()> {
    let num_runs = env::args()
        .nth(1)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10);

    let input = env::temp_dir().join("pretty_logfmt_bench.log");
    let input_bytes = generate_input(&input, LINES)?;
    println!(
        "Generated {} lines ({:.2} MB) at {}",
        LINES,
        input_bytes as f64 / (1024.0 * 1024.0),
        input.display()
    );

    let build = Command::new("cargo")
        .args(["build", "--release", "--bin", "pretty_logfmt"])
        .status()?;
    if !build.success() {
        return Err(io::Error::new(io::ErrorKind::Other, "release build failed"));
    }

    println!("Running benchmark {} times...", num_runs);
    let mut times_ms = Vec::with_capacity(num_runs);
    let mut throughputs = Vec::with_capacity(num_runs);

    for i in 1..=num_runs {
        print!("Run {}/{}... ", i, num_runs);
        io::stdout().flush()?;

        let start = Instant::now();
        let status = Command::new("target/release/pretty_logfmt")
            .arg("--force-color")
            .arg(&input)
            .stdout(Stdio::null())
            .status()?;
        let elapsed = start.elapsed();

        if !status.success() {
            eprintln!("pretty_logfmt failed on run {}", i);
            continue;
        }

        let ms = elapsed.as_secs_f64() * 1000.0;
        let lines_per_sec = LINES as f64 / elapsed.as_secs_f64();
        println!("{:.1} ms ({:.0} lines/s)", ms, lines_per_sec);
        times_ms.push(ms);
        throughputs.push(lines_per_sec);
    }

    println!("\n===== RENDER SUMMARY =====");
    if let Some(stats) = Stats::from_values(&times_ms) {
        println!("\nWall time (ms):");
        stats.print();
    }
    if let Some(stats) = Stats::from_values(&throughputs) {
        println!("\nThroughput (lines/s):");
        stats.print();
    }
    Ok(())
}

/// Writes `lines` encoded records cycling through levels and field shapes.
fn generate_input(path: &Path, lines: usize) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut written = 0u64;
    for i in 0..lines {
        let line = match i % 4 {
            0 => format!(
                "time=\"01/02 15:04:05.{:03}\" level=INFO msg=\"request handled\" method=GET path=/api/items/{} status=200\n",
                i % 1000,
                i
            ),
            1 => format!(
                "time=\"01/02 15:04:05.{:03}\" level=DEBUG source=db/pool.rs:{} msg=acquired conn={} wait_ms=0.{}\n",
                i % 1000,
                i % 300,
                i % 16,
                i % 10
            ),
            2 => format!(
                "time=\"01/02 15:04:05.{:03}\" level=WARN msg=\"slow query\\nplan follows\" err=\"deadline exceeded\" rows={}\n",
                i % 1000,
                i
            ),
            _ => format!(
                "time=\"01/02 15:04:05.{:03}\" level=ERROR msg=panic error=\"index out of range\" stacktrace=\"main.rs:1\\nworker.rs:{}\"\n",
                i % 1000,
                i % 500
            ),
        };
        out.write_all(line.as_bytes())?;
        written += line.len() as u64;
    }
    out.flush()?;
    Ok(written)
}

struct Stats {
    min: f64,
    max: f64,
    mean: f64,
    median: f64,
    std_dev: f64,
}

impl Stats {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            median,
            std_dev: variance.sqrt(),
        })
    }

    fn print(&self) {
        let pct = if self.mean != 0.0 { self.std_dev / self.mean * 100.0 } else { 0.0 };
        println!("  Min: {:.3}", self.min);
        println!("  Max: {:.3}", self.max);
        println!("  Mean: {:.3}", self.mean);
        println!("  Median: {:.3}", self.median);
        println!("  Std Dev: {:.3} ({:.2}% of mean)", self.std_dev, pct);
    }
}
