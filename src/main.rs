use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;

use pretty_logfmt::{check_is_terminal, ConsoleWriter, Result};

/// Pretty-prints logfmt records read from a file or stdin.
#[derive(Parser, Debug)]
#[command(name = "pretty_logfmt", version)]
struct Args {
    /// Never emit ANSI colors
    #[arg(long, conflicts_with = "force_color")]
    no_color: bool,

    /// Emit ANSI colors even when stdout is not a terminal
    #[arg(long)]
    force_color: bool,

    /// Input file, stdin when omitted
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let input: Box<dyn BufRead> = match &args.file {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let color = args.force_color || (!args.no_color && check_is_terminal(&io::stdout()));

    match pipe(input, color) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        res => Ok(res?),
    }
}

fn pipe(mut input: Box<dyn BufRead>, color: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut writer = ConsoleWriter::new(BufWriter::new(stdout.lock()), color);
    let mut line = Vec::with_capacity(1024);
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.write_all(&line)?;
    }
    writer.flush()
}
