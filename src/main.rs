use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use clap::{Args, Parser, Subcommand};
use log::info;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use zstd::{Decoder, Encoder};

use markov_guesser::{
    COMPRESSION_LEVEL, Cursor, Guess, Level, Model, Session,
    errors::{Error, Result},
    serialize::{OutputFormat, level_histogram, load_cursor, save_cursor, stream_write_guesses},
    stats::build_model,
};

/// Command-line interface structure
#[derive(Parser, Debug)]
#[command(about = "Ranked password guesses from Markov statistics, one level band at a time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the Markov statistics come from
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct StatsSource {
    /// Rules directory holding `Markov/markov_stats.txt`
    #[arg(short, long, help = "Rules directory containing Markov/markov_stats.txt")]
    rules: Option<PathBuf>,

    /// Statistics file given directly
    #[arg(short, long, help = "Path to a Markov statistics file")]
    stats: Option<PathBuf>,
}

impl StatsSource {
    fn load(&self) -> Result<Model> {
        match (&self.rules, &self.stats) {
            (Some(rules), _) => build_model(rules),
            (None, Some(stats)) => Model::from_file(stats),
            (None, None) => Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no statistics source given",
            ))),
        }
    }
}

/// Output options shared by the enumerating subcommands
#[derive(Args, Debug)]
struct OutputArgs {
    /// Optional output file (zstd compressed)
    #[arg(short, long, help = "Output file path (zstd compressed format)")]
    output: Option<PathBuf>,

    /// Write `{"guess":..,"level":..}` objects instead of bare guesses
    #[arg(long, help = "Write one JSON object per guess")]
    json: bool,
}

impl OutputArgs {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Plain
        }
    }

    fn writer(&self) -> Result<Box<dyn Write>> {
        let writer: Box<dyn Write> = match &self.output {
            Some(file_path) => {
                info!("Output file: {}", file_path.display());
                Box::new(Encoder::new(File::create(file_path)?, COMPRESSION_LEVEL)?.auto_finish())
            }
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        Ok(writer)
    }
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Enumerate the guesses of one level band.
    ///
    /// Guesses are produced in a fixed order. With `--limit` and `--save`,
    /// the run stops after the given number of guesses and stores its cursor;
    /// a later run with `--resume` continues exactly where it stopped.
    ///
    /// Example:
    /// ```
    /// guess --rules rules/Default --min 0 --max 40 --max-length 8 --limit 1000 --save cursor.json
    /// guess --rules rules/Default --resume cursor.json --limit 1000 --save cursor.json
    /// ```
    Guess {
        #[command(flatten)]
        source: StatsSource,

        /// Lowest level produced (inclusive)
        #[arg(long, required_unless_present = "resume", help = "Minimum level, inclusive")]
        min: Option<Level>,

        /// Highest level produced (inclusive)
        #[arg(long, required_unless_present = "resume", help = "Maximum level, inclusive")]
        max: Option<Level>,

        /// Longest guess produced
        #[arg(short = 'l', long, conflicts_with = "resume", help = "Maximum guess length")]
        max_length: Option<usize>,

        /// Stop after this many guesses
        #[arg(short = 'n', long, help = "Number of guesses to produce at most")]
        limit: Option<usize>,

        /// Cursor file to continue from
        #[arg(long, conflicts_with_all = ["min", "max"], help = "Resume from a saved cursor")]
        resume: Option<PathBuf>,

        /// Cursor file written when the run stops
        #[arg(long, help = "Save the cursor when the run stops")]
        save: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Enumerate several level bands in parallel over one model.
    ///
    /// Bands are written one after the other, in the order given.
    ///
    /// Example:
    /// ```
    /// bands --rules rules/Default --band 0:20 --band 21:30 --max-length 8
    /// ```
    Bands {
        #[command(flatten)]
        source: StatsSource,

        /// Level band `MIN:MAX`, both inclusive
        #[arg(short, long = "band", value_parser = parse_band, required = true, help = "Level band MIN:MAX (repeatable)")]
        bands: Vec<(Level, Level)>,

        /// Longest guess produced
        #[arg(short = 'l', long, help = "Maximum guess length")]
        max_length: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print an overview of the statistics as JSON.
    Summary {
        #[command(flatten)]
        source: StatsSource,
    },
    /// Count the guesses of a `--json --output` file by level.
    ///
    /// Example:
    /// ```
    /// guess --rules rules/Default --min 0 --max 40 -l 8 --json --output guesses.zst
    /// histogram guesses.zst
    /// ```
    Histogram {
        /// zstd-compressed JSON-lines guess file
        #[arg(help = "Guess file written with --json --output")]
        input: PathBuf,
    },
}

fn parse_band(s: &str) -> std::result::Result<(Level, Level), String> {
    let (min, max) = s
        .split_once(':')
        .ok_or_else(|| format!("band '{}' is not of the form MIN:MAX", s))?;
    let min = min
        .trim()
        .parse()
        .map_err(|e| format!("invalid band minimum '{}': {}", min, e))?;
    let max = max
        .trim()
        .parse()
        .map_err(|e| format!("invalid band maximum '{}': {}", max, e))?;
    Ok((min, max))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::init();

    match cli.command {
        Commands::Guess {
            source,
            min,
            max,
            max_length,
            limit,
            resume,
            save,
            output,
        } => {
            let model = source.load()?;

            let cursor = match resume {
                Some(cursor_file) => {
                    info!("Resuming from cursor file: {}", cursor_file.display());
                    load_cursor(File::open(&cursor_file)?)?
                }
                None => {
                    let (min, max) = min
                        .zip(max)
                        .ok_or_else(|| Error::invalid_range("--min and --max are required"))?;
                    Cursor::with_limits(&model, min, max, max_length)?
                }
            };
            info!(
                "Band: [{}, {}], max length: {:?}",
                cursor.min_level(),
                cursor.max_level(),
                cursor.max_length()
            );

            let mut session = Session::from_cursor(&model, cursor)?;
            let mut writer = output.writer()?;
            let written = stream_write_guesses(
                session.by_ref().take(limit.unwrap_or(usize::MAX)),
                &mut writer,
                output.format(),
            )?;
            info!("Guesses written: {}", written);
            if session.cursor().is_exhausted() {
                info!("Band exhausted");
            }

            if let Some(cursor_file) = save {
                info!("Saving cursor to {}", cursor_file.display());
                save_cursor(session.cursor(), File::create(&cursor_file)?)?;
            }
        }
        Commands::Bands {
            source,
            bands,
            max_length,
            output,
        } => {
            let model = source.load()?;

            let results: Vec<Vec<Guess>> = bands
                .par_iter()
                .map(|&(min, max)| -> Result<Vec<Guess>> {
                    let cursor = Cursor::with_limits(&model, min, max, max_length)?;
                    Ok(Session::from_cursor(&model, cursor)?.collect())
                })
                .collect::<Result<Vec<_>>>()?;

            let mut writer = output.writer()?;
            for ((min, max), guesses) in bands.iter().zip(results) {
                info!("Band [{}, {}]: {} guesses", min, max, guesses.len());
                stream_write_guesses(guesses, &mut writer, output.format())?;
            }
        }
        Commands::Summary { source } => {
            let model = source.load()?;
            let json = serde_json::to_string_pretty(&model.summary())
                .map_err(|e| Error::Io(io::Error::other(e)))?;
            println!("{}", json);
        }
        Commands::Histogram { input } => {
            info!("Reading guesses from {}", input.display());
            let histogram = level_histogram(Decoder::new(File::open(&input)?)?)?;
            info!("Guesses read: {}", histogram.values().sum::<usize>());
            let json = serde_json::to_string_pretty(&histogram)
                .map_err(|e| Error::Io(io::Error::other(e)))?;
            println!("{}", json);
        }
    }
    Ok(())
}
