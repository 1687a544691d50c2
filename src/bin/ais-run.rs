//! CLI tool to filter, annotate and sort AIS csv files.
//!
//! Usage:
//!   ais-run headers <input.csv>
//!   ais-run subset <input.csv> --min-lat 47 --max-lat 48 --min-lon -123 --max-lon -122 [-o out.csv]
//!   ais-run geohash <input.csv> [-o out.csv]
//!   ais-run sort <input.csv> [--column BaseDateTime] [-o out.csv]
//!   ais-run vessels <input.csv>
//!
//! Without `-o`, records are written to stdout.

use ais_stream::{
    BASE_DATE_TIME, BoundingBox, Geohasher, RecordStream, ScanMode, Selection, StreamError,
};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

/// Filter, annotate and sort delimited AIS vessel-tracking files.
#[derive(Parser)]
#[command(name = "ais-run")]
struct Cli {
    /// Log progress to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the column index table
    Headers {
        /// Input csv file
        input: String,
    },
    /// Keep records inside a latitude/longitude box
    Subset {
        /// Input csv file
        input: String,

        #[command(flatten)]
        columns: PositionColumns,

        #[arg(long, allow_negative_numbers = true)]
        min_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        min_lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lon: f64,

        /// Stop after this many matches
        #[arg(long)]
        limit: Option<usize>,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Append a 22-bit geohash column
    Geohash {
        /// Input csv file
        input: String,

        #[command(flatten)]
        columns: PositionColumns,

        /// Name of the new column
        #[arg(long, default_value = "Geohash")]
        column: String,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Sort records by a timestamp column
    Sort {
        /// Input csv file
        input: String,

        /// Timestamp column (YYYY-MM-DDTHH:MM:SS)
        #[arg(long, default_value = BASE_DATE_TIME)]
        column: String,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Count records per vessel
    Vessels {
        /// Input csv file
        input: String,
    },
}

#[derive(Args)]
struct PositionColumns {
    /// Latitude column
    #[arg(long, default_value = "LAT")]
    lat: String,

    /// Longitude column
    #[arg(long, default_value = "LON")]
    lon: String,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), StreamError> {
    match command {
        Command::Headers { input } => {
            let rs = RecordStream::open(&input)?;
            print!("{}", rs.headers());
        }
        Command::Subset {
            input,
            columns,
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            limit,
            output,
        } => {
            let mut rs = RecordStream::open(&input)?;
            let area = BoundingBox::for_columns(
                rs.headers(),
                &columns.lat,
                &columns.lon,
                (min_lat, max_lat),
                (min_lon, max_lon),
            )
            .ok_or_else(|| missing_position(&rs, &columns))?;

            let mut subset = match rs.subset_limit(&area, limit, ScanMode::Forward)? {
                Selection::Matched(stream) => stream,
                Selection::Empty(stream) => {
                    eprintln!("No records in '{input}' fall inside the box");
                    stream
                }
            };
            emit(&mut subset, output.as_deref())?;
        }
        Command::Geohash {
            input,
            columns,
            column,
            output,
        } => {
            let mut rs = RecordStream::open(&input)?;
            let mut hashed =
                rs.append_field(&column, &[columns.lat.as_str(), columns.lon.as_str()], &Geohasher)?;
            emit(&mut hashed, output.as_deref())?;
        }
        Command::Sort {
            input,
            column,
            output,
        } => {
            let mut rs = RecordStream::open(&input)?;
            let mut sorted = rs.sort_by_timestamp(&column)?;
            emit(&mut sorted, output.as_deref())?;
        }
        Command::Vessels { input } => {
            let mut rs = RecordStream::open(&input)?;
            let mut vessels: Vec<_> = rs.unique_vessels()?.into_iter().collect();
            vessels.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

            let mut out = io::stdout().lock();
            writeln!(out, "MMSI\tVesselName\tRecords")?;
            for (vessel, count) in vessels {
                writeln!(out, "{}\t{}\t{count}", vessel.mmsi, vessel.vessel_name)?;
            }
        }
    }
    Ok(())
}

fn missing_position(rs: &RecordStream, columns: &PositionColumns) -> StreamError {
    let missing = if rs.headers().index_of(&columns.lat).is_none() {
        &columns.lat
    } else {
        &columns.lon
    };
    StreamError::MissingColumn(missing.clone())
}

/// Write the header row and remaining records to `output`, or stdout.
fn emit(stream: &mut RecordStream, output: Option<&str>) -> Result<(), StreamError> {
    if let Some(out_path) = output {
        if let Some(parent) = Path::new(out_path).parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let written = stream.save(out_path)?;
        eprintln!("Wrote {written} records to {out_path}");
        return Ok(());
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(stream.config().delimiter)
        .from_writer(io::stdout().lock());
    writer
        .write_record(stream.headers().fields())
        .map_err(StreamError::Encode)?;
    while let Some(record) = stream.read()? {
        writer
            .write_record(record.fields())
            .map_err(StreamError::Encode)?;
    }
    writer.flush()?;
    Ok(())
}
