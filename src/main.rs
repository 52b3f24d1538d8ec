use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use breva::{AggregateNodeIterator, KmerSupportNode, LinearGenomicCoordinate};

#[derive(Parser, Debug)]
#[command(name = "breva", about = "Streaming k-mer evidence aggregation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate start-sorted support records into consensus intervals.
    Aggregate {
        /// Tab-separated support records: kmer, start, end, weight, [ref].
        /// With `--dict`, start and end are `contig:position` pairs.
        evidence: PathBuf,
        /// Contig dictionary (`name\tlength` per line) used to map
        /// per-contig positions onto the linear axis.
        #[arg(long)]
        dict: Option<PathBuf>,
        /// Unmapped positions reserved before each contig on the linear axis.
        #[arg(long, default_value_t = 0)]
        padding: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Aggregate {
            evidence,
            dict,
            padding,
        } => run_aggregate(evidence, dict, padding),
    }
}

fn run_aggregate(evidence: PathBuf, dict: Option<PathBuf>, padding: i64) -> Result<()> {
    let coords = dict
        .map(|path| load_dictionary(&path, padding))
        .transpose()?;
    let records = load_evidence(&evidence, coords.as_ref())?;

    for aggregate in AggregateNodeIterator::new(records.into_iter()) {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            aggregate.kmer,
            aggregate.start,
            aggregate.end,
            aggregate.weight,
            u8::from(aggregate.contains_reference)
        );
    }
    Ok(())
}

fn load_dictionary(path: &PathBuf, padding: i64) -> Result<LinearGenomicCoordinate> {
    let file = File::open(path)
        .with_context(|| format!("opening contig dictionary {}", path.display()))?;
    let mut contigs = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let name = fields
            .next()
            .ok_or_else(|| anyhow::anyhow!("missing contig name on line {}", line_no + 1))?
            .to_string();
        let length: i64 = fields
            .next()
            .ok_or_else(|| anyhow::anyhow!("missing contig length on line {}", line_no + 1))?
            .trim()
            .parse()
            .with_context(|| format!("parsing contig length on line {}", line_no + 1))?;
        contigs.push((name, length));
    }
    LinearGenomicCoordinate::with_padding(contigs, padding)
        .context("building linear coordinate mapping")
}

fn load_evidence(
    path: &PathBuf,
    coords: Option<&LinearGenomicCoordinate>,
) -> Result<Vec<KmerSupportNode>> {
    let file =
        File::open(path).with_context(|| format!("opening evidence file {}", path.display()))?;
    let mut records = Vec::new();
    let mut previous_start = i64::MIN;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let record = parse_record(&line, coords)
            .with_context(|| format!("parsing evidence on line {}", line_no + 1))?;
        if record.start < previous_start {
            bail!(
                "evidence is not sorted by start: line {} starts at {} after {}",
                line_no + 1,
                record.start,
                previous_start
            );
        }
        previous_start = record.start;
        records.push(record);
    }
    Ok(records)
}

fn parse_record(line: &str, coords: Option<&LinearGenomicCoordinate>) -> Result<KmerSupportNode> {
    let mut fields = line.split('\t');
    let kmer: u64 = fields
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing kmer field"))?
        .trim()
        .parse()
        .context("parsing kmer")?;
    let start = parse_position(
        fields.next().ok_or_else(|| anyhow::anyhow!("missing start field"))?,
        coords,
    )?;
    let end = parse_position(
        fields.next().ok_or_else(|| anyhow::anyhow!("missing end field"))?,
        coords,
    )?;
    let weight: i32 = fields
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing weight field"))?
        .trim()
        .parse()
        .context("parsing weight")?;
    let is_reference = matches!(fields.next().map(str::trim), Some("1" | "ref" | "true"));
    if start > end {
        bail!("inverted interval [{start}, {end}]");
    }
    Ok(KmerSupportNode::new(kmer, start, end, weight, is_reference))
}

fn parse_position(field: &str, coords: Option<&LinearGenomicCoordinate>) -> Result<i64> {
    let field = field.trim();
    match coords {
        Some(coords) => {
            let (contig, position) = field
                .rsplit_once(':')
                .ok_or_else(|| anyhow::anyhow!("expected contig:position, got {field}"))?;
            let position: i64 = position.parse().context("parsing position")?;
            Ok(coords.linear_by_name(contig, position)?)
        }
        None => field.parse().context("parsing linear position"),
    }
}
