use anyhow::{bail, Context, Result};
use log::info;
use std::env;
use std::path::Path;

// Use library instead of local modules
use ehr_utils::{parse_data, sick_report, summarize, Clock, FixedClock, PatientRegistry, SystemClock};

const USAGE: &str = "\
Usage:
  ehr-utils summary <patients.tsv> <labs.tsv> [--json]
  ehr-utils sick <patients.tsv> <labs.tsv> <lab-name> <'>'|'<'> <threshold> [--json]

Environment:
  RUST_LOG             log filter (default: info)
  EHR_REFERENCE_DATE   fixed \"now\" for ages, YYYY-MM-DD HH:MM:SS.ffffff";

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let json = take_flag(&mut args, "--json");

    match args.first().map(String::as_str) {
        Some("summary") if args.len() == 3 => run_summary(&args[1], &args[2], json),
        Some("sick") if args.len() == 6 => {
            let threshold: f64 = args[5]
                .parse()
                .with_context(|| format!("Invalid threshold: {}", args[5]))?;
            run_sick(&args[1], &args[2], &args[3], &args[4], threshold, json)
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

fn load(patients: &str, labs: &str) -> Result<PatientRegistry> {
    info!("Ingesting {} + {}", patients, labs);
    let registry = parse_data(Path::new(patients), Path::new(labs))
        .with_context(|| format!("Failed to ingest {} and {}", patients, labs))?;
    Ok(registry)
}

/// Reference clock: EHR_REFERENCE_DATE if set, otherwise the local clock
fn reference_clock() -> Result<Box<dyn Clock>> {
    match env::var("EHR_REFERENCE_DATE") {
        Ok(raw) => {
            let clock = FixedClock::parse(&raw).context("Invalid EHR_REFERENCE_DATE")?;
            info!("Ages computed as of {}", raw);
            Ok(Box::new(clock))
        }
        Err(env::VarError::NotPresent) => Ok(Box::new(SystemClock)),
        Err(e) => bail!("Invalid EHR_REFERENCE_DATE: {}", e),
    }
}

fn run_summary(patients: &str, labs: &str, json: bool) -> Result<()> {
    let registry = load(patients, labs)?;
    let clock = reference_clock()?;
    let summaries = summarize(&registry, clock.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for summary in &summaries {
        match summary.age_at_first_lab {
            Some(age) => println!("{} | {} labs, first at age {}", summary, summary.lab_count, age),
            None => println!("{} | no labs", summary),
        }
    }
    println!("{} patients", summaries.len());

    Ok(())
}

fn run_sick(patients: &str, labs: &str, lab_name: &str, operator: &str, threshold: f64, json: bool) -> Result<()> {
    let registry = load(patients, labs)?;
    let report = sick_report(&registry, lab_name, operator, threshold)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for id in &report.patient_ids {
        println!("{}", id);
    }
    println!("{}", report.summary());

    Ok(())
}
