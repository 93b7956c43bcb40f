use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use cognitivetwin::logging::init_tracing;
use cognitivetwin::progress::{ProgressAggregator, ProgressError};
use cognitivetwin::students::{Student, StudentManager};
use rayon::prelude::*;
use tracing::{error, info};
use uuid::Uuid;

fn main() -> Result<()> {
    let args = CliArgs::parse()?;
    let manager = match &args.root {
        Some(root) => StudentManager::with_root(root)?,
        None => StudentManager::new()?,
    };
    let _log_guard = init_tracing(&manager.config.logging, &manager.paths);

    let students: Vec<Student> = match args.student {
        Some(id) => vec![manager
            .get_student(&id)?
            .ok_or_else(|| anyhow!("No student with id {id}"))?],
        None => manager.list_students()?,
    };
    if students.is_empty() {
        println!("No students found under {}", manager.paths.root.display());
        return Ok(());
    }

    let reports: Vec<(String, Result<String, ProgressError>)> = students
        .par_iter()
        .map(|student| {
            (
                student.name.clone(),
                recompute_student(student, args.migrate_legacy),
            )
        })
        .collect();

    let mut failures = 0;
    for (name, report) in reports {
        match report {
            Ok(line) => println!("{name}: {line}"),
            Err(err) => {
                failures += 1;
                error!(student = %name, error = %err, "recompute failed");
                println!("{name}: FAILED ({err})");
            }
        }
    }
    info!(students = students.len(), failures, "progress recompute finished");
    if failures > 0 {
        return Err(anyhow!("{failures} student(s) could not be recomputed"));
    }
    Ok(())
}

fn recompute_student(student: &Student, migrate_legacy: bool) -> Result<String, ProgressError> {
    let aggregator = ProgressAggregator::new(student);
    let mut notes = Vec::new();
    if migrate_legacy {
        if let Some(report) = aggregator.migrate_legacy()? {
            notes.push(format!(
                "migrated legacy weak topics (discarded {})",
                report.discarded_legacy_topics.len()
            ));
        }
    }
    let record = aggregator.recompute()?;
    notes.push(format!(
        "{} topics, {} completed, average {:.1}, {} weak",
        record.total_topics,
        record.completed_topics,
        record.average_score,
        record.weak_topics.len()
    ));
    Ok(notes.join("; "))
}

struct CliArgs {
    root: Option<PathBuf>,
    student: Option<Uuid>,
    migrate_legacy: bool,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut root = None;
        let mut student = None;
        let mut migrate_legacy = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--root" => {
                    let value = args.next().context("Expected a directory after --root")?;
                    root = Some(PathBuf::from(value));
                }
                "--student" => {
                    let value = args.next().context("Expected a student id after --student")?;
                    student = Some(
                        Uuid::parse_str(&value)
                            .with_context(|| format!("Invalid student id '{value}'"))?,
                    );
                }
                "--migrate-legacy" => migrate_legacy = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument '{other}'. Run with --help for usage instructions."
                    ));
                }
            }
        }
        Ok(Self {
            root,
            student,
            migrate_legacy,
        })
    }
}

fn print_usage() {
    println!("Cognitive Twin progress recompute");
    println!("Rebuilds each student's progress record from stored attempts.");
    println!();
    println!("Usage: cargo run --bin recompute_progress -- [options]");
    println!("  --root <dir>         Workspace root (default: COGNITIVETWIN_HOME or OS data dir)");
    println!("  --student <uuid>     Only recompute this student");
    println!("  --migrate-legacy     Convert legacy weak-topic lists before recomputing");
}
