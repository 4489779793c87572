use std::{process::ExitCode, time::Duration};

use anyhow::{ensure, Context, Result};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Cell, Color, Table};
use human_repr::{HumanCount, HumanDuration};

use crackalack_core::{target::read_hashes, LookupConfigBuilder, LookupReport};

use crate::Lookup;

/// The exit code when some hashes are still not cracked.
const EXIT_OUTSTANDING: u8 = 2;

pub fn lookup(args: Lookup) -> Result<ExitCode> {
    let hashes = read_hashes(&args.hashes).context("Unable to read the hashes to crack")?;
    ensure!(!hashes.is_empty(), "No hash to crack");

    let mut config = LookupConfigBuilder::new()
        .table_dir(&args.dir)
        .precalc_dir(&args.precalc_dir);
    if let Some(pot) = &args.pot {
        config = config.pot(pot);
    }

    let mut lookup = crackalack_core::Lookup::new(config.build()?)?;
    let report = lookup.run(&hashes)?;

    print_report(&report);

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_OUTSTANDING)
    })
}

fn human_time(duration: Duration) -> String {
    duration.as_secs_f64().human_duration().to_string()
}

fn print_report(report: &LookupReport) {
    let cracked = report.previously_cracked.len() + report.cracked.len();
    let percentage = match report.loaded {
        0 => 0.,
        loaded => cracked as f64 * 100. / loaded as f64,
    };

    println!(
        "Cracked {cracked} of {} hashes ({percentage:.1}%)",
        report.loaded
    );

    let mut results = Table::new();
    results.load_preset(UTF8_BORDERS_ONLY);
    results.set_header(vec!["Hash", "Plaintext"]);

    for (hash, plaintext) in &report.previously_cracked {
        results.add_row(vec![
            Cell::new(hash),
            Cell::new(String::from_utf8_lossy(plaintext)).fg(Color::Grey),
        ]);
    }

    for (hash, plaintext) in &report.cracked {
        results.add_row(vec![
            Cell::new(hash),
            Cell::new(String::from_utf8_lossy(plaintext)).fg(Color::Green),
        ]);
    }

    for hash in &report.outstanding {
        results.add_row(vec![
            Cell::new(hash),
            Cell::new("No plaintext found").fg(Color::Red),
        ]);
    }

    println!("{results}");

    let mut times = Table::new();
    times.load_preset(UTF8_BORDERS_ONLY);
    times.set_header(vec!["Step", "Time"]);
    times.add_row(vec![
        "Precomputation".to_owned(),
        human_time(report.time_precomputing),
    ]);
    times.add_row(vec!["Table I/O".to_owned(), human_time(report.time_io)]);
    times.add_row(vec!["Search".to_owned(), human_time(report.time_searching)]);
    times.add_row(vec![
        "False alarm checks".to_owned(),
        human_time(report.time_false_alarms),
    ]);
    times.add_row(vec!["Total".to_owned(), human_time(report.total_time())]);

    println!("{times}");

    let mut statistics = Table::new();
    statistics.load_preset(UTF8_BORDERS_ONLY);
    statistics.set_header(vec!["Statistic", "Count"]);

    for (name, count) in [
        ("Tables processed", report.tables_processed as u64),
        ("Tables skipped", report.tables_skipped as u64),
        ("Chains processed", report.chains_processed),
        ("Alarms checked", report.alarms_checked),
        ("False alarms", report.false_alarms),
        ("Indices computed", report.indices_computed),
        ("Indices loaded", report.indices_loaded),
    ] {
        statistics.add_row(vec![name.to_owned(), count.human_count_bare().to_string()]);
    }

    println!("{statistics}");
}
