use std::path::PathBuf;

use anyhow::{bail, Result};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Cell, Color, Table};
use human_repr::HumanCount;
use tracing::warn;

use crackalack_core::{
    find_tables, open_table, verify::verify_table, CrackalackResult, TableHandle, TableName,
};

use crate::Verify;

/// Expands the directories among the given paths into the tables they contain.
fn collect_tables(paths: &[PathBuf]) -> CrackalackResult<Vec<(PathBuf, TableName)>> {
    let mut tables = Vec::new();

    for path in paths {
        if path.is_dir() {
            tables.extend(find_tables(path)?);
        } else {
            tables.push((path.clone(), TableName::from_path(path)?));
        }
    }

    Ok(tables)
}

pub fn verify(args: Verify) -> Result<()> {
    let tables = collect_tables(&args.paths)?;
    let mut rng = rand::thread_rng();
    let mut failures = 0;

    let mut display_table = Table::new();
    display_table.load_preset(UTF8_BORDERS_ONLY);
    display_table.set_header(vec!["Table", "Chains", "Sampled", "Result"]);

    for (path, table_name) in &tables {
        let verification = open_table(path, table_name).and_then(|table| match &table {
            TableHandle::Simple(table) => verify_table(table, path, args.chains, &mut rng),
            TableHandle::Compressed(table) => verify_table(table, path, args.chains, &mut rng),
        });

        let row = match verification {
            Ok(verification) if verification.is_valid() => vec![
                Cell::new(path.display()),
                Cell::new(verification.chains.human_count_bare()),
                Cell::new(verification.sampled),
                Cell::new("Valid").fg(Color::Green),
            ],
            Ok(verification) => {
                failures += 1;
                for broken in &verification.broken {
                    warn!(
                        table = %path.display(),
                        index = broken.index,
                        start = broken.chain.startpoint,
                        end = broken.chain.endpoint,
                        computed_end = broken.computed_endpoint,
                        "broken chain"
                    );
                }

                vec![
                    Cell::new(path.display()),
                    Cell::new(verification.chains.human_count_bare()),
                    Cell::new(verification.sampled),
                    Cell::new(format!("{} broken chains", verification.broken.len()))
                        .fg(Color::Red),
                ]
            }
            Err(err) => {
                failures += 1;
                vec![
                    Cell::new(path.display()),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(err).fg(Color::Red),
                ]
            }
        };

        display_table.add_row(row);
    }

    println!("{display_table}");

    if failures > 0 {
        bail!("{failures} of {} tables failed the verification", tables.len());
    }

    Ok(())
}
