use std::fs;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};
use human_repr::HumanCount;
use tracing::info;

use crackalack_core::{CompressedTable, RainbowTable, SimpleTable, TableFormat, TableName};

use crate::{create_dir_to_store_tables, get_table_paths_from_dir, Compress};

pub fn compress(args: Compress) -> Result<()> {
    create_dir_to_store_tables(&args.out_dir)?;

    let table_paths = get_table_paths_from_dir(&args.in_dir, TableFormat::Raw)?;

    let mut display_table = Table::new();
    display_table.load_preset(UTF8_BORDERS_ONLY);
    display_table.set_header(vec!["Table", "Chains", "Before", "After"]);

    for (table_path, table_name) in table_paths {
        let table = SimpleTable::load(&table_path, &table_name)
            .with_context(|| format!("Unable to load {}", table_path.display()))?;
        table.check_sorted(&table_path)?;

        // compressed tables take their chain count from their name
        let out_name = TableName {
            chain_count: table.len() as u64,
            ..table_name.with_format(TableFormat::Compressed)
        };
        let out_path = args.out_dir.join(out_name.to_string());

        CompressedTable::from_rainbow_table(&table).store(&out_path)?;
        info!(table = %out_path.display(), chains = table.len(), "compressed table");

        display_table.add_row(vec![
            out_name.to_string(),
            table.len().human_count_bare().to_string(),
            fs::metadata(&table_path)?.len().human_count_bytes().to_string(),
            fs::metadata(&out_path)?.len().human_count_bytes().to_string(),
        ]);
    }

    println!("{display_table}");

    Ok(())
}
