use anyhow::{Context, Result};
use tracing::info;

use crackalack_core::{CompressedTable, RainbowTable, SimpleTable, TableFormat};

use crate::{create_dir_to_store_tables, get_table_paths_from_dir, Decompress};

pub fn decompress(args: Decompress) -> Result<()> {
    create_dir_to_store_tables(&args.out_dir)?;

    let table_paths = get_table_paths_from_dir(&args.in_dir, TableFormat::Compressed)?;

    for (table_path, table_name) in table_paths {
        let compressed_table = CompressedTable::load(&table_path, &table_name)
            .with_context(|| format!("Unable to load {}", table_path.display()))?;
        let out_path = args
            .out_dir
            .join(table_name.with_format(TableFormat::Raw).to_string());

        SimpleTable::from_rainbow_table(&compressed_table).store(&out_path)?;
        info!(
            table = %out_path.display(),
            chains = compressed_table.len(),
            "decompressed table"
        );
    }

    Ok(())
}
