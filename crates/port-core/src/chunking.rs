use polars::prelude::DataFrame;

use crate::error::{PortError, Result};

/// Splits a DataFrame into consecutive chunks of at most `row_count` rows.
///
/// The host cannot hold very large tables in memory, so oversized tables are
/// handed over as several smaller ones. Concatenating the chunks in order gives
/// back the original rows; an empty frame yields no chunks.
pub fn split_dataframe(df: &DataFrame, row_count: usize) -> Result<Vec<DataFrame>> {
    if row_count == 0 {
        return Err(PortError::InvalidChunkSize(row_count));
    }

    let height = df.height();
    let num_splits = height.div_ceil(row_count);

    let chunks = (0..num_splits)
        .map(|i| {
            let offset = i * row_count;
            let length = row_count.min(height - offset);
            df.slice(offset as i64, length)
        })
        .collect();

    Ok(chunks)
}
