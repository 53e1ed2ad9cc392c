use polars::prelude::*;
use port_core::chunking::split_dataframe;
use port_core::error::PortError;

fn sample_df(rows: usize) -> DataFrame {
    let ids: Vec<i64> = (0..rows as i64).collect();
    let labels: Vec<String> = (0..rows).map(|idx| format!("row {idx}")).collect();
    df![
        "id" => ids,
        "label" => labels,
    ]
    .expect("df")
}

#[test]
fn chunks_concatenate_back_to_the_input() {
    let df = sample_df(25);
    let chunks = split_dataframe(&df, 10).expect("split");

    let heights: Vec<usize> = chunks.iter().map(DataFrame::height).collect();
    assert_eq!(heights, vec![10, 10, 5]);

    let mut rebuilt = chunks[0].clone();
    for chunk in &chunks[1..] {
        rebuilt.vstack_mut(chunk).expect("vstack");
    }
    assert!(rebuilt.equals(&df));
}

#[test]
fn exact_multiple_has_no_trailing_chunk() {
    let chunks = split_dataframe(&sample_df(20), 10).expect("split");
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|chunk| chunk.height() == 10));
}

#[test]
fn small_frame_is_a_single_chunk() {
    let df = sample_df(3);
    let chunks = split_dataframe(&df, 10).expect("split");
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].equals(&df));
}

#[test]
fn empty_frame_yields_no_chunks() {
    let chunks = split_dataframe(&sample_df(0), 10).expect("split");
    assert!(chunks.is_empty());
}

#[test]
fn zero_rows_per_chunk_is_rejected() {
    let err = split_dataframe(&sample_df(5), 0).expect_err("zero chunk size");
    assert!(matches!(err, PortError::InvalidChunkSize(0)));
}
