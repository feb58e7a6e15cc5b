//! The `pieces` command: list corpus pieces and their qualification status.

use anyhow::Result;
use colored::Colorize;

use cadenza_core::{DatasetProvider, WindowSpec};
use cadenza_midi::MidiDataset;

pub(crate) fn run(dataset_dir: &str, window: WindowSpec, subdivision: u16, json: bool) -> Result<()> {
    let dataset = MidiDataset::new(dataset_dir, subdivision);
    let need = window.required_ticks();

    let mut rows = Vec::new();
    for id in dataset.piece_ids() {
        let row = match dataset.load_tensor(&id) {
            Ok(tensor) => (id, Some(tensor.len()), tensor.len() >= need),
            Err(_) => (id, None, false),
        };
        rows.push(row);
    }

    if json {
        let entries: Vec<serde_json::Value> = rows
            .iter()
            .map(|(id, ticks, qualifies)| {
                serde_json::json!({
                    "id": id,
                    "ticks": ticks,
                    "qualifies": qualifies,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (id, ticks, qualifies) in &rows {
        let status = if *qualifies {
            "qualifies".green()
        } else {
            "too short".yellow()
        };
        match ticks {
            Some(ticks) => println!("{id}: {ticks} ticks ({status})"),
            None => println!("{id}: {}", "unreadable".red()),
        }
    }
    println!(
        "\n{} of {} piece(s) qualify for a {}-tick window",
        rows.iter().filter(|(_, _, q)| *q).count(),
        rows.len(),
        need
    );
    Ok(())
}
