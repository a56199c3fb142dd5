//! Line of descent of a single agent.

use crate::genealogy::{AgentId, Genealogy};
use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// One ancestor on a line of descent.
#[derive(Debug, Clone, PartialEq)]
pub struct LodRecord {
    pub generation: usize,
    pub fitness: f64,
    pub probability: f64,
}

/// Ancestors of `id`, oldest first, ending with `id` itself.
///
/// The founder at the root of the chain is left out.
pub fn lineage(genealogy: &Genealogy, id: AgentId) -> Result<Vec<AgentId>> {
    let mut ids = Vec::new();
    let mut next = Some(id);
    while let Some(id) = next {
        next = genealogy.parent(id)?;
        if next.is_some() {
            ids.push(id);
        }
    }
    ids.reverse();
    Ok(ids)
}

/// Build the line of descent records of `id`.
pub fn extract_lod(genealogy: &Genealogy, id: AgentId) -> Result<Vec<LodRecord>> {
    lineage(genealogy, id)?
        .into_iter()
        .map(|id| {
            let agt = genealogy.agent(id)?;
            Ok(LodRecord {
                generation: agt.born(),
                fitness: agt.fitness(),
                probability: agt.prob(),
            })
        })
        .collect()
}

/// Write records as `generation,fitness,probability` lines after a header.
pub fn write_lod<W: Write>(writer: &mut W, records: &[LodRecord]) -> Result<()> {
    writeln!(writer, "generation,fitness,probability")?;
    for rec in records {
        writeln!(
            writer,
            "{},{:.6},{:.6}",
            rec.generation, rec.fitness, rec.probability
        )?;
    }
    Ok(())
}

/// Save records to a new file.
pub fn save_lod<P: AsRef<Path>>(file: P, records: &[LodRecord]) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);

    write_lod(&mut writer, records).context("failed to write records")?;

    writer.flush().context("failed to flush writer stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Agent;

    #[test]
    fn lineage_is_oldest_first_without_root() {
        let mut tree = Genealogy::new();
        let root = tree.add_founder(Agent::new(0.5, 1));
        let a = tree.add_child(root, Agent::new(0.4, 2)).unwrap();
        let b = tree.add_child(a, Agent::new(0.3, 3)).unwrap();
        let c = tree.add_child(b, Agent::new(0.2, 4)).unwrap();

        assert_eq!(lineage(&tree, c).unwrap(), vec![a, b, c]);
        assert!(lineage(&tree, root).unwrap().is_empty());

        let records = extract_lod(&tree, c).unwrap();
        let gens: Vec<_> = records.iter().map(|rec| rec.generation).collect();
        assert_eq!(gens, vec![2, 3, 4]);
        assert_eq!(records[2].probability, 0.2);
    }

    #[test]
    fn records_are_written_as_csv() {
        let records = vec![
            LodRecord {
                generation: 2,
                fitness: 4.0,
                probability: 0.25,
            },
            LodRecord {
                generation: 3,
                fitness: 1e-10,
                probability: 0.125,
            },
        ];
        let mut buf = Vec::new();
        write_lod(&mut buf, &records).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "generation,fitness,probability\n\
             2,4.000000,0.250000\n\
             3,0.000000,0.125000\n"
        );
    }
}
