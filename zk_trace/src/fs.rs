use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use zk_tracer::{TraceEvent, TraceTable};

/// Reads the JSON array of events at `path`, or on stdin when `path` is
/// `None`. Errors point at the offending JSON path.
pub fn read_events(path: Option<&Path>) -> anyhow::Result<Vec<TraceEvent>> {
    let reader: Box<dyn Read> = match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin().lock())),
    };
    let des = &mut serde_json::Deserializer::from_reader(reader);
    let events: Vec<TraceEvent> =
        serde_path_to_error::deserialize(des).context("Failed to parse the event stream")?;
    Ok(events)
}

pub fn trace_file_name(output_dir: &Path, table: &TraceTable) -> PathBuf {
    output_dir.join(format!("{}.trace", table.module()))
}

/// Writes every table to `<output_dir>/<module>.trace`.
pub fn write_tables(output_dir: &Path, tables: &[TraceTable]) -> anyhow::Result<Vec<PathBuf>> {
    if !output_dir.exists() {
        tracing::info!("Created output directory {:?}", output_dir.display());
        std::fs::create_dir_all(output_dir)?;
    }

    let mut paths = Vec::with_capacity(tables.len());
    for table in tables {
        let path = trace_file_name(output_dir, table);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        table
            .write_to(BufWriter::new(file))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(
            "Wrote {} rows of {} to {}",
            table.row_count(),
            table.module(),
            path.display()
        );
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use zk_tracer::trace::read_headers;
    use zk_tracer::{Tracer, TracerConfig};

    use super::*;

    #[test]
    fn every_table_gets_a_file() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("zk_trace_fs_{}", std::process::id()));
        let tables = Tracer::new(TracerConfig::default()).finalize()?;
        let paths = write_tables(&dir, &tables)?;
        assert_eq!(paths.len(), 8);
        assert_eq!(paths[0], dir.join("hub.trace"));

        let bytes = std::fs::read(dir.join("wcp.trace"))?;
        let (module, headers) = read_headers(&bytes)?;
        assert_eq!(module, "wcp");
        assert!(headers.iter().all(|header| header.length == 2));

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn parse_errors_carry_the_json_path() {
        let dir = std::env::temp_dir().join(format!("zk_trace_parse_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("events.json");
        let events = r#"[{"kind": "block_end"}, {"kind": "opcode", "pc": "zero"}]"#;
        std::fs::write(&path, events).unwrap();

        let err = read_events(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("[1]"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
