use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use encoding_rs::WINDOWS_1252;
use tracing::{debug, error, info};

use crate::dbc::core::{LINE_PARSERS, LineOutcome, strings};
use crate::types::errors::DbcLoadError;
use crate::types::registry::BusRegistry;

/// Parses a DBC file into a bus registered under the file's stem.
///
/// The file is read as raw bytes and decoded as Windows-1252 (real-world
/// DBCs are frequently not UTF-8). Each non-blank line runs through the
/// ordered parser chain; unknown lines are skipped, and no malformed line
/// aborts the load. After EOF the bus is finalized with
/// [`CanBus::build`](crate::types::bus::CanBus::build), which moves every
/// pending signal into its owning message.
///
/// Returns the bus name on success. A bus that already exists (loading the
/// same file twice, or two files with the same stem) is reused.
pub fn from_file(registry: &mut BusRegistry, path: &str) -> Result<String, DbcLoadError> {
    if !path.ends_with(".dbc") {
        return Err(DbcLoadError::InvalidExtension {
            path: path.to_string(),
        });
    }

    let file: File = File::open(path).map_err(|source| DbcLoadError::Open {
        path: path.to_string(),
        source,
    })?;
    let mut reader: BufReader<File> = BufReader::new(file);

    let mut bytes: Vec<u8> = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| DbcLoadError::Read {
            path: path.to_string(),
            source,
        })?;

    let (text, _, _) = WINDOWS_1252.decode(&bytes);

    let bus_name: String = Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let bus = registry.get_or_create_bus(&bus_name);

    let lines: Vec<&str> = text.lines().collect();
    let mut i: usize = 0;
    while i < lines.len() {
        let trimmed: &str = lines[i].trim_start();
        // skip blank lines and comments
        if trimmed.is_empty() || trimmed.starts_with("//") {
            i += 1;
            continue;
        }
        debug!(line = trimmed, "dbc line");

        // a CM_ comment may span lines; join until its quote closes
        let joined: Option<String> = if trimmed.starts_with("CM_ ")
            && strings::count_unescaped_quotes(trimmed) == 1
        {
            Some(strings::accumulate_until_quote_closes(trimmed, &lines, &mut i))
        } else {
            None
        };
        let line: &str = joined.as_deref().unwrap_or(trimmed);

        let mut handled: bool = false;
        for parser in LINE_PARSERS {
            if parser(bus, line) == LineOutcome::Handled {
                handled = true;
                break;
            }
        }
        if !handled {
            debug!(line, "line not recognized by any parser, skipped");
        }
        i += 1;
    }

    bus.build();
    info!(bus = %bus_name, path, "finished loading database");
    Ok(bus_name)
}

/// Loads a DBC file, reporting failures instead of propagating them.
/// Returns whether the load succeeded.
pub fn load_dbc(registry: &mut BusRegistry, path: &str) -> bool {
    match from_file(registry, path) {
        Ok(_) => true,
        Err(e) => {
            error!(path, error = %e, "failed to load DBC file");
            false
        }
    }
}
