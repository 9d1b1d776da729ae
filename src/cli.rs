//! Interactive line protocol (§6): `Open`/`Close`/`Put`/`Get`/`Scan`/
//! `Delete`/`Quit`, one [`Lsm`] per open database keyed by name.
//!
//! Grounded on `original_source/main.cpp` (`std::regex` command dispatch
//! against a per-database engine map, with a single "currently open"
//! database implicitly targeted by bare commands) for control flow, and on
//! `vvoss-dev-ReedCMS/reedbase` for the `rustyline` REPL idiom — the
//! teacher's own `main.rs` is a `structopt` benchmark harness, not a REPL.

use std::collections::HashMap;
use std::path::PathBuf;

use lazy_static::lazy_static;
use log::{error, warn};
use regex::Regex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::core::{Lookup, Strategy};
use crate::lsm::Lsm;
use crate::robt_config::Config;

lazy_static! {
    static ref OPEN_RE: Regex = Regex::new(r#"^Open\("([^"]+)"\)$"#).unwrap();
    static ref CLOSE_RE: Regex = Regex::new(r"^Close\(\)$").unwrap();
    static ref PUT_RE: Regex = Regex::new(r"^Put\((\d+),(\d+)\)$").unwrap();
    static ref GET_RE: Regex = Regex::new(r"^Get\((\d+)\)$").unwrap();
    static ref SCAN_RE: Regex = Regex::new(r"^Scan\((\d+),(\d+)\)$").unwrap();
    static ref DELETE_RE: Regex = Regex::new(r"^Delete\((\d+)\)$").unwrap();
    static ref QUIT_RE: Regex = Regex::new(r"^Quit\(\)$").unwrap();
}

/// Run the REPL against `data_root`, one subdirectory per opened database.
/// Returns only on `Quit()`, EOF, or an interrupt.
pub fn run(data_root: PathBuf, cfg: Config) -> crate::error::Result<()> {
    std::fs::create_dir_all(&data_root)?;
    let mut editor = DefaultEditor::new().map_err(editor_err)?;
    let mut open_dbs: HashMap<String, Lsm> = HashMap::new();
    let mut current: Option<String> = None;

    loop {
        let line = match editor.readline("lsmkv> ") {
            Ok(line) => line,
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(err) => {
                error!("readline failed: {err}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        if let Some(caps) = OPEN_RE.captures(trimmed) {
            let name = caps[1].to_string();
            if !open_dbs.contains_key(&name) {
                let dir = data_root.join(&name);
                match Lsm::open(dir, cfg) {
                    Ok(lsm) => {
                        open_dbs.insert(name.clone(), lsm);
                    }
                    Err(err) => {
                        error!("Open(\"{name}\") failed: {err}");
                        continue;
                    }
                }
            }
            current = Some(name);
        } else if CLOSE_RE.is_match(trimmed) {
            match current.take() {
                Some(name) => {
                    if let Some(lsm) = open_dbs.remove(&name) {
                        if let Err(err) = lsm.close() {
                            error!("Close() failed for \"{name}\": {err}");
                        }
                    }
                }
                None => warn!("Close(): no open database"),
            }
        } else if let Some(caps) = PUT_RE.captures(trimmed) {
            let Some(key) = parse_i64(&caps[1]) else { continue };
            let Some(value) = parse_i64(&caps[2]) else { continue };
            run_on_current(&mut open_dbs, &current, |lsm| {
                lsm.put(key, value)?;
                Ok(())
            });
        } else if let Some(caps) = GET_RE.captures(trimmed) {
            let Some(key) = parse_i64(&caps[1]) else { continue };
            let Some(strategy) = prompt_strategy(&mut editor) else { continue };
            run_on_current(&mut open_dbs, &current, |lsm| {
                let result = lsm.get(key, strategy)?;
                println!("{}", describe_lookup(result));
                Ok(())
            });
        } else if let Some(caps) = SCAN_RE.captures(trimmed) {
            let Some(k1) = parse_i64(&caps[1]) else { continue };
            let Some(k2) = parse_i64(&caps[2]) else { continue };
            let Some(strategy) = prompt_strategy(&mut editor) else { continue };
            run_on_current(&mut open_dbs, &current, |lsm| {
                let results = lsm.scan(k1, k2, strategy)?;
                for (k, v) in results {
                    println!("{k} => {v}");
                }
                Ok(())
            });
        } else if let Some(caps) = DELETE_RE.captures(trimmed) {
            let Some(key) = parse_i64(&caps[1]) else { continue };
            run_on_current(&mut open_dbs, &current, |lsm| {
                lsm.delete(key)?;
                Ok(())
            });
        } else if QUIT_RE.is_match(trimmed) {
            for (name, lsm) in open_dbs.drain() {
                if let Err(err) = lsm.close() {
                    error!("flush on Quit() failed for \"{name}\": {err}");
                }
            }
            break;
        } else {
            error!("invalid command: {trimmed}");
        }
    }
    Ok(())
}

fn run_on_current(
    open_dbs: &mut HashMap<String, Lsm>,
    current: &Option<String>,
    op: impl FnOnce(&mut Lsm) -> crate::error::Result<()>,
) {
    let Some(name) = current else {
        error!("no open database; call Open(\"<db>\") first");
        return;
    };
    let Some(lsm) = open_dbs.get_mut(name) else {
        error!("database \"{name}\" is not open");
        return;
    };
    if let Err(err) = op(lsm) {
        error!("operation on \"{name}\" failed: {err}");
    }
}

/// The `(\d+)` capture groups admit arbitrarily long digit strings, which
/// can overflow `i64` (§7 "invalid command... reported, no state change").
fn parse_i64(digits: &str) -> Option<i64> {
    match digits.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            error!("invalid integer \"{digits}\": {err}");
            None
        }
    }
}

fn prompt_strategy(editor: &mut DefaultEditor) -> Option<Strategy> {
    loop {
        match editor.readline("  strategy [1=paged binary search, 2=btree index]: ") {
            Ok(line) => match line.trim() {
                "1" => return Some(Strategy::PagedBinarySearch),
                "2" => return Some(Strategy::BTreeIndex),
                other => {
                    error!("invalid strategy \"{other}\"; expected 1 or 2");
                }
            },
            Err(_) => return None,
        }
    }
}

fn describe_lookup(lookup: Lookup) -> String {
    match lookup {
        Lookup::Found(value) => value.to_string(),
        Lookup::Deleted => "deleted".to_string(),
        Lookup::Absent => "absent".to_string(),
    }
}

fn editor_err(err: rustyline::error::ReadlineError) -> crate::error::Error {
    crate::error::Error::InvalidCommand(err.to_string())
}
