use std::{
  io::Read,
  path::Path,
};

use eyre::{
  Result,
  WrapErr,
  bail,
};
use serde_json::Value;
use the_delta::{
  Delta,
  Operation,
};

use crate::{
  Command,
  config::Config,
};

/// Run `command` and return what should be printed.
pub fn run(command: &Command, config: &Config) -> Result<String> {
  let delta = match command {
    Command::Compose { deltas } => {
      let mut deltas = deltas.iter();
      let mut composed = match deltas.next() {
        Some(path) => read_delta(path, config)?,
        None => Delta::new(),
      };
      for path in deltas {
        composed = composed.compose(&read_delta(path, config)?);
      }
      composed
    },
    Command::Invert { delta, base } => {
      let delta = read_delta(delta, config)?;
      let base = read_delta(base, config)?;
      if !base.is_document() {
        log::warn!("base contains retains or deletes; only its inserts are restored as text");
      }
      delta
        .invert(&base)
        .wrap_err("delta does not fit the base document")?
    },
    Command::Slice { delta, start, end } => {
      read_delta(delta, config)?
        .slice(*start, *end)
        .wrap_err("invalid slice")?
    },
    Command::Normalize { delta } => read_delta(delta, config)?,
    Command::Text { delta } => return Ok(read_delta(delta, config)?.raw_string().to_owned()),
  };

  let json = if config.pretty {
    delta.to_json_pretty()?
  } else {
    delta.to_json()?
  };
  Ok(json)
}

fn read_source(path: &Path) -> Result<String> {
  if path == Path::new("-") {
    let mut source = String::new();
    std::io::stdin()
      .read_to_string(&mut source)
      .wrap_err("failed to read stdin")?;
    return Ok(source);
  }
  std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

pub fn read_delta(path: &Path, config: &Config) -> Result<Delta> {
  let source = read_source(path)?;
  parse_delta(&source, config.strict).wrap_err_with(|| format!("in {}", path.display()))
}

pub fn parse_delta(source: &str, strict: bool) -> Result<Delta> {
  if !strict {
    return Ok(Delta::from_json(source)?);
  }

  let records: Vec<Value> = serde_json::from_str(source).wrap_err("expected a JSON array")?;
  let mut delta = Delta::with_capacity(records.len());
  for (index, record) in records.iter().enumerate() {
    let Some(op) = Operation::from_record(record) else {
      bail!("record {index} is not an operation: {record}");
    };
    delta.push(op);
  }
  Ok(delta)
}
