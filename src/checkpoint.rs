//! Persistence of a parameter set as a JSON document keyed by parameter name.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use crate::{ParamSet, Result};

/// Writes `params` to `path`, creating the missing parent directories.
pub fn save<P: AsRef<Path>>(path: P, params: &ParamSet) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, params)?;
    writer.flush()?;
    Ok(())
}

/// Reads a parameter set previously written by [`save`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<ParamSet> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
