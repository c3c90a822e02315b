//! `test_spec.json` and `muts_all.json`: what the test runner builds and
//! which attached board ("MUT", mbed under test) it flashes.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::CiError;

pub const TEST_SPEC_FILE: &str = "test_spec.json";
pub const MUTS_FILE: &str = "muts_all.json";

/// Target to toolchains mapping, e.g. `{"targets": {"K64F": ["GCC_ARM"]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    pub targets: BTreeMap<String, Vec<String>>,
}

/// One board attached to the build node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mut {
    pub mcu: String,
    pub port: String,
    pub disk: String,
    pub peripherals: Vec<String>,
}

/// Boards keyed by `"1"`, `"2"`, ...
pub type Muts = BTreeMap<String, Mut>;

pub fn write_test_spec(dir: &Path, target: &str, toolchain: &str) -> Result<PathBuf, CiError> {
    let mut targets = BTreeMap::new();
    targets.insert(target.to_owned(), vec![toolchain.to_owned()]);
    write_json(&dir.join(TEST_SPEC_FILE), &TestSpec { targets })
}

/// Describe the single board under test. Network tests need the board's
/// ethernet peripheral declared.
pub fn write_muts(
    dir: &Path,
    target: &str,
    port: &str,
    disk: &str,
    network: bool,
) -> Result<PathBuf, CiError> {
    let mut muts = Muts::new();
    muts.insert(
        "1".into(),
        Mut {
            mcu: target.to_owned(),
            port: port.to_owned(),
            disk: disk.to_owned(),
            peripherals: if network {
                vec!["ethernet".into()]
            } else {
                vec![]
            },
        },
    );
    write_json(&dir.join(MUTS_FILE), &muts)
}

pub fn read_test_spec(dir: &Path) -> Result<TestSpec, CiError> {
    read_json(&dir.join(TEST_SPEC_FILE))
}

pub fn read_muts(dir: &Path) -> Result<Muts, CiError> {
    read_json(&dir.join(MUTS_FILE))
}

/// Delete both files; missing files are fine.
pub fn remove(dir: &Path) -> Result<(), CiError> {
    for name in &[TEST_SPEC_FILE, MUTS_FILE] {
        let path = dir.join(name);
        if path.exists() {
            debug!("removing {}", path.display());
            fs::remove_file(&path).map_err(CiError::file(&path))?;
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, CiError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text).map_err(CiError::file(path))?;
    debug!("wrote {}", path.display());
    Ok(path.to_path_buf())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CiError> {
    let text = fs::read_to_string(path).map_err(CiError::file(path))?;
    Ok(serde_json::from_str(&text)?)
}
