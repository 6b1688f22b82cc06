//! Generic parameters functions
//!
//! Parameters are TOML files in the `params` directory of the software root (see
//! [`crate::host::get_sw_root`]).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot find the software root directory: {0}")]
    SwRootNotFound(std::io::Error),

    #[error("Cannot load the parmeter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file {0:?}: {1}")]
    DeserialiseError(PathBuf, toml::de::Error)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "params" directory of the software root.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError> 
where
    P: DeserializeOwned
{
    let mut path = crate::host::get_sw_root()
        .map_err(LoadError::SwRootNotFound)?;
    path.push("params");
    path.push(param_file_path);

    load_from(path)
}

/// Load a parameter file from an explicit path.
pub fn load_from<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>
{
    let path = path.as_ref().to_path_buf();

    let params_str = read_to_string(&path)
        .map_err(|e| LoadError::FileLoadError(path.clone(), e))?;

    from_str(&params_str).map_err(|e| match e {
        LoadError::DeserialiseError(_, e) => LoadError::DeserialiseError(path, e),
        e => e
    })
}

/// Parse parameters from TOML text.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    toml::from_str(params_str)
        .map_err(|e| LoadError::DeserialiseError(PathBuf::new(), e))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestParams {
        gain: f64,
        limits: [f64; 2],
    }

    #[test]
    fn test_from_str() {
        let p: TestParams = from_str("gain = 0.5\nlimits = [-1.0, 1.0]\n").unwrap();
        assert_eq!(p, TestParams { gain: 0.5, limits: [-1.0, 1.0] });

        assert!(matches!(
            from_str::<TestParams>("gain = \"high\""),
            Err(LoadError::DeserialiseError(..))
        ));
    }

    #[test]
    fn test_missing_file() {
        let res: Result<TestParams, _> = load_from("/this/file/does/not/exist.toml");
        assert!(matches!(res, Err(LoadError::FileLoadError(..))));
    }
}
