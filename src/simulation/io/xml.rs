use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Could not open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Can't open file path: {0}. Only files with endings '.xml' or '.xml.gz' are supported.")]
    UnsupportedFormat(String),
    #[error("Problem reading {path} at '{at}': {message}")]
    Parse {
        path: String,
        at: String,
        message: String,
    },
}

pub fn read_from_file<T>(file_path: &Path) -> Result<T, XmlError>
where
    T: DeserializeOwned,
{
    info!("xml::read_from_file: Starting to read file at: {file_path:?}");
    let path = file_path.display().to_string();
    if !path.ends_with(".xml") && !path.ends_with(".xml.gz") {
        return Err(XmlError::UnsupportedFormat(path));
    }

    let file = File::open(file_path).map_err(|source| XmlError::Io {
        path: path.clone(),
        source,
    })?;
    let buffered_reader = BufReader::new(file);

    if path.ends_with(".xml.gz") {
        // use full name, to avoid ambiguity
        let decoder = flate2::read::GzDecoder::new(buffered_reader);
        read(BufReader::new(decoder), &path)
    } else {
        read(buffered_reader, &path)
    }
}

pub fn read<T, R>(reader: R, path: &str) -> Result<T, XmlError>
where
    T: DeserializeOwned,
    R: BufRead,
{
    let mut deserializer = quick_xml::de::Deserializer::from_reader(reader);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| XmlError::Parse {
        path: path.to_string(),
        at: e.path().to_string(),
        message: e.inner().to_string(),
    })
}
