//! Membership list ingestion.
//!
//! The membership export is a CSV file with a header row. Only the name and
//! email columns are read (either lower-case or capitalised headers); all
//! other columns are ignored.

use std::{collections::HashSet, fs::File, io::Read, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// A member entitled to a voting token.
///
/// The address is the identity key for the whole distribution pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub address: String,
}

impl Recipient {
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(alias = "Name")]
    name: String,
    #[serde(alias = "Email")]
    email: String,
}

/// Read recipients from a CSV file on disk.
///
/// # Errors
/// Returns an [`InputError`] if the file cannot be opened or any row is invalid.
pub fn load(path: &Path) -> Result<Vec<Recipient>, InputError> {
    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    from_reader(file)
}

/// Read recipients from any CSV source.
///
/// Names and addresses are trimmed. Rows are numbered from 1, counting the
/// header, so the numbers in errors match what a spreadsheet shows.
///
/// # Errors
/// Returns an [`InputError`] on malformed CSV, an empty address, or an
/// address that appears twice.
pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Recipient>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut recipients = Vec::new();

    for (index, row) in reader.deserialize::<Row>().enumerate() {
        let row = row?;
        let number = index as u64 + 2;

        if row.email.is_empty() {
            return Err(InputError::EmptyAddress { row: number });
        }

        if !seen.insert(row.email.clone()) {
            return Err(InputError::DuplicateAddress {
                row: number,
                address: row.email,
            });
        }

        recipients.push(Recipient::new(row.name, row.email));
    }

    crate::internal!(level = DEBUG, "Loaded {} recipients", recipients.len());

    Ok(recipients)
}
