//! JSON text-file equivalence database.
//!
//! The file format:
//!
//! ```json
//! {"equivalences": [
//!   {"rev1": {"revId": "1002", "repositoryName": "internal"},
//!    "rev2": {"revId": "2", "repositoryName": "public"}}
//! ]}
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Db, Equivalence};
use crate::errors::DatabaseError;
use crate::models::Revision;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DbData {
    #[serde(default)]
    equivalences: Vec<Equivalence>,
}

/// Equivalence database held in memory and persisted as JSON.
#[derive(Debug, Clone, Default)]
pub struct FileDb {
    data: DbData,
    location: Option<PathBuf>,
}

impl FileDb {
    /// Parse a database from its JSON text.
    pub fn from_text(text: &str) -> Result<Self, DatabaseError> {
        let data: DbData = serde_json::from_str(text)?;
        debug!(count = data.equivalences.len(), "parsed equivalence database");
        Ok(Self {
            data,
            location: None,
        })
    }

    /// Load the database at `path`; a missing file is an empty database that
    /// [`save`](Self::save) will create.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let mut db = if path.exists() {
            info!(path = %path.display(), "loading equivalence database");
            Self::from_text(&std::fs::read_to_string(path)?)?
        } else {
            info!(path = %path.display(), "equivalence database not found, starting empty");
            Self::default()
        };
        db.location = Some(path.to_path_buf());
        Ok(db)
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Serialize the database to pretty-printed JSON.
    pub fn to_text(&self) -> Result<String, DatabaseError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Write the database to `path`, replacing its contents.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DatabaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_text()?)?;
        info!(path = %path.display(), count = self.data.equivalences.len(), "wrote equivalence database");
        Ok(())
    }

    /// Write the database back to the file it was opened from. A database
    /// parsed from text has nowhere to go and is left untouched.
    pub fn save(&self) -> Result<(), DatabaseError> {
        match &self.location {
            Some(path) => self.write_to_file(path),
            None => Ok(()),
        }
    }
}

impl Db for FileDb {
    fn find_equivalences(
        &self,
        revision: &Revision,
        other_repository: &str,
    ) -> Result<Vec<Revision>, DatabaseError> {
        let mut found: Vec<Revision> = Vec::new();
        for other in self
            .data
            .equivalences
            .iter()
            .filter_map(|eq| eq.other_revision(revision))
            .filter(|other| other.repository_name == other_repository)
        {
            if !found.contains(other) {
                found.push(other.clone());
            }
        }
        Ok(found)
    }

    fn note_equivalence(&mut self, equivalence: Equivalence) -> Result<(), DatabaseError> {
        if !self.data.equivalences.contains(&equivalence) {
            debug!(%equivalence, "noting equivalence");
            self.data.equivalences.push(equivalence);
        }
        Ok(())
    }

    fn equivalences(&self) -> Result<Vec<Equivalence>, DatabaseError> {
        Ok(self.data.equivalences.clone())
    }
}
