//! Seed data for the in-memory room directory

use serde::Deserialize;

use super::error::ValidationError;

/// Users and rooms loaded into the in-memory directory at startup.
///
/// Deployments backed by the account service leave both lists empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    /// Comma-separated `id:username` pairs, e.g. `1:alice,2:bob`
    pub users: Option<String>,

    /// Comma-separated public room ids, e.g. `1,2,3`
    pub rooms: Option<String>,
}

impl DirectoryConfig {
    /// Parsed `(id, username)` pairs
    pub fn user_entries(&self) -> Result<Vec<(u64, String)>, ValidationError> {
        split_list(self.users.as_deref())
            .map(|entry| {
                let (id, name) = entry
                    .split_once(':')
                    .ok_or_else(|| ValidationError::InvalidDirectoryEntry(entry.to_string()))?;
                let id = parse_id(id, entry)?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ValidationError::InvalidDirectoryEntry(entry.to_string()));
                }
                Ok((id, name.to_string()))
            })
            .collect()
    }

    /// Parsed room ids
    pub fn room_entries(&self) -> Result<Vec<u64>, ValidationError> {
        split_list(self.rooms.as_deref())
            .map(|entry| parse_id(entry, entry))
            .collect()
    }

    /// Validate directory seed data
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.user_entries()?;
        self.room_entries()?;
        Ok(())
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_id(raw: &str, entry: &str) -> Result<u64, ValidationError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidDirectoryEntry(entry.to_string())),
    }
}
