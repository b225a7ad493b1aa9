//! Team entity.
//!
//! Teams are not season-scoped upstream; they only ever appear as the two
//! sides of a match. The team table is derived by collecting those sides
//! during ingest, and "teams of a group" is derived by scanning the group's
//! matches at query time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
  pub id:       String,
  pub name:     String,
  pub logo_url: Option<String>,
}
