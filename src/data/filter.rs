use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Non-municipal geographies
// ---------------------------------------------------------------------------

/// Aggregate geographies (counties, planning subregions, councils) that share
/// the `municipal` column with real municipalities in the source tables.
pub const BLACKLIST: &[&str] = &[
    "Barnstable County",
    "Berkshire County",
    "Bristol County",
    "Dukes County",
    "Essex County",
    "Established Suburb/Cape Cod Town",
    "Franklin County",
    "Hampden County",
    "Hampshire County",
    "Middlesex County",
    "Nantucket County",
    "Norfolk County",
    "Plymouth County",
    "Suffolk County",
    "Worcester County",
    "Franklin Regional Council Of Governments",
    "Inner Core (ICC) Subregion",
    "MAGIC Subregion",
    "MetroFuture",
    "MetroFuture Region",
    "Northern Middlesex Council of Government",
    "North Shore (NSTF) Subregion",
    "North Suburban (NSPC) Subregion",
    "South Shore (SSC) Subregion",
    "South West (SWAP) Subregion",
    "Sub-Regional Urban Center",
    "Three Rivers (TRIC) Subregion",
];

pub const MUNICIPAL_COLUMN: &str = "municipal";

/// Whether a municipality label names one of the blacklisted aggregates.
pub fn is_blacklisted(name: &str) -> bool {
    let name = name.trim();
    BLACKLIST.iter().any(|entry| entry.eq_ignore_ascii_case(name))
}

/// Drop every row whose `municipal` value is a blacklisted aggregate.
/// Tables without a `municipal` column are returned unchanged.
pub fn remove_aggregate_geographies(table: &Table) -> Table {
    let Some(idx) = table.column_index(MUNICIPAL_COLUMN) else {
        return table.clone();
    };

    let filtered = table.filter_rows(|row| match &row[idx] {
        Value::Null => true,
        value => !is_blacklisted(&value.to_string()),
    });

    let removed = table.len() - filtered.len();
    if removed > 0 {
        log::debug!("geography filter removed {removed} aggregate rows");
    }
    filtered
}
