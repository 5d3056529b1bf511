/// Data layer: typed tables, dataset resolution and geography filtering.
///
/// Architecture:
/// ```text
///  --file override (.csv / .xls / .xlsx / .parquet / .json)    DB_PATH store
///        │                                                         │
///        ▼                                                         ▼
///   ┌──────────┐                                             ┌──────────┐
///   │  loader   │  parse file → Table                         │  store   │  SELECT * → Table
///   └──────────┘                                             └──────────┘
///        └──────────────────────┬──────────────────────────────────┘
///                               ▼
///                        ┌──────────┐
///                        │  filter   │  drop county/region aggregate rows
///                        └──────────┘
///                               │
///                               ▼
///                        ┌──────────┐
///                        │  cache    │  DatasetTag → Arc<Table>, loaded once
///                        └──────────┘
///                               │
///                               ▼
///                        ┌──────────┐
///                        │  schema   │  Table → typed records
///                        └──────────┘
/// ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
pub mod store;
pub mod tag;
