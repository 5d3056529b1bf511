//! Municipal energy consumption, expenditure and CO2 baseline estimates for
//! the commercial, industrial and residential sectors.

pub mod calibrate;
pub mod config;
pub mod data;
pub mod error;
pub mod fuel;
pub mod measure;
pub mod pipeline;
pub mod publish;
pub mod sectors;
