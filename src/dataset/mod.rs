pub mod cases;
pub mod clean;
pub mod compare;
pub mod integrity;
pub mod join;
pub mod persist;
pub mod pipeline;
pub mod registry;
pub mod stats;
pub mod table;
pub mod testimonies;
pub mod validate;
