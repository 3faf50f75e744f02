// Aggregation engine: pure batch transforms over fetched pitch events.

pub mod location;
pub mod summary;
pub mod trend;
