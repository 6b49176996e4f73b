pub mod elasticsearch;
pub mod traits;

pub use elasticsearch::ElasticsearchSource;
pub use traits::{MigrationSource, SourceHit, SourcePage};
