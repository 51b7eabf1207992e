use std::sync::Arc;

use tricrawl::modules::archival::ArchivalRepository;
use tricrawl::modules::mapping::{MappingRepository, MappingUpsert};
use tricrawl::shared::database::Database;

use crate::utils::test_db::TestPool;

pub fn mapping_repo(pool: TestPool) -> Arc<MappingRepository> {
    Arc::new(MappingRepository::new(Arc::new(Database::from_pool(pool))))
}

pub fn archival_repo(pool: TestPool) -> Arc<ArchivalRepository> {
    Arc::new(ArchivalRepository::new(Arc::new(Database::from_pool(pool))))
}

/// A minimal `MappingUpsert` for a brand-new title, with just the fields
/// most tests need to set.
pub fn sample_upsert(mal_id: i32, title: &str) -> MappingUpsert {
    MappingUpsert {
        title_main: Some(title.to_string()),
        ..MappingUpsert::new(mal_id)
    }
}
