// registry.rs — Per-tenant stage catalogs.
//
// Each tenant gets its own catalog, seeded from the standard pipeline the
// first time the tenant is touched. Seeding upserts by stage code, so
// re-seeding a tenant that already has its catalog changes nothing.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::catalog::{StageCatalog, UpsertOutcome};

/// Lazily populated map of tenant → catalog.
pub struct CatalogRegistry {
    seed: StageCatalog,
    catalogs: RwLock<HashMap<Uuid, Arc<StageCatalog>>>,
}

impl CatalogRegistry {
    /// A registry that seeds tenants from `seed`.
    pub fn new(seed: StageCatalog) -> Self {
        Self {
            seed,
            catalogs: RwLock::new(HashMap::new()),
        }
    }

    /// The catalog for a tenant, seeding it on first use.
    pub fn for_tenant(&self, tenant_id: Uuid) -> Arc<StageCatalog> {
        {
            let catalogs = self.catalogs.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(catalog) = catalogs.get(&tenant_id) {
                return Arc::clone(catalog);
            }
        }
        self.seed_tenant(tenant_id)
    }

    /// Upsert every seed stage into the tenant's catalog.
    pub fn seed_tenant(&self, tenant_id: Uuid) -> Arc<StageCatalog> {
        let mut catalogs = self.catalogs.write().unwrap_or_else(PoisonError::into_inner);

        let existing = match catalogs.get(&tenant_id) {
            Some(catalog) => Arc::clone(catalog),
            None => {
                tracing::info!(%tenant_id, "seeding stage catalog");
                let catalog = Arc::new(self.seed.clone());
                catalogs.insert(tenant_id, Arc::clone(&catalog));
                return catalog;
            }
        };

        let mut updated = StageCatalog::clone(&existing);
        let mut changed = false;
        for stage in self.seed.stages() {
            match updated.upsert(stage.clone()) {
                Ok(UpsertOutcome::Unchanged) => {}
                Ok(_) => changed = true,
                Err(e) => {
                    tracing::warn!(%tenant_id, stage = %stage.code, "stage seed skipped: {}", e);
                }
            }
        }
        if !changed {
            return existing;
        }

        tracing::info!(%tenant_id, "stage catalog re-seeded");
        let catalog = Arc::new(updated);
        catalogs.insert(tenant_id, Arc::clone(&catalog));
        catalog
    }

    /// Replace a tenant's catalog outright.
    pub fn install(&self, tenant_id: Uuid, catalog: StageCatalog) {
        self.catalogs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant_id, Arc::new(catalog));
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new(StageCatalog::standard())
    }
}
