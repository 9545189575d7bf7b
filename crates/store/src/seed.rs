//! Seed catalog: the fixed product baseline used at startup and by reset.

use stockgate_core::ProductId;

/// Version every product carries right after seeding or reset.
pub const BASELINE_VERSION: i64 = 1;

/// A seeded product and its baseline stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SeedProduct {
    pub id: ProductId,
    pub name: &'static str,
    pub baseline_stock: i64,
}

/// The fixed catalog. Reset restores exactly these values regardless of
/// prior mutations, for test repeatability.
pub fn catalog() -> &'static [SeedProduct] {
    const CATALOG: [SeedProduct; 2] = [
        SeedProduct {
            id: ProductId::new(1),
            name: "Super Widget",
            baseline_stock: 100,
        },
        SeedProduct {
            id: ProductId::new(2),
            name: "Mega Gadget",
            baseline_stock: 50,
        },
    ];
    &CATALOG
}

/// Baseline for one product, if it is part of the catalog.
pub fn baseline_for(id: ProductId) -> Option<&'static SeedProduct> {
    catalog().iter().find(|s| s.id == id)
}
