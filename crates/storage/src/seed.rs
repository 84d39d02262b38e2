//! Reference categories and the demo catalog.

use chrono::{DateTime, NaiveDate, Utc};
use shared::domain::{Category, OwnerId, Piece, PieceId};

pub const DEMO_OWNER_ID: &str = "mockUserId123";
pub const OTHER_DEMO_OWNER_ID: &str = "anotherMockUserId456";

const CATEGORIES: [(&str, &str); 4] = [
    ("cat1", "Vases"),
    ("cat2", "Bowls"),
    ("cat3", "Mugs"),
    ("cat4", "Decorative"),
];

pub fn default_categories() -> Vec<Category> {
    CATEGORIES
        .iter()
        .map(|(id, name)| Category::new(*id, *name))
        .collect()
}

fn day(year: i32, month: u32, date: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, date)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn picsum(seeds: &[&str]) -> Vec<String> {
    seeds
        .iter()
        .map(|seed| format!("https://picsum.photos/seed/{seed}/600/800"))
        .collect()
}

struct DemoPiece {
    id: &'static str,
    owner: &'static str,
    name: &'static str,
    description: &'static str,
    dimensions: (f64, f64, f64),
    materials: &'static str,
    category: usize,
    images: &'static [&'static str],
    created: (i32, u32, u32),
}

const DEMO: [DemoPiece; 6] = [
    DemoPiece {
        id: "p1",
        owner: DEMO_OWNER_ID,
        name: "Terracotta Sunrise Vase",
        description: "A handcrafted terracotta vase, inspired by the warm hues of a sunrise. Perfect for medium-sized bouquets or as a standalone art piece.",
        dimensions: (25.0, 12.0, 12.0),
        materials: "Terracotta clay, Clear glaze",
        category: 0,
        images: &["p1_1", "p1_2"],
        created: (2023, 5, 15),
    },
    DemoPiece {
        id: "p2",
        owner: DEMO_OWNER_ID,
        name: "Earthenware Serving Bowl",
        description: "Large earthenware bowl with a rustic beige finish, ideal for serving salads or fruits. Features subtle hand-carved patterns.",
        dimensions: (10.0, 30.0, 30.0),
        materials: "Earthenware clay, Food-safe beige glaze",
        category: 1,
        images: &["p2_1"],
        created: (2023, 8, 20),
    },
    DemoPiece {
        id: "p3",
        owner: OTHER_DEMO_OWNER_ID,
        name: "Forest Whisper Mug Set",
        description: "Set of two stoneware mugs, glazed in deep forest green with a comfortable, ergonomic handle. Perfect for your morning coffee or tea.",
        dimensions: (10.0, 9.0, 12.0),
        materials: "Stoneware clay, Lead-free green glaze",
        category: 2,
        images: &["p3_1", "p3_2"],
        created: (2023, 3, 10),
    },
    DemoPiece {
        id: "p4",
        owner: DEMO_OWNER_ID,
        name: "Abstract Clay Sculpture \"Cycles\"",
        description: "A unique decorative sculpture exploring themes of nature and continuity. Finished with a matte warm gray glaze.",
        dimensions: (40.0, 20.0, 15.0),
        materials: "Sculptural clay body, Matte gray glaze",
        category: 3,
        images: &["p4_1"],
        created: (2022, 11, 5),
    },
    DemoPiece {
        id: "p5",
        owner: DEMO_OWNER_ID,
        name: "Minimalist Beige Planter",
        description: "A sleek, minimalist planter with a smooth beige finish, perfect for small to medium-sized indoor plants. Includes a drainage hole and matching saucer.",
        dimensions: (15.0, 16.0, 16.0),
        materials: "Stoneware, Matte beige glaze",
        category: 3,
        images: &["p5_1", "p5_2", "p5_3"],
        created: (2023, 10, 1),
    },
    DemoPiece {
        id: "p6",
        owner: OTHER_DEMO_OWNER_ID,
        name: "Burnt Sienna Coffee Pour Over",
        description: "A stylish pour-over coffee maker in a striking burnt sienna glaze. Designed for a perfect brew and a beautiful kitchen accent.",
        dimensions: (18.0, 13.0, 13.0),
        materials: "Porcelain, Burnt sienna glaze",
        category: 1,
        images: &["p6_1"],
        created: (2023, 9, 12),
    },
];

/// Demo pieces drawn against `categories`. Pieces whose category index is
/// missing from the slice are skipped.
pub fn demo_pieces(categories: &[Category]) -> Vec<Piece> {
    DEMO.iter()
        .filter_map(|demo| {
            let category = categories.get(demo.category)?.clone();
            let (height, width, depth) = demo.dimensions;
            let (year, month, date) = demo.created;
            Some(Piece {
                id: PieceId::from(demo.id),
                owner_id: OwnerId::from(demo.owner),
                name: demo.name.to_string(),
                description: demo.description.to_string(),
                materials: demo.materials.to_string(),
                category,
                image_urls: picsum(demo.images),
                height: Some(height),
                width: Some(width),
                depth: Some(depth),
                creation_date: day(year, month, date),
            })
        })
        .collect()
}
