use std::{collections::HashSet, sync::Arc};

use catalog_api::{create_piece, list_pieces, CatalogContext, LatencyProfile};
use shared::{
    domain::{CategoryId, OwnerId},
    protocol::NewPieceSubmission,
};
use storage::{MemoryStore, PieceRepository};

fn bowl(n: usize) -> NewPieceSubmission {
    NewPieceSubmission {
        name: format!("Bowl number {n}"),
        description: "Thrown on the wheel, glazed twice".into(),
        materials: "Stoneware".into(),
        category_id: CategoryId::from("cat2"),
        image_urls: Vec::new(),
        height: Some(8.0),
        width: Some(14.5),
        depth: Some(14.5),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_all_land_with_distinct_ids() {
    let store = Arc::new(MemoryStore::empty());
    let ctx = CatalogContext::new(store.clone()).with_latency(LatencyProfile::none());

    let mut handles = Vec::new();
    for n in 0..32 {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            create_piece(&ctx, bowl(n), Some(&OwnerId::from("u1"))).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let piece = handle.await.expect("join").expect("create");
        ids.insert(piece.id);
    }
    assert_eq!(ids.len(), 32);
    assert_eq!(store.len().await.expect("len"), 32);

    let listed = list_pieces(&ctx, Some(&OwnerId::from("u1")))
        .await
        .expect("list");
    assert_eq!(listed.len(), 32);
}
