//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `notations_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use notations_core::{resolve_route, sheet_route_segments, RouteTarget, TreeStore};

fn main() {
    let store = TreeStore::seed();
    println!("notations_core version={}", notations_core::core_version());
    println!(
        "seed nodes={} sheets_under_root={}",
        store.len(),
        store.count_sheets(store.root_id())
    );

    // Resolve the demo recipe sheet through the router as a wiring probe.
    let segments: Vec<String> = ["food-notes", "huckleberry-pie-recipe"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    match resolve_route(&store, &segments) {
        Some(RouteTarget::Editor { sheet_id }) => {
            println!(
                "route /food-notes/huckleberry-pie-recipe -> sheet {} ({})",
                sheet_id,
                sheet_route_segments(&store, sheet_id).join("/")
            );
        }
        other => println!("route probe unexpected result: {other:?}"),
    }
}
