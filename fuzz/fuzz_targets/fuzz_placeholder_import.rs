#![no_main]

use libfuzzer_sys::fuzz_target;
use mosaic_layout::{PlaceholderMap, SplitTree};

fuzz_target!(|data: &[u8]| {
    let Ok(map) = serde_json::from_slice::<PlaceholderMap>(data) else {
        return;
    };

    let mut tree = SplitTree::new();
    tree.on_container_resized(800.0, 600.0);
    let before = tree.state_hash();

    match tree.import_placeholders(&map) {
        Ok(()) => {
            // Every accepted map must produce a consistent skeleton.
            tree.validate().expect("imported tree must validate");
            assert!(tree.is_empty(), "skeleton import restored a panel");
            let exported = tree.export_placeholders();
            assert!(exported.validate().is_ok(), "re-export is not a valid map");
        }
        Err(_) => {
            assert_eq!(tree.state_hash(), before, "failed import changed the tree");
        }
    }
});
