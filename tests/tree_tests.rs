//! Integration tests for the tag tree and store persistence

use std::fs;
use tagmap::application::{SearchFilters, TagSearch, TagTreeService};
use tagmap::domain::tag::{LanguageFilter, Tag, TagId};
use tagmap::domain::tree::Position;
use tagmap::infrastructure::{EngineConfig, MemoryStore, TagStore};
use tagmap::TagmapError;
use tempfile::TempDir;

mod common;
use common::{store, tag, tag_under};

fn assert_nested(tags: &[Tag]) {
    for a in tags {
        for b in tags {
            if a.id == b.id {
                continue;
            }
            let inside = a.lft < b.lft && b.rgt < a.rgt;
            let outside = a.rgt < b.lft || b.rgt < a.lft;
            let around = b.lft < a.lft && a.rgt < b.rgt;
            assert!(inside || outside || around, "{:?} overlaps {:?}", a, b);
        }
    }
}

#[test]
fn test_nested_set_holds_across_moves() {
    let mut store = store();
    let ids: Vec<TagId> = (0..8).map(|i| tag(&mut store, &format!("Node {}", i))).collect();
    let moves = [
        (1, 0, Position::LastChild),
        (2, 0, Position::FirstChild),
        (3, 1, Position::LastChild),
        (4, 3, Position::Before),
        (5, 2, Position::After),
        (0, 6, Position::LastChild),
        (7, 3, Position::FirstChild),
        (6, 0, Position::LastChild),
    ];

    let mut service = TagTreeService::new(&mut store);
    for (id, anchor, position) in moves {
        match service.set_location(ids[id], ids[anchor], position) {
            Ok(_) | Err(TagmapError::Validation(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    let tree = store.load_tree().unwrap();
    tree.check_invariants().unwrap();
    assert_nested(&store.all_tags().unwrap());
}

#[test]
fn test_move_into_own_subtree_is_rejected() {
    let mut store = store();
    let parent = tag(&mut store, "Parent");
    let child = tag_under(&mut store, "Child", parent);
    let grandchild = tag_under(&mut store, "Grandchild", child);

    let mut service = TagTreeService::new(&mut store);
    assert!(matches!(
        service.set_location(parent, grandchild, Position::LastChild),
        Err(TagmapError::Validation(_))
    ));
    assert!(matches!(
        service.set_location(parent, parent, Position::LastChild),
        Err(TagmapError::Validation(_))
    ));
    assert!(matches!(
        service.set_location(1, parent, Position::LastChild),
        Err(TagmapError::Validation(_))
    ));
    assert!(service
        .set_location(parent, 999, Position::LastChild)
        .unwrap_err()
        .is_not_found());

    assert_eq!(service.descendants(parent).unwrap(), vec![parent, child, grandchild]);
    assert_eq!(
        store.find_tag(grandchild).unwrap().unwrap().path,
        "parent/child/grandchild"
    );
}

#[test]
fn test_moving_subtree_rewrites_paths() {
    let mut store = store();
    let a = tag(&mut store, "A");
    let b = tag_under(&mut store, "B", a);
    let c = tag_under(&mut store, "C", b);
    let x = tag(&mut store, "X");

    TagTreeService::new(&mut store)
        .set_location(b, x, Position::FirstChild)
        .unwrap();

    let c_row = store.find_tag(c).unwrap().unwrap();
    assert_eq!(c_row.path, "x/b/c");
    assert_eq!(c_row.level, 3);
    assert!(store.find_tag(a).unwrap().unwrap().is_leaf());
    store.load_tree().unwrap().check_invariants().unwrap();
}

#[test]
fn test_rebuild_repairs_stored_boundaries() {
    let mut store = store();
    let a = tag(&mut store, "A");
    let b = tag_under(&mut store, "B", a);

    let mut broken = store.find_tag(b).unwrap().unwrap();
    broken.lft = 40;
    broken.rgt = 41;
    broken.path = "wrong".to_string();
    store.update_tags(&[broken]).unwrap();

    let rewritten = TagTreeService::new(&mut store).rebuild().unwrap();
    assert!(rewritten >= 1);
    store.load_tree().unwrap().check_invariants().unwrap();
    assert_eq!(store.find_tag(b).unwrap().unwrap().path, "a/b");
}

#[test]
fn test_snapshot_round_trip_keeps_tree_and_mappings() {
    let temp = TempDir::new().unwrap();
    let mut store = store();
    let parent = tag(&mut store, "Parent");
    let child = tag_under(&mut store, "Child", parent);
    common::add_article(&mut store, 1, "Article");
    let config = EngineConfig::default();
    tagmap::application::TagMapper::new(&mut store, &config)
        .tag_item(
            &tagmap::infrastructure::StaticContext::public(),
            &tagmap::application::TagItemRequest::new(common::ARTICLE, 1, 1).with_tags([child]),
        )
        .unwrap();

    store.save_to_dir(temp.path()).unwrap();
    let loaded = MemoryStore::load_from_dir(temp.path()).unwrap();

    assert_eq!(loaded.all_tags().unwrap(), store.all_tags().unwrap());
    assert_eq!(loaded.mappings(), store.mappings());
    assert_eq!(loaded.content_records(), store.content_records());
    assert_eq!(loaded.content_types().unwrap(), store.content_types().unwrap());
}

#[test]
fn test_corrupt_snapshot_is_rejected() {
    let temp = TempDir::new().unwrap();
    MemoryStore::new("root").save_to_dir(temp.path()).unwrap();
    fs::write(temp.path().join(".tagmap/store.json"), "{ not json").unwrap();

    let err = MemoryStore::load_from_dir(temp.path()).unwrap_err();
    assert!(matches!(err, TagmapError::Json(_)));
}

#[test]
fn test_config_round_trip() {
    let temp = TempDir::new().unwrap();
    assert_eq!(
        EngineConfig::load_or_default(temp.path()).unwrap(),
        EngineConfig::default()
    );

    let config = EngineConfig {
        default_access: 2,
        default_language: "en-GB".to_string(),
        tag_list_language_filter: LanguageFilter::Current,
        root_alias: "top".to_string(),
    };
    config.save_to_dir(temp.path()).unwrap();
    assert_eq!(EngineConfig::load_from_dir(temp.path()).unwrap(), config);
}

#[test]
fn test_search_excludes_root_and_follows_tree_order() {
    let mut store = store();
    let a = tag(&mut store, "Alpha");
    let z = tag(&mut store, "Zulu");
    let m = tag_under(&mut store, "Mike", a);

    let options = TagSearch::new(&store).search(&SearchFilters::default()).unwrap();
    let values: Vec<TagId> = options.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![a, m, z]);
    assert_eq!(options[1].text, "Alpha/Mike");
}
