//! Integration tests for item tagging

use tagmap::application::{TagItemRequest, TagMapper, TagRegistry, TokenResolution};
use tagmap::domain::tag::{LanguageFilter, PublishState, TagToken};
use tagmap::infrastructure::{EngineConfig, StaticContext, TagStore};
use tagmap::TagmapError;

mod common;
use common::{mapped_ids, store, tag, tag_under, FailingStore, ARTICLE, CONTACT};

#[test]
fn test_replace_is_idempotent() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let one = tag(&mut store, "One");
    let two = tag(&mut store, "Two");

    let request = TagItemRequest::new(ARTICLE, 10, 100).with_tags([one, two]);
    let mut mapper = TagMapper::new(&mut store, &config);
    mapper.tag_item(&ctx, &request).unwrap();
    mapper.tag_item(&ctx, &request).unwrap();

    assert_eq!(mapped_ids(&store, ARTICLE, 10), vec![one, two]);
    assert_eq!(store.mappings().len(), 2);
}

#[test]
fn test_replace_drops_stale_rows() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let one = tag(&mut store, "One");
    let two = tag(&mut store, "Two");
    let three = tag(&mut store, "Three");

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([one, two]))
        .unwrap();
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([three]))
        .unwrap();

    assert_eq!(mapped_ids(&store, ARTICLE, 10), vec![three]);
}

#[test]
fn test_merge_unions_with_existing_tags() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let one = tag(&mut store, "One");
    let two = tag(&mut store, "Two");
    let three = tag(&mut store, "Three");

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([one, two]))
        .unwrap();
    let report = mapper
        .tag_item(
            &ctx,
            &TagItemRequest::new(ARTICLE, 10, 100)
                .with_tags([two, three])
                .merge(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(report.tag_ids, vec![two, three, one]);
    assert_eq!(mapped_ids(&store, ARTICLE, 10), vec![one, two, three]);
}

#[test]
fn test_merge_dedups_textual_duplicate_after_resolution() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let one = tag(&mut store, "One");

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([one]))
        .unwrap();
    let report = mapper
        .tag_item(
            &ctx,
            &TagItemRequest::new(ARTICLE, 10, 100)
                .with_tags(["One"])
                .merge(),
        )
        .unwrap()
        .unwrap();

    // the token-level de-dup keeps both entries; the id set does not
    assert_eq!(report.resolutions.len(), 2);
    assert_eq!(report.tag_ids, vec![one]);
    assert_eq!(mapped_ids(&store, ARTICLE, 10), vec![one]);
}

#[test]
fn test_merge_on_new_item_ignores_existing_rows() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let one = tag(&mut store, "One");
    let two = tag(&mut store, "Two");

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([one]))
        .unwrap();
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 11, 101).with_tags([two]).new_item().merge())
        .unwrap();

    assert_eq!(mapped_ids(&store, ARTICLE, 10), vec![one]);
    assert_eq!(mapped_ids(&store, ARTICLE, 11), vec![two]);
}

#[test]
fn test_new_tag_marker_creates_one_tag() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let before = store.all_tags().unwrap().len();

    let report = TagMapper::new(&mut store, &config)
        .tag_item(
            &ctx,
            &TagItemRequest::new(ARTICLE, 1, 1).with_tags(["#new#Example"]),
        )
        .unwrap()
        .unwrap();

    assert_eq!(store.all_tags().unwrap().len(), before + 1);
    let created = store.find_tag_by_title("Example").unwrap().unwrap();
    assert_eq!(created.published, PublishState::Published);
    assert_eq!(created.path, created.alias);
    assert_eq!(report.resolutions[0].1, TokenResolution::Created(created.id));
    assert_eq!(mapped_ids(&store, ARTICLE, 1), vec![created.id]);
    store.load_tree().unwrap().check_invariants().unwrap();
}

#[test]
fn test_rejected_creation_is_skipped_not_fatal() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let kept = tag(&mut store, "Kept");
    tag(&mut store, "C++");

    // "C#" derives the alias "c", already taken by "C++"
    let report = TagMapper::new(&mut store, &config)
        .tag_item(
            &ctx,
            &TagItemRequest::new(ARTICLE, 1, 1).with_tags([TagToken::Id(kept), TagToken::parse("C#")]),
        )
        .unwrap()
        .unwrap();

    assert_eq!(report.tag_ids, vec![kept]);
    assert!(matches!(
        report.resolutions[1].1,
        TokenResolution::Skipped { .. }
    ));
    assert!(store.find_tag_by_title("C#").unwrap().is_none());
    assert_eq!(mapped_ids(&store, ARTICLE, 1), vec![kept]);
}

#[test]
fn test_failed_insert_rolls_back_delete() {
    let mut inner = store();
    let one = tag(&mut inner, "One");
    let two = tag(&mut inner, "Two");
    let mut store = FailingStore::new(inner);
    let config = EngineConfig::default();
    let ctx = StaticContext::public();

    TagMapper::new(&mut store, &config)
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([one]))
        .unwrap();

    store.fail_mapping_inserts = true;
    let result = TagMapper::new(&mut store, &config)
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([two]));

    assert!(matches!(result, Err(TagmapError::Persistence(_))));
    assert_eq!(mapped_ids(&store.inner, ARTICLE, 10), vec![one]);
    assert!(!store.inner.in_transaction());
}

#[test]
fn test_untag_then_get_item_tags_is_empty() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let one = tag(&mut store, "One");

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 10, 100).with_tags([one]))
        .unwrap();
    assert_eq!(mapper.get_item_tags(&ctx, ARTICLE, 10, true, None).unwrap().len(), 1);

    assert_eq!(mapper.un_tag_item(ARTICLE, 10).unwrap(), 1);
    assert!(mapper.get_item_tags(&ctx, ARTICLE, 10, true, None).unwrap().is_empty());
    assert_eq!(mapper.un_tag_item(ARTICLE, 10).unwrap(), 0);
}

#[test]
fn test_item_tags_depend_on_actor() {
    let mut store = store();
    let config = EngineConfig::default();
    let public = tag(&mut store, "Public");
    let english = TagRegistry::new(&mut store, &config)
        .find_or_create_with("English", "en-GB", 1)
        .unwrap();
    let staff = TagRegistry::new(&mut store, &config)
        .find_or_create_with("Staff", "*", 3)
        .unwrap();

    let admin = StaticContext::new([1, 3], "en-GB");
    let visitor = StaticContext::new([1], "fr-FR");
    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(
            &admin,
            &TagItemRequest::new(ARTICLE, 1, 1).with_tags([public, english, staff]),
        )
        .unwrap();

    let ids = |ctx: &StaticContext, language: Option<&LanguageFilter>| -> Vec<u64> {
        mapper
            .get_item_tags(ctx, ARTICLE, 1, true, language)
            .unwrap()
            .iter()
            .map(|t| t.tag_id())
            .collect()
    };
    assert_eq!(ids(&admin, None), vec![public, english, staff]);
    assert_eq!(ids(&visitor, None), vec![public, english]);
    assert_eq!(ids(&visitor, Some(&LanguageFilter::Current)), vec![public]);
    assert_eq!(
        ids(&admin, Some(&LanguageFilter::Code("en-GB".to_string()))),
        vec![public, english, staff]
    );
}

#[test]
fn test_unpublished_tag_hidden_from_listing() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let draft = tag(&mut store, "Draft");
    let mut row = store.find_tag(draft).unwrap().unwrap();
    row.published = PublishState::Unpublished;
    store.update_tags(&[row]).unwrap();

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 1, 1).with_tags([draft]))
        .unwrap();

    assert!(mapper.get_item_tags(&ctx, ARTICLE, 1, true, None).unwrap().is_empty());
    assert_eq!(mapper.get_tag_ids(&[1], ARTICLE).unwrap(), Some(draft.to_string()));
}

#[test]
fn test_get_tag_ids_batches_items() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let one = tag(&mut store, "One");
    let two = tag(&mut store, "Two");

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 1, 1).with_tags([one]))
        .unwrap();
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 2, 2).with_tags([one, two]))
        .unwrap();
    mapper
        .tag_item(&ctx, &TagItemRequest::new(CONTACT, 1, 3).with_tags([two]))
        .unwrap();

    let joined = mapper.get_tag_ids(&[1, 2], ARTICLE).unwrap().unwrap();
    let mut ids: Vec<u64> = joined.split(',').map(|s| s.parse().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![one, one, two]);
}

#[test]
fn test_delete_tag_data_removes_rows_and_records() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    common::add_article(&mut store, 1, "First");
    common::add_article(&mut store, 2, "Second");
    let one = tag(&mut store, "One");

    let mut mapper = TagMapper::new(&mut store, &config);
    for item in [1, 2] {
        mapper
            .tag_item(&ctx, &TagItemRequest::new(ARTICLE, item, item).with_tags([one]))
            .unwrap();
    }
    assert_eq!(mapper.delete_tag_data(&[1], ARTICLE).unwrap(), 1);

    assert!(mapped_ids(&store, ARTICLE, 1).is_empty());
    assert_eq!(mapped_ids(&store, ARTICLE, 2), vec![one]);
    let remaining: Vec<u64> = store.content_records().iter().map(|r| r.content_item_id).collect();
    assert_eq!(remaining, vec![2]);
}

#[test]
fn test_delete_cascade_removes_mappings_then_tag() {
    let mut store = store();
    let config = EngineConfig::default();
    let ctx = StaticContext::public();
    let parent = tag(&mut store, "Parent");
    let leaf = tag_under(&mut store, "Leaf", parent);
    let other = tag(&mut store, "Other");

    let mut mapper = TagMapper::new(&mut store, &config);
    mapper
        .tag_item(&ctx, &TagItemRequest::new(ARTICLE, 1, 1).with_tags([leaf, other]))
        .unwrap();
    mapper
        .tag_item(&ctx, &TagItemRequest::new(CONTACT, 5, 5).with_tags([leaf]))
        .unwrap();

    let mut registry = TagRegistry::new(&mut store, &config);
    assert!(matches!(
        registry.delete_cascade(parent),
        Err(TagmapError::Validation(_))
    ));
    assert_eq!(registry.delete_cascade(leaf).unwrap(), 2);

    assert!(store.find_tag(leaf).unwrap().is_none());
    assert_eq!(mapped_ids(&store, ARTICLE, 1), vec![other]);
    assert!(mapped_ids(&store, CONTACT, 5).is_empty());
    let tree = store.load_tree().unwrap();
    tree.check_invariants().unwrap();
    assert!(tree.is_leaf(parent));
}
