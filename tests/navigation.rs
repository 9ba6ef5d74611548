mod common;

use common::{assert_well_formed, find_category, layout, names, seed_category_tree, Category};
use nested_set::prelude::*;

#[test_log::test(tokio::test)]
async fn seeded_tree_has_expected_layout() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;

    let expected = [
        ("root", 1, 10, 0),
        ("a", 2, 7, 1),
        ("a1", 3, 4, 2),
        ("a2", 5, 6, 2),
        ("b", 8, 9, 1),
    ];
    let expected: Vec<(String, i32, i32, i32)> = expected
        .iter()
        .map(|(name, l, r, lv)| (name.to_string(), *l, *r, *lv))
        .collect();
    assert_eq!(layout(&db).await, expected);

    let tree = NestedSetRepository::<Category>::new().tree(&db, None).await?;
    assert_well_formed(&tree);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn parent_and_ancestors() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;
    let repo = NestedSetRepository::<Category>::new();

    let root = find_category(&db, "root").await;
    let a = find_category(&db, "a").await;
    let a2 = find_category(&db, "a2").await;

    assert_eq!(repo.parent(&db, &a2).await?.map(|p| p.name), Some("a".into()));
    assert_eq!(repo.parent(&db, &a).await?.map(|p| p.name), Some("root".into()));
    assert_eq!(repo.parent(&db, &root).await?, None);

    assert_eq!(names(&repo.ancestors(&db, &a2).await?), vec!["root", "a"]);
    assert!(repo.ancestors(&db, &root).await?.is_empty());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn children_descendants_and_branch() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;
    let repo = NestedSetRepository::<Category>::new();

    let root = find_category(&db, "root").await;
    let a = find_category(&db, "a").await;
    let a1 = find_category(&db, "a1").await;

    assert_eq!(names(&repo.children(&db, &root).await?), vec!["a", "b"]);
    assert_eq!(names(&repo.children(&db, &a).await?), vec!["a1", "a2"]);
    assert!(repo.children(&db, &a1).await?.is_empty());
    assert_eq!(repo.count_children(&db, &root).await?, 2);
    assert_eq!(repo.count_children(&db, &a1).await?, 0);

    assert_eq!(
        repo.first_child(&db, &a).await?.map(|c| c.name),
        Some("a1".into())
    );
    assert_eq!(
        repo.last_child(&db, &a).await?.map(|c| c.name),
        Some("a2".into())
    );
    assert_eq!(repo.first_child(&db, &a1).await?, None);

    assert_eq!(
        names(&repo.descendants(&db, &root).await?),
        vec!["a", "a1", "a2", "b"]
    );
    assert_eq!(repo.count_descendants(&db, &root).await?, 4);
    assert_eq!(repo.count_descendants(&db, &a).await?, 2);
    assert_eq!(repo.count_descendants(&db, &a1).await?, 0);
    assert!(repo.descendants(&db, &a1).await?.is_empty());

    assert_eq!(names(&repo.branch(&db, &a).await?), vec!["a", "a1", "a2"]);
    assert_eq!(names(&repo.branch(&db, &a1).await?), vec!["a1"]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn siblings() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;
    let repo = NestedSetRepository::<Category>::new();

    let root = find_category(&db, "root").await;
    let a = find_category(&db, "a").await;
    let b = find_category(&db, "b").await;
    let a2 = find_category(&db, "a2").await;

    assert_eq!(names(&repo.siblings(&db, &a, false).await?), vec!["b"]);
    assert_eq!(names(&repo.siblings(&db, &a, true).await?), vec!["a", "b"]);
    assert!(repo.siblings(&db, &root, true).await?.is_empty());

    assert!(repo.has_next_sibling(&db, &a).await?);
    assert!(!repo.has_prev_sibling(&db, &a).await?);
    assert!(repo.has_prev_sibling(&db, &b).await?);
    assert!(!repo.has_next_sibling(&db, &a2).await?);
    assert_eq!(repo.next_sibling(&db, &a).await?.map(|s| s.name), Some("b".into()));
    assert_eq!(repo.prev_sibling(&db, &b).await?.map(|s| s.name), Some("a".into()));
    assert_eq!(repo.next_sibling(&db, &b).await?, None);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn roots_and_detached_rows() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;
    let repo = NestedSetRepository::<Category>::new();

    let detached = repo.save(&db, common::category("loose")).await?;
    assert!(!detached.is_in_tree());
    assert!(!repo.has_prev_sibling(&db, &detached).await?);
    assert_eq!(repo.parent(&db, &detached).await?, None);
    assert!(repo.siblings(&db, &detached, true).await?.is_empty());

    assert_eq!(
        repo.root(&db, None).await?.map(|r| r.name),
        Some("root".into())
    );
    assert_eq!(names(&repo.roots(&db).await?), vec!["root"]);
    assert_eq!(repo.tree(&db, None).await?.len(), 5);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn detached_rows_never_join_a_tree() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;
    let repo = NestedSetRepository::<Category>::new();

    let loose = repo.save(&db, common::category("loose")).await?;
    repo.save(&db, common::category("loose2")).await?;

    // a root's left is 1, and a detached row's right is 0
    let root = find_category(&db, "root").await;
    assert!(!repo.has_prev_sibling(&db, &root).await?);
    assert_eq!(repo.prev_sibling(&db, &root).await?, None);
    assert!(!repo.has_next_sibling(&db, &root).await?);

    assert_eq!(names(&repo.branch(&db, &loose).await?), vec!["loose"]);
    assert!(repo.descendants(&db, &loose).await?.is_empty());
    assert!(repo.ancestors(&db, &loose).await?.is_empty());

    let a = find_category(&db, "a").await;
    assert_eq!(names(&repo.branch(&db, &a).await?), vec!["a", "a1", "a2"]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn ancestry_matches_interval_containment() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;
    let tree = NestedSetRepository::<Category>::new().tree(&db, None).await?;

    for a in &tree {
        for b in &tree {
            let contains = a.tree_left < b.tree_left && a.tree_right > b.tree_right;
            assert_eq!(a.is_ancestor_of(b)?, contains, "{} / {}", a.name, b.name);
        }
        if a.is_root() {
            assert_eq!(a.tree_level, 0);
        }
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn tree_node_caches_parent_and_children() -> Result<(), Box<dyn std::error::Error>> {
    let db = common::setup_database().await?;
    seed_category_tree(&db).await;

    let mut a = TreeNode::new(find_category(&db, "a").await);
    assert_eq!(a.parent(&db).await?.map(|p| p.name.as_str()), Some("root"));
    assert_eq!(names(a.children(&db).await?), vec!["a1", "a2"]);
    assert_eq!(a.count_children(&db).await?, 2);

    // a new child is invisible until the cache is dropped
    common::append(&db, "a", "a3").await;
    assert_eq!(a.children(&db).await?.len(), 2);

    a.reload(&db).await?;
    assert_eq!(names(a.children(&db).await?), vec!["a1", "a2", "a3"]);
    assert_eq!(a.model().tree_right - a.model().tree_left, 7);
    Ok(())
}
