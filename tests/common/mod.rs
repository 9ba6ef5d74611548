#![allow(dead_code)]

use nested_set::prelude::*;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbBackend, QueryFilter, Statement};

pub mod category {
    use nested_set::NestedSetModelDerive as NestedSetModel;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
    #[sea_orm(table_name = "categories")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        pub tree_left: i32,
        pub tree_right: i32,
        pub tree_level: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod menu_item {
    use nested_set::NestedSetModelDerive as NestedSetModel;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
    #[sea_orm(table_name = "menu_items")]
    #[nested_set(scope_field = "menu_id")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub menu_id: i32,
        pub title: String,
        pub tree_left: i32,
        pub tree_right: i32,
        pub tree_level: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub type Category = category::Model;
pub type MenuItem = menu_item::Model;

pub async fn setup_database() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"
        CREATE TABLE categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            tree_left INTEGER NOT NULL DEFAULT 0,
            tree_right INTEGER NOT NULL DEFAULT 0,
            tree_level INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ))
    .await?;

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"
        CREATE TABLE menu_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            menu_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            tree_left INTEGER NOT NULL DEFAULT 0,
            tree_right INTEGER NOT NULL DEFAULT 0,
            tree_level INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ))
    .await?;

    Ok(db)
}

pub fn category(name: &str) -> PendingNode<Category> {
    PendingNode::new(category::ActiveModel {
        name: Set(name.to_owned()),
        ..Default::default()
    })
}

pub fn menu_item(title: &str) -> PendingNode<MenuItem> {
    PendingNode::new(menu_item::ActiveModel {
        title: Set(title.to_owned()),
        ..Default::default()
    })
}

pub async fn find_category(db: &DatabaseConnection, name: &str) -> Category {
    category::Entity::find()
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await
        .expect("query categories")
        .unwrap_or_else(|| panic!("category {name} exists"))
}

pub async fn find_menu_item(db: &DatabaseConnection, menu_id: i32, title: &str) -> MenuItem {
    menu_item::Entity::find()
        .filter(menu_item::Column::MenuId.eq(menu_id))
        .filter(menu_item::Column::Title.eq(title))
        .one(db)
        .await
        .expect("query menu items")
        .unwrap_or_else(|| panic!("menu item {title} exists"))
}

/// Save `name` as the last child of the category currently named `parent`.
pub async fn append(db: &DatabaseConnection, parent: &str, name: &str) -> Category {
    let parent = find_category(db, parent).await;
    let mut node = category(name);
    node.insert_as_last_child_of(&parent).expect("position child");
    NestedSetRepository::new()
        .save(db, node)
        .await
        .expect("save child")
}

/// ```text
/// root
/// ├─ a
/// │  ├─ a1
/// │  └─ a2
/// └─ b
/// ```
pub async fn seed_category_tree(db: &DatabaseConnection) {
    let repo = NestedSetRepository::<Category>::new();
    repo.create_root(db, category("root"))
        .await
        .expect("create root");
    append(db, "root", "a").await;
    append(db, "root", "b").await;
    append(db, "a", "a1").await;
    append(db, "a", "a2").await;
}

pub fn names(nodes: &[Category]) -> Vec<&str> {
    nodes.iter().map(|node| node.name.as_str()).collect()
}

/// `(name, left, right, level)` of every positioned category in branch order.
pub async fn layout(db: &DatabaseConnection) -> Vec<(String, i32, i32, i32)> {
    NestedSetRepository::<Category>::new()
        .tree(db, None)
        .await
        .expect("load tree")
        .into_iter()
        .map(|node| (node.name, node.tree_left, node.tree_right, node.tree_level))
        .collect()
}

/// Check every structural invariant of a tree loaded in branch order.
pub fn assert_well_formed<M: NestedSetModel>(nodes: &[M]) {
    let mut bounds: Vec<i32> = nodes
        .iter()
        .flat_map(|node| [node.left(), node.right()])
        .collect();
    bounds.sort_unstable();
    let expected: Vec<i32> = (1..=bounds.len() as i32).collect();
    assert_eq!(bounds, expected, "bounds must be a gapless 1..=2n sequence");

    let roots = nodes.iter().filter(|node| node.left() == 1).count();
    assert!(nodes.is_empty() || roots == 1, "exactly one root per tree");

    for node in nodes {
        assert!(node.right() > node.left());

        let ancestors = nodes
            .iter()
            .filter(|other| other.left() < node.left() && other.right() > node.right())
            .count();
        assert_eq!(node.level(), ancestors as i32, "level equals ancestor count");

        for other in nodes {
            let disjoint = node.right() < other.left() || other.right() < node.left();
            let nested = (node.left() <= other.left() && node.right() >= other.right())
                || (other.left() <= node.left() && other.right() >= node.right());
            assert!(disjoint || nested, "intervals never partially overlap");
        }
    }
}
